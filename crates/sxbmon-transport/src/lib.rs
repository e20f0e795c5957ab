//! Blocking serial link abstraction for the WDC SXB monitor protocol.
//!
//! This is the lowest layer of sxbmon. It knows nothing about the monitor
//! protocol; it moves bytes with deadlines:
//! - [`SerialLink`] is the narrow contract any serial backend implements
//! - [`TransportSession`] adds exact-length receives with timeouts
//! - [`SerialPortLink`] (feature `serial`) drives a real port via `serialport`

pub mod config;
pub mod error;
pub mod session;
pub mod traits;

#[cfg(feature = "serial")]
pub mod serial;

pub use config::{LinkConfig, Parity, DEFAULT_BAUD, DEFAULT_LINK_TIMEOUT};
pub use error::{Result, TransportError};
pub use session::TransportSession;
pub use traits::SerialLink;

#[cfg(feature = "serial")]
pub use serial::SerialPortLink;
