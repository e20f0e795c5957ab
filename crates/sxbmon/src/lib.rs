//! Host-side driver for WDC SXB boards running the stock monitor.
//!
//! Talks to the board over a serial line: load programs, read and write
//! memory, set registers and start execution.
//!
//! # Crate Structure
//!
//! - [`transport`]: serial link abstraction and the `serialport` backend
//!   (behind the `serial` feature)
//! - [`frame`]: command frame encoding and reply validation
//! - [`session`]: board sessions, retries, registers, memory and images
//!
//! ```no_run
//! # #[cfg(feature = "serial")]
//! # fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! use sxbmon::session::{Address, Session, SessionConfig};
//! use sxbmon::transport::{LinkConfig, SerialPortLink};
//!
//! let link = SerialPortLink::open(&LinkConfig::new("/dev/ttyUSB0"))?;
//! let mut board = Session::open(link, SessionConfig::default())?;
//! let block = board.read(Address::new(0x0200), 16)?;
//! println!("{:02X?}", block.as_bytes());
//! # Ok(())
//! # }
//! ```

/// Re-export transport types.
pub mod transport {
    pub use sxbmon_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use sxbmon_frame::*;
}

/// Re-export session types.
pub mod session {
    pub use sxbmon_session::*;
}
