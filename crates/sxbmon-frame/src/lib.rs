//! Command/response frame codec for the WDC SXB monitor protocol.
//!
//! Pure transformations, no I/O. A command frame on the wire is:
//! - the opcode byte
//! - for memory commands, a 3-byte little-endian address and a 2-byte
//!   little-endian length
//! - write data, then an optional checksum byte
//!
//! Replies are a single status byte after the sync sequence, followed (for
//! reads and info) by the payload and the optional checksum.

pub mod codec;
pub mod error;
pub mod opcode;

pub use codec::{
    decode_payload, decode_status, encode_command, payload_wire_len, Checksum, CommandFrame,
    FrameConfig, ResponseFrame, Status, ADDRESS_FIELD_SIZE, DEFAULT_MAX_PAYLOAD, INFO_SIZE,
    LENGTH_FIELD_SIZE,
};
pub use error::{CorruptKind, FrameError, Result};
pub use opcode::{Opcode, ACK, SYNC};
