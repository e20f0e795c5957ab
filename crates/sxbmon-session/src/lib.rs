//! Board sessions for the WDC SXB monitor.
//!
//! This is the layer applications talk to. A [`Session`] owns one serial
//! link and runs monitor commands over it strictly one at a time:
//! memory reads and writes, program loads, execution and register access.
//! Requests are validated before any byte is sent; timeouts and corrupt
//! replies are retried by the [`CommandEngine`].

pub mod board;
pub mod config;
pub mod engine;
pub mod error;
pub mod image;
pub mod model;
pub mod registers;
pub mod session;

pub use board::{BoardInfo, Cpu, Vector};
pub use config::{RetryPolicy, SessionConfig, DEFAULT_MAX_ATTEMPTS, DEFAULT_REPLY_TIMEOUT};
pub use engine::{CommandEngine, EngineStats, ExchangeState};
pub use error::{ErrorKind, LastError, Operation, Result, SessionError, ValidationError};
pub use image::{Image, ImageSection, IMAGE_SIGNATURE};
pub use model::{
    chunk_ranges, parse_number, validate_range, Address, BlockAssembler, Chunk, MemoryBlock,
    ADDRESS_SPACE,
};
pub use registers::{
    Register, RegisterOverrides, RegisterSet, DEFAULT_STACK, DEFAULT_STATUS, REGISTER_BLOCK_SIZE,
};
pub use session::{LoadSummary, Session};
