use std::fmt;

use sxbmon_frame::FrameError;
use sxbmon_transport::TransportError;

use crate::model::Address;
use crate::registers::Register;

/// A request rejected before anything reached the board.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Reads and writes must cover at least one byte.
    #[error("length must be greater than zero")]
    ZeroLength,

    /// `start + len - 1` runs past the top of the address space.
    #[error("{len} byte(s) at {start} run past 0xFFFF")]
    RangeOverflow { start: Address, len: usize },

    /// An address outside 0x0000-0xFFFF.
    #[error("address {0:#x} outside 0x0000-0xFFFF")]
    AddressOutOfRange(u32),

    /// A string that does not parse as an address or value.
    #[error("invalid number '{0}'")]
    InvalidNumber(String),

    /// A register name the target CPU does not have.
    #[error("unknown register '{0}'")]
    UnknownRegister(String),

    /// A register assignment not of the form `NAME=VALUE`.
    #[error("invalid register assignment '{0}' (expected NAME=VALUE)")]
    InvalidAssignment(String),

    /// A value wider than the register.
    #[error("value {value:#x} does not fit {register} ({bits}-bit)")]
    RegisterWidth {
        register: Register,
        value: u32,
        bits: u8,
    },

    /// The register block has the wrong size.
    #[error("register block must be {expected} bytes, got {actual}")]
    RegisterBlockSize { expected: usize, actual: usize },

    /// Native mode requested on a CPU that only has emulation mode.
    #[error("the W65C02 has no native mode")]
    NativeModeUnsupported,

    /// The board information block is too short.
    #[error("board info block must be at least {expected} bytes, got {actual}")]
    BoardInfoSize { expected: usize, actual: usize },

    /// A chunk that does not start where the previous one ended.
    #[error("chunk at {got} out of order (expected {expected})")]
    ChunkOrder { expected: Address, got: Address },

    /// A chunk that extends past the requested block.
    #[error("chunk of {len} byte(s) at {at} overruns the block end {end}")]
    ChunkOverrun { at: Address, len: usize, end: Address },

    /// The block was finished before all bytes arrived.
    #[error("block incomplete ({received} of {expected} bytes)")]
    Incomplete { expected: usize, received: usize },

    /// A malformed WDC binary image.
    #[error("invalid image: {0}")]
    Image(String),
}

/// The operation an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Info,
    Load,
    Read,
    Write,
    Execute,
    GetRegisters,
    SetRegisters,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Info => "info",
            Operation::Load => "load",
            Operation::Read => "read",
            Operation::Write => "write",
            Operation::Execute => "execute",
            Operation::GetRegisters => "get-registers",
            Operation::SetRegisters => "set-registers",
        };
        f.write_str(name)
    }
}

/// The retryable failure seen on the final attempt.
#[derive(Debug, thiserror::Error)]
pub enum LastError {
    /// No (or an incomplete) reply within the deadline.
    #[error(transparent)]
    Timeout(TransportError),

    /// A reply that failed structural or checksum validation.
    #[error(transparent)]
    Corrupt(FrameError),
}

/// Coarse classification of a [`SessionError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    Timeout,
    CorruptFrame,
    Link,
    Device,
}

/// Errors surfaced by session operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The request was rejected before any I/O.
    #[error("invalid request: {0}")]
    Validation(#[from] ValidationError),

    /// Retries were exhausted on timeouts or corrupt frames.
    #[error(
        "{operation} failed{} after {attempts} attempt(s), {completed} byte(s) completed: {last_error}",
        at(.address)
    )]
    CommandFailed {
        operation: Operation,
        address: Option<Address>,
        attempts: u32,
        completed: usize,
        last_error: LastError,
    },

    /// The board answered with an error status.
    #[error(
        "{operation} rejected by board{} with status {status:#04x}, {completed} byte(s) completed",
        at(.address)
    )]
    Device {
        operation: Operation,
        address: Option<Address>,
        status: u8,
        completed: usize,
    },

    /// The serial link failed; the session must be reopened.
    #[error("{operation} aborted{}: {source}", at(.address))]
    Link {
        operation: Operation,
        address: Option<Address>,
        completed: usize,
        #[source]
        source: TransportError,
    },

    /// A frame could not be encoded from a validated request.
    #[error("{operation}: cannot encode frame: {source}")]
    Encode {
        operation: Operation,
        #[source]
        source: FrameError,
    },

    /// The session was poisoned by an earlier link failure.
    #[error("session closed after a link failure; reconnect to continue")]
    Closed,
}

impl SessionError {
    /// Classify the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SessionError::Validation(_) | SessionError::Encode { .. } => ErrorKind::Validation,
            SessionError::CommandFailed {
                last_error: LastError::Timeout(_),
                ..
            } => ErrorKind::Timeout,
            SessionError::CommandFailed {
                last_error: LastError::Corrupt(_),
                ..
            } => ErrorKind::CorruptFrame,
            SessionError::Device { .. } => ErrorKind::Device,
            SessionError::Link { .. } | SessionError::Closed => ErrorKind::Link,
        }
    }

    /// Bytes that reached (or came back from) the board before the failure.
    pub fn completed(&self) -> usize {
        match self {
            SessionError::CommandFailed { completed, .. }
            | SessionError::Device { completed, .. }
            | SessionError::Link { completed, .. } => *completed,
            _ => 0,
        }
    }

    /// Whether the session is unusable after this error.
    pub fn is_fatal(&self) -> bool {
        self.kind() == ErrorKind::Link
    }
}

fn at(address: &Option<Address>) -> String {
    match address {
        Some(address) => format!(" at {address}"),
        None => String::new(),
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;
