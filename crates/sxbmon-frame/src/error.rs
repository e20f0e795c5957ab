/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    /// The bytes received from the board do not form a valid reply.
    #[error("corrupt frame: {0}")]
    Corrupt(CorruptKind),

    /// The payload exceeds the configured per-frame maximum.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// A memory command with a zero length field.
    #[error("{0} requires a non-zero length")]
    EmptyPayload(&'static str),

    /// The address does not fit the 24-bit address field.
    #[error("address {0:#x} does not fit the 24-bit address field")]
    AddressOutOfRange(u32),
}

impl FrameError {
    /// Whether the error describes damaged inbound bytes (worth a retry).
    pub fn is_corrupt(&self) -> bool {
        matches!(self, FrameError::Corrupt(_))
    }
}

/// Why an inbound frame was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CorruptKind {
    /// The status byte is neither the ack nor a known error status.
    #[error("unexpected status byte {0:#04x}")]
    UnexpectedStatus(u8),

    /// Fewer bytes than the frame requires.
    #[error("short frame ({actual} of {expected} bytes)")]
    Short { expected: usize, actual: usize },

    /// The trailing checksum does not match the payload.
    #[error("checksum mismatch (computed {computed:#04x}, received {received:#04x})")]
    Checksum { computed: u8, received: u8 },
}

pub type Result<T> = std::result::Result<T, FrameError>;
