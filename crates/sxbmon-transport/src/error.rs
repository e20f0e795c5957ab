use std::time::Duration;

/// Errors that can occur on the serial link.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to open the serial device.
    #[error("failed to open {port}: {source}")]
    Open {
        port: String,
        source: std::io::Error,
    },

    /// The expected number of bytes did not arrive (or leave) before the deadline.
    ///
    /// Any partially transferred bytes have been discarded.
    #[error("timed out after {timeout:?} ({transferred} of {expected} bytes)")]
    Timeout {
        expected: usize,
        transferred: usize,
        timeout: Duration,
    },

    /// An I/O error occurred on the serial device (unplugged, permission denied, ...).
    #[error("serial link error: {0}")]
    Link(#[from] std::io::Error),

    /// The link has been closed.
    #[error("serial link closed")]
    Closed,
}

impl TransportError {
    /// Whether the error leaves the link unusable.
    ///
    /// Only timeouts are recoverable; everything else requires a reconnect.
    pub fn is_fatal(&self) -> bool {
        !self.is_timeout()
    }

    /// Whether the error is a deadline expiry.
    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::Timeout { .. })
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;
