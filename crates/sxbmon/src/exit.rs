use std::fmt;
use std::io;

use sxbmon_session::{ErrorKind, SessionError, ValidationError};
use sxbmon_transport::TransportError;

// Exit code constants. TIMEOUT follows timeout(1).
pub const SUCCESS: i32 = 0;
#[allow(dead_code)]
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const DEVICE_ERROR: i32 = 4;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::NotFound | io::ErrorKind::BrokenPipe => TRANSPORT_ERROR,
        io::ErrorKind::InvalidInput => USAGE,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Open { port, source } => io_error(&format!("{context} ({port})"), source),
        TransportError::Timeout { .. } => CliError::new(TIMEOUT, format!("{context}: {err}")),
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn validation_error(context: &str, err: ValidationError) -> CliError {
    CliError::new(DATA_INVALID, format!("{context}: {err}"))
}

pub fn session_error(context: &str, err: SessionError) -> CliError {
    let code = match err.kind() {
        ErrorKind::Validation => DATA_INVALID,
        ErrorKind::Timeout => TIMEOUT,
        ErrorKind::CorruptFrame | ErrorKind::Link => TRANSPORT_ERROR,
        ErrorKind::Device => DEVICE_ERROR,
    };
    CliError::new(code, format!("{context}: {err}"))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use sxbmon_session::{Address, LastError, Operation};

    use super::*;

    #[test]
    fn timeouts_map_to_timeout_code() {
        let err = SessionError::CommandFailed {
            operation: Operation::Read,
            address: Some(Address::new(0x0200)),
            attempts: 3,
            completed: 0,
            last_error: LastError::Timeout(TransportError::Timeout {
                expected: 1,
                transferred: 0,
                timeout: Duration::from_secs(1),
            }),
        };
        assert_eq!(session_error("read", err).code, TIMEOUT);
    }

    #[test]
    fn missing_port_is_transport_error() {
        let err = TransportError::Open {
            port: "/dev/ttyUSB9".to_string(),
            source: io::Error::new(io::ErrorKind::NotFound, "no such device"),
        };
        let cli = transport_error("open failed", err);
        assert_eq!(cli.code, TRANSPORT_ERROR);
        assert!(cli.message.contains("/dev/ttyUSB9"));
    }

    #[test]
    fn bad_input_is_data_invalid() {
        let err = SessionError::from(ValidationError::ZeroLength);
        assert_eq!(session_error("read", err).code, DATA_INVALID);
        assert_eq!(SessionError::Closed.kind(), ErrorKind::Link);
    }
}
