use std::io::{ErrorKind, Read, Write};
use std::time::Duration;

use serialport::{ClearBuffer, DataBits, FlowControl, SerialPort, StopBits};
use tracing::{debug, info};

use crate::config::{LinkConfig, Parity};
use crate::error::{Result, TransportError};
use crate::traits::SerialLink;

/// Serial link backed by an OS serial port.
///
/// Opened 8-N-1 (or with the configured parity) without flow control.
/// The port is closed when the value is dropped.
pub struct SerialPortLink {
    port: Box<dyn SerialPort>,
    name: String,
    write_timeout: Duration,
}

impl SerialPortLink {
    /// Open the port described by `config`.
    pub fn open(config: &LinkConfig) -> Result<Self> {
        let port = serialport::new(&config.port, config.baud)
            .data_bits(DataBits::Eight)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .parity(to_serialport_parity(config.parity))
            .timeout(config.timeout)
            .open()
            .map_err(|e| TransportError::Open {
                port: config.port.clone(),
                source: e.into(),
            })?;

        info!(port = %config.port, baud = config.baud, parity = %config.parity, "opened serial link");

        Ok(Self {
            port,
            name: config.port.clone(),
            write_timeout: config.timeout,
        })
    }

    /// Device name this link was opened on.
    pub fn port_name(&self) -> &str {
        &self.name
    }
}

impl SerialLink for SerialPortLink {
    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        self.port
            .set_timeout(self.write_timeout)
            .map_err(|e| TransportError::Link(e.into()))?;
        match Write::write_all(&mut self.port, bytes).and_then(|()| self.port.flush()) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::TimedOut => Err(TransportError::Timeout {
                expected: bytes.len(),
                transferred: 0,
                timeout: self.write_timeout,
            }),
            Err(err) => Err(TransportError::Link(err)),
        }
    }

    fn read(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        self.port
            .set_timeout(timeout)
            .map_err(|e| TransportError::Link(e.into()))?;
        match Read::read(&mut self.port, buf) {
            Ok(n) => Ok(n),
            Err(err) if err.kind() == ErrorKind::TimedOut => Ok(0),
            Err(err) if err.kind() == ErrorKind::Interrupted => Ok(0),
            Err(err) if is_disconnect(&err) => Err(TransportError::Closed),
            Err(err) => Err(TransportError::Link(err)),
        }
    }

    fn discard_input(&mut self) -> Result<()> {
        let pending = self.port.bytes_to_read().unwrap_or(0);
        if pending > 0 {
            debug!(pending, "discarding unread input");
        }
        self.port
            .clear(ClearBuffer::Input)
            .map_err(|e| TransportError::Link(e.into()))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Debug for SerialPortLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialPortLink")
            .field("port", &self.name)
            .finish()
    }
}

/// The device went away underneath an open port.
fn is_disconnect(err: &std::io::Error) -> bool {
    matches!(
        err.kind(),
        ErrorKind::BrokenPipe | ErrorKind::NotConnected | ErrorKind::UnexpectedEof
    )
}

fn to_serialport_parity(parity: Parity) -> serialport::Parity {
    match parity {
        Parity::None => serialport::Parity::None,
        Parity::Odd => serialport::Parity::Odd,
        Parity::Even => serialport::Parity::Even,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parity_maps_to_serialport() {
        assert_eq!(to_serialport_parity(Parity::None), serialport::Parity::None);
        assert_eq!(to_serialport_parity(Parity::Odd), serialport::Parity::Odd);
        assert_eq!(to_serialport_parity(Parity::Even), serialport::Parity::Even);
    }

    #[test]
    fn disconnect_kinds_close_the_link() {
        assert!(is_disconnect(&std::io::Error::from(ErrorKind::BrokenPipe)));
        assert!(!is_disconnect(&std::io::Error::from(ErrorKind::PermissionDenied)));
    }

    #[test]
    fn open_missing_port_is_open_error() {
        let config = LinkConfig::new("/dev/sxbmon-no-such-port");
        let result = SerialPortLink::open(&config);
        assert!(matches!(result, Err(TransportError::Open { ref port, .. }) if port == "/dev/sxbmon-no-such-port"));
    }
}
