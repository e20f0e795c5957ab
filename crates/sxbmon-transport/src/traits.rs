use std::time::Duration;

use crate::error::Result;

/// A byte-oriented serial channel to the board.
///
/// This is the narrow contract every backend implements: the real port
/// ([`crate::SerialPortLink`]), or a simulated monitor in tests. It carries
/// no protocol knowledge. Closing happens on drop.
pub trait SerialLink {
    /// Write every byte of `bytes` (blocking).
    fn write_all(&mut self, bytes: &[u8]) -> Result<()>;

    /// Read up to `buf.len()` bytes, waiting at most `timeout`.
    ///
    /// Returns `Ok(0)` when nothing arrived in time. Link failures are errors.
    fn read(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize>;

    /// Drop any bytes received but not yet read.
    fn discard_input(&mut self) -> Result<()>;

    /// Backend name for diagnostics.
    fn name(&self) -> &str {
        "serial"
    }
}

impl<L: SerialLink + ?Sized> SerialLink for Box<L> {
    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        (**self).write_all(bytes)
    }

    fn read(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        (**self).read(buf, timeout)
    }

    fn discard_input(&mut self) -> Result<()> {
        (**self).discard_input()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

impl<L: SerialLink + ?Sized> SerialLink for &mut L {
    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        (**self).write_all(bytes)
    }

    fn read(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        (**self).read(buf, timeout)
    }

    fn discard_input(&mut self) -> Result<()> {
        (**self).discard_input()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
