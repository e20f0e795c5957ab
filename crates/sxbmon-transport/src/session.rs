use std::io::ErrorKind;
use std::time::{Duration, Instant};

use bytes::{Bytes, BytesMut};
use tracing::trace;

use crate::error::{Result, TransportError};
use crate::traits::SerialLink;

/// Exclusive owner of an open serial link.
///
/// Performs whole-buffer sends and exact-length receives with deadlines.
/// Nothing else reads from or writes to the link while the session lives.
pub struct TransportSession<L> {
    link: L,
}

impl<L: SerialLink> TransportSession<L> {
    /// Take ownership of an open link.
    pub fn new(link: L) -> Self {
        Self { link }
    }

    /// Write all of `bytes` to the link.
    pub fn send(&mut self, bytes: &[u8]) -> Result<()> {
        trace!(len = bytes.len(), "send");
        self.link.write_all(bytes)
    }

    /// Block until exactly `expected_len` bytes arrived or `timeout` elapsed.
    ///
    /// On timeout the partial bytes are discarded and
    /// [`TransportError::Timeout`] is returned; a short buffer is never
    /// handed back.
    pub fn receive(&mut self, expected_len: usize, timeout: Duration) -> Result<Bytes> {
        if expected_len == 0 {
            return Ok(Bytes::new());
        }

        let deadline = Instant::now() + timeout;
        let mut buf = BytesMut::zeroed(expected_len);
        let mut filled = 0usize;

        while filled < expected_len {
            let now = Instant::now();
            if now >= deadline {
                trace!(expected_len, filled, "receive deadline passed; discarding");
                return Err(TransportError::Timeout {
                    expected: expected_len,
                    transferred: filled,
                    timeout,
                });
            }

            match self.link.read(&mut buf[filled..], deadline - now) {
                Ok(n) => filled += n,
                Err(TransportError::Link(err)) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            }
        }

        trace!(len = filled, "received");
        Ok(buf.freeze())
    }

    /// Discard unread input so the next reply starts on a frame boundary.
    pub fn resync(&mut self) -> Result<()> {
        self.link.discard_input()
    }

    /// Give up the session and hand back the link.
    pub fn into_inner(self) -> L {
        self.link
    }

    /// Backend name for diagnostics.
    pub fn link_name(&self) -> &str {
        self.link.name()
    }

    /// Borrow the underlying link.
    pub fn get_ref(&self) -> &L {
        &self.link
    }

    /// Mutably borrow the underlying link.
    pub fn get_mut(&mut self) -> &mut L {
        &mut self.link
    }
}

impl<L> std::fmt::Debug for TransportSession<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportSession").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use super::*;

    /// Replays a script of read results; records everything written.
    #[derive(Default)]
    struct ScriptedLink {
        reads: VecDeque<Result<Vec<u8>>>,
        written: Vec<u8>,
        discards: usize,
    }

    impl ScriptedLink {
        fn with_reads(reads: Vec<Result<Vec<u8>>>) -> Self {
            Self {
                reads: reads.into(),
                ..Self::default()
            }
        }
    }

    impl SerialLink for ScriptedLink {
        fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
            self.written.extend_from_slice(bytes);
            Ok(())
        }

        fn read(&mut self, buf: &mut [u8], _timeout: Duration) -> Result<usize> {
            match self.reads.pop_front() {
                Some(Ok(chunk)) => {
                    let n = chunk.len().min(buf.len());
                    buf[..n].copy_from_slice(&chunk[..n]);
                    if n < chunk.len() {
                        self.reads.push_front(Ok(chunk[n..].to_vec()));
                    }
                    Ok(n)
                }
                Some(Err(err)) => Err(err),
                None => Ok(0),
            }
        }

        fn discard_input(&mut self) -> Result<()> {
            self.discards += 1;
            self.reads.clear();
            Ok(())
        }
    }

    #[test]
    fn receive_assembles_partial_reads() {
        let link = ScriptedLink::with_reads(vec![Ok(vec![0x01]), Ok(vec![0x02, 0x03])]);
        let mut session = TransportSession::new(link);

        let bytes = session.receive(3, Duration::from_millis(100)).unwrap();
        assert_eq!(bytes.as_ref(), &[0x01, 0x02, 0x03]);
    }

    #[test]
    fn receive_leaves_surplus_bytes_unread() {
        let link = ScriptedLink::with_reads(vec![Ok(vec![0xCC, 0xAB])]);
        let mut session = TransportSession::new(link);

        let first = session.receive(1, Duration::from_millis(50)).unwrap();
        let second = session.receive(1, Duration::from_millis(50)).unwrap();
        assert_eq!(first.as_ref(), &[0xCC]);
        assert_eq!(second.as_ref(), &[0xAB]);
    }

    #[test]
    fn receive_times_out_and_discards_partial() {
        let link = ScriptedLink::with_reads(vec![Ok(vec![0x01, 0x02])]);
        let mut session = TransportSession::new(link);

        let err = session.receive(4, Duration::from_millis(20)).unwrap_err();
        assert!(matches!(
            err,
            TransportError::Timeout {
                expected: 4,
                transferred: 2,
                ..
            }
        ));
    }

    #[test]
    fn receive_zero_bytes_returns_immediately() {
        let mut session = TransportSession::new(ScriptedLink::default());
        let bytes = session.receive(0, Duration::ZERO).unwrap();
        assert!(bytes.is_empty());
    }

    #[test]
    fn interrupted_read_retries() {
        let link = ScriptedLink::with_reads(vec![
            Err(TransportError::Link(std::io::Error::from(ErrorKind::Interrupted))),
            Ok(vec![0x7F]),
        ]);
        let mut session = TransportSession::new(link);

        let bytes = session.receive(1, Duration::from_millis(100)).unwrap();
        assert_eq!(bytes.as_ref(), &[0x7F]);
    }

    #[test]
    fn link_error_propagates() {
        let link = ScriptedLink::with_reads(vec![Err(TransportError::Link(
            std::io::Error::from(ErrorKind::PermissionDenied),
        ))]);
        let mut session = TransportSession::new(link);

        let err = session.receive(1, Duration::from_millis(100)).unwrap_err();
        assert!(err.is_fatal());
        assert!(matches!(err, TransportError::Link(e) if e.kind() == ErrorKind::PermissionDenied));
    }

    #[test]
    fn send_writes_through_and_resync_discards() {
        let link = ScriptedLink::with_reads(vec![Ok(vec![0xEE])]);
        let mut session = TransportSession::new(link);

        session.send(&[0x55, 0xAA]).unwrap();
        session.resync().unwrap();

        let link = session.into_inner();
        assert_eq!(link.written, vec![0x55, 0xAA]);
        assert_eq!(link.discards, 1);
        assert!(link.reads.is_empty());
    }
}
