//! Command engine: one request/reply exchange at a time, with retries.
//!
//! Every exchange runs the same sequence:
//!
//! ```text
//! resync ─▶ SYNC ─▶ status ─▶ command frame ─▶ reply payload
//!  Idle              │ Sent               AwaitingResponse ─▶ Completed
//!                    └─ error status ─▶ Failed (no retry)
//! ```
//! Timeouts and corrupt frames are retried with a fresh resync, up to the
//! configured attempt count. Link failures are never retried. An `EXEC` is
//! never resent once the board has acknowledged its sync, because the
//! program may already be running.

use std::fmt;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use sxbmon_frame::{
    decode_payload, decode_status, encode_command, payload_wire_len, CommandFrame, FrameError,
    Opcode, ResponseFrame, Status,
};
use sxbmon_transport::{SerialLink, TransportError, TransportSession};
use tracing::{debug, trace, warn};

use crate::board::BoardInfo;
use crate::config::SessionConfig;
use crate::error::{LastError, Operation, Result, SessionError};
use crate::model::{chunk_ranges, validate_range, Address, BlockAssembler, MemoryBlock};
use crate::registers::RegisterSet;

/// Where the current (or last) exchange stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeState {
    /// No exchange in flight.
    Idle,
    /// Sync acknowledged and command written.
    Sent,
    /// Waiting for the reply payload.
    AwaitingResponse,
    /// The last exchange succeeded.
    Completed,
    /// The last attempt failed.
    Failed,
}

impl fmt::Display for ExchangeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExchangeState::Idle => "idle",
            ExchangeState::Sent => "sent",
            ExchangeState::AwaitingResponse => "awaiting-response",
            ExchangeState::Completed => "completed",
            ExchangeState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Exchange counters since the engine was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    /// Exchanges that completed successfully.
    pub exchanges: u64,
    /// Attempts that were retried after a timeout or corrupt frame.
    pub retries: u64,
}

/// Outcome of one failed attempt.
enum AttemptError {
    /// Timeout or corrupt frame. `acknowledged` is set once the board
    /// answered the sync with an ack.
    Retryable { cause: LastError, acknowledged: bool },
    Device(u8),
    Link(TransportError),
}

fn transport_failure(err: TransportError, acknowledged: bool) -> AttemptError {
    if err.is_timeout() {
        AttemptError::Retryable {
            cause: LastError::Timeout(err),
            acknowledged,
        }
    } else {
        AttemptError::Link(err)
    }
}

/// Drives exchanges over an exclusively owned transport session.
pub struct CommandEngine<L> {
    transport: TransportSession<L>,
    config: SessionConfig,
    state: ExchangeState,
    stats: EngineStats,
    scratch: BytesMut,
}

impl<L: SerialLink> CommandEngine<L> {
    pub fn new(transport: TransportSession<L>, config: SessionConfig) -> Self {
        Self {
            transport,
            config,
            state: ExchangeState::Idle,
            stats: EngineStats::default(),
            scratch: BytesMut::new(),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn state(&self) -> ExchangeState {
        self.state
    }

    pub fn stats(&self) -> EngineStats {
        self.stats
    }

    pub fn link_name(&self) -> &str {
        self.transport.link_name()
    }

    /// Release the transport session.
    pub fn into_transport(self) -> TransportSession<L> {
        self.transport
    }

    /// Query the monitor's board information block.
    pub fn board_info(&mut self) -> Result<BoardInfo> {
        let reply = self.exchange(Operation::Info, None, 0, &CommandFrame::info())?;
        Ok(BoardInfo::parse(&reply.payload)?)
    }

    /// Read `len` bytes starting at `start`, one frame-sized chunk at a time.
    pub fn read(&mut self, operation: Operation, start: Address, len: usize) -> Result<MemoryBlock> {
        let mut assembler = BlockAssembler::new(start, len)?;
        for chunk in chunk_ranges(start, len, self.max_chunk()) {
            let frame = CommandFrame::read(chunk.address.wire(), chunk.len as u16);
            let reply = self.exchange(operation, Some(chunk.address), assembler.completed(), &frame)?;
            assembler.push(chunk.address, &reply.payload)?;
        }
        Ok(assembler.finish()?)
    }

    /// Write `data` starting at `start` in ascending chunks.
    ///
    /// `base` is added to the completed count reported on failure, so a
    /// multi-section load reports its position within the whole image.
    pub fn write(
        &mut self,
        operation: Operation,
        start: Address,
        data: &[u8],
        base: usize,
    ) -> Result<()> {
        validate_range(start, data.len())?;
        for chunk in chunk_ranges(start, data.len(), self.max_chunk()) {
            let bytes = Bytes::copy_from_slice(&data[chunk.offset..chunk.offset + chunk.len]);
            let frame = CommandFrame::write(chunk.address.wire(), bytes)
                .map_err(|source| SessionError::Encode { operation, source })?;
            self.exchange(operation, Some(chunk.address), base + chunk.offset, &frame)?;
        }
        Ok(())
    }

    /// Store `registers` in the register block at `block`, then start
    /// execution at `registers.pc`.
    pub fn execute(&mut self, block: Address, registers: &RegisterSet) -> Result<()> {
        self.write(Operation::Execute, block, &registers.to_bytes(), 0)?;
        let entry = Address::new(registers.pc);
        self.exchange(Operation::Execute, Some(entry), 0, &CommandFrame::exec())?;
        Ok(())
    }

    fn max_chunk(&self) -> usize {
        self.config.frame.max_payload.clamp(1, usize::from(u16::MAX))
    }

    /// Run one exchange to completion, retrying per the retry policy.
    fn exchange(
        &mut self,
        operation: Operation,
        address: Option<Address>,
        completed: usize,
        frame: &CommandFrame,
    ) -> Result<ResponseFrame> {
        self.scratch.clear();
        encode_command(frame, &self.config.frame, &mut self.scratch)
            .map_err(|source| SessionError::Encode { operation, source })?;
        let wire = self.scratch.split().freeze();

        let max_attempts = self.config.retry.max_attempts.max(1);
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            let err = match self.attempt(frame, &wire) {
                Ok(reply) => {
                    self.transition(ExchangeState::Completed);
                    self.stats.exchanges += 1;
                    debug!(%operation, attempts, len = reply.payload.len(), "exchange completed");
                    return Ok(reply);
                }
                Err(err) => err,
            };
            self.transition(ExchangeState::Failed);

            match err {
                AttemptError::Device(status) => {
                    debug!(%operation, status, "board returned error status");
                    return Err(SessionError::Device {
                        operation,
                        address,
                        status,
                        completed,
                    });
                }
                AttemptError::Link(source) => {
                    return Err(SessionError::Link {
                        operation,
                        address,
                        completed,
                        source,
                    });
                }
                AttemptError::Retryable {
                    cause,
                    acknowledged,
                } => {
                    let exec_started = acknowledged && frame.opcode() == Opcode::Exec;
                    if attempts >= max_attempts || exec_started {
                        return Err(SessionError::CommandFailed {
                            operation,
                            address,
                            attempts,
                            completed,
                            last_error: cause,
                        });
                    }
                    warn!(%operation, attempt = attempts, error = %cause, "exchange failed; retrying");
                    self.stats.retries += 1;
                    self.pause(self.config.retry.delay);
                }
            }
        }
    }

    fn attempt(&mut self, frame: &CommandFrame, wire: &[u8]) -> std::result::Result<ResponseFrame, AttemptError> {
        let timeout = self.config.reply_timeout;
        self.transition(ExchangeState::Idle);

        self.transport
            .resync()
            .map_err(|err| transport_failure(err, false))?;
        self.transport
            .send(&self.config.frame.sync)
            .map_err(|err| transport_failure(err, false))?;
        let status = self
            .transport
            .receive(1, timeout)
            .map_err(|err| transport_failure(err, false))?;
        match decode_status(status[0], &self.config.frame) {
            Ok(Status::Ack) => {}
            Ok(Status::Error(code)) => return Err(AttemptError::Device(code)),
            Err(err) => {
                return Err(AttemptError::Retryable {
                    cause: LastError::Corrupt(err),
                    acknowledged: false,
                })
            }
        }

        self.transport
            .send(wire)
            .map_err(|err| transport_failure(err, true))?;
        self.transition(ExchangeState::Sent);

        let expected = frame.reply_len();
        if expected == 0 {
            return Ok(ResponseFrame::ack(Bytes::new()));
        }

        self.transition(ExchangeState::AwaitingResponse);
        let raw = self
            .transport
            .receive(payload_wire_len(expected, &self.config.frame), timeout)
            .map_err(|err| transport_failure(err, true))?;
        let payload = decode_payload(raw, expected, &self.config.frame).map_err(|err: FrameError| {
            AttemptError::Retryable {
                cause: LastError::Corrupt(err),
                acknowledged: true,
            }
        })?;
        Ok(ResponseFrame::ack(payload))
    }

    fn transition(&mut self, next: ExchangeState) {
        trace!(from = %self.state, to = %next, "exchange state");
        self.state = next;
    }

    fn pause(&self, delay: Duration) {
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
    }
}

impl<L> fmt::Debug for CommandEngine<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandEngine")
            .field("state", &self.state)
            .field("stats", &self.stats)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
