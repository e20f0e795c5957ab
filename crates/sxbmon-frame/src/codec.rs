use bytes::{BufMut, Bytes, BytesMut};
use tracing::trace;

use crate::error::{CorruptKind, FrameError, Result};
use crate::opcode::{Opcode, ACK, SYNC};

/// Address field: 3 bytes, little-endian (bank byte last).
pub const ADDRESS_FIELD_SIZE: usize = 3;

/// Length field: 2 bytes, little-endian.
pub const LENGTH_FIELD_SIZE: usize = 2;

/// Size of the board information block returned by [`Opcode::GetInfo`].
pub const INFO_SIZE: usize = 0x20;

/// Default maximum data bytes per frame.
///
/// The monitor's receive buffer takes 62 bytes at a time; larger transfers
/// are chunked into several frames.
pub const DEFAULT_MAX_PAYLOAD: usize = 62;

const MAX_WIRE_ADDRESS: u32 = 0x00FF_FFFF;

/// Integrity byte appended to frames, if the monitor build uses one.
///
/// The stock WDC monitor sends none.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Checksum {
    #[default]
    None,
    /// XOR of all covered bytes.
    Xor8,
    /// Wrapping sum of all covered bytes.
    Sum8,
}

impl Checksum {
    /// Bytes this checksum adds to a frame.
    pub fn size(self) -> usize {
        match self {
            Checksum::None => 0,
            Checksum::Xor8 | Checksum::Sum8 => 1,
        }
    }

    /// Compute the checksum over `bytes`, or `None` when disabled.
    pub fn compute(self, bytes: &[u8]) -> Option<u8> {
        match self {
            Checksum::None => None,
            Checksum::Xor8 => Some(bytes.iter().fold(0u8, |acc, b| acc ^ b)),
            Checksum::Sum8 => Some(bytes.iter().fold(0u8, |acc, b| acc.wrapping_add(*b))),
        }
    }
}

/// Configuration for the frame codec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameConfig {
    /// Maximum data bytes carried by one frame. Default: 62.
    pub max_payload: usize,
    /// Checksum appended to commands and payload replies. Default: none.
    pub checksum: Checksum,
    /// Attention sequence. Default: `55 AA`.
    pub sync: [u8; 2],
    /// Status byte meaning "ready". Default: `CC`.
    pub ack: u8,
    /// Status bytes the monitor uses to reject a command.
    ///
    /// Any other non-ack byte is treated as line noise. Default: none.
    pub error_statuses: Vec<u8>,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_payload: DEFAULT_MAX_PAYLOAD,
            checksum: Checksum::None,
            sync: SYNC,
            ack: ACK,
            error_statuses: Vec::new(),
        }
    }
}

/// One outbound command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandFrame {
    opcode: Opcode,
    address: u32,
    length: u16,
    data: Bytes,
}

impl CommandFrame {
    /// Write `data` starting at `address`.
    pub fn write(address: u32, data: impl Into<Bytes>) -> Result<Self> {
        let data = data.into();
        let length = u16::try_from(data.len()).map_err(|_| FrameError::PayloadTooLarge {
            size: data.len(),
            max: u16::MAX as usize,
        })?;
        Ok(Self {
            opcode: Opcode::WriteMem,
            address,
            length,
            data,
        })
    }

    /// Read `length` bytes starting at `address`.
    pub fn read(address: u32, length: u16) -> Self {
        Self {
            opcode: Opcode::ReadMem,
            address,
            length,
            data: Bytes::new(),
        }
    }

    /// Request the board information block.
    pub fn info() -> Self {
        Self::bare(Opcode::GetInfo)
    }

    /// Start execution from the saved register block.
    ///
    /// The monitor expects a length field of 1 after the opcode.
    pub fn exec() -> Self {
        Self {
            length: 1,
            ..Self::bare(Opcode::Exec)
        }
    }

    fn bare(opcode: Opcode) -> Self {
        Self {
            opcode,
            address: 0,
            length: 0,
            data: Bytes::new(),
        }
    }

    pub fn opcode(&self) -> Opcode {
        self.opcode
    }

    pub fn address(&self) -> u32 {
        self.address
    }

    pub fn length(&self) -> u16 {
        self.length
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Payload bytes the board sends back after this command (checksum excluded).
    pub fn reply_len(&self) -> usize {
        match self.opcode {
            Opcode::ReadMem => self.length as usize,
            Opcode::GetInfo => INFO_SIZE,
            Opcode::WriteMem | Opcode::Exec => 0,
        }
    }

    /// Bytes this frame occupies on the wire.
    pub fn wire_size(&self, config: &FrameConfig) -> usize {
        let address = if self.opcode.has_operands() {
            ADDRESS_FIELD_SIZE
        } else {
            0
        };
        let length = if self.opcode.has_length() {
            LENGTH_FIELD_SIZE
        } else {
            0
        };
        1 + address + length + self.data.len() + config.checksum.size()
    }
}

/// The board's answer to the sync sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Ready for the command.
    Ack,
    /// The monitor reported an error; carries the raw status code.
    Error(u8),
}

/// A decoded reply: the status plus whatever payload followed the command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseFrame {
    pub status: Status,
    pub payload: Bytes,
}

impl ResponseFrame {
    /// An acknowledged reply carrying `payload`.
    pub fn ack(payload: Bytes) -> Self {
        Self {
            status: Status::Ack,
            payload,
        }
    }
}

/// Encode a command into the wire format.
///
/// Wire format (memory commands):
/// ```text
/// ┌────────┬──────────────┬────────────┬──────────────┬──────────┐
/// │ Opcode │ Address      │ Length     │ Data         │ Checksum │
/// │ (1B)   │ (3B LE)      │ (2B LE)    │ (WRITE only) │ (0-1B)   │
/// └────────┴──────────────┴────────────┴──────────────┴──────────┘
/// ```
/// `GET_INFO` is the opcode alone; `EXEC` is the opcode and a length of 1
/// (plus checksum when enabled).
pub fn encode_command(frame: &CommandFrame, config: &FrameConfig, dst: &mut BytesMut) -> Result<()> {
    if frame.opcode.has_operands() {
        if frame.address > MAX_WIRE_ADDRESS {
            return Err(FrameError::AddressOutOfRange(frame.address));
        }
        if frame.length == 0 {
            return Err(FrameError::EmptyPayload(frame.opcode.name()));
        }
        if frame.length as usize > config.max_payload {
            return Err(FrameError::PayloadTooLarge {
                size: frame.length as usize,
                max: config.max_payload,
            });
        }
    }

    let start = dst.len();
    dst.reserve(frame.wire_size(config));
    dst.put_u8(frame.opcode.byte());
    if frame.opcode.has_operands() {
        dst.put_uint_le(u64::from(frame.address), ADDRESS_FIELD_SIZE);
    }
    if frame.opcode.has_length() {
        dst.put_u16_le(frame.length);
    }
    dst.put_slice(&frame.data);
    if let Some(sum) = config.checksum.compute(&dst[start..]) {
        dst.put_u8(sum);
    }
    Ok(())
}

/// Classify the status byte that answers the sync sequence.
///
/// An error status is returned as [`Status::Error`] without looking at any
/// payload; an unrecognized byte is a corrupt frame.
pub fn decode_status(byte: u8, config: &FrameConfig) -> Result<Status> {
    if byte == config.ack {
        return Ok(Status::Ack);
    }
    if config.error_statuses.contains(&byte) {
        return Ok(Status::Error(byte));
    }
    trace!(status = byte, "unexpected status byte");
    Err(FrameError::Corrupt(CorruptKind::UnexpectedStatus(byte)))
}

/// Wire length of a reply payload of `expected_len` data bytes.
pub fn payload_wire_len(expected_len: usize, config: &FrameConfig) -> usize {
    if expected_len == 0 {
        return 0;
    }
    expected_len + config.checksum.size()
}

/// Validate a raw reply payload and strip its checksum.
///
/// A buffer of the wrong size or with a bad checksum is
/// [`FrameError::Corrupt`]; truncated data is never returned.
pub fn decode_payload(raw: Bytes, expected_len: usize, config: &FrameConfig) -> Result<Bytes> {
    let wire_len = payload_wire_len(expected_len, config);
    if raw.len() != wire_len {
        return Err(FrameError::Corrupt(CorruptKind::Short {
            expected: wire_len,
            actual: raw.len(),
        }));
    }
    if expected_len == 0 {
        return Ok(Bytes::new());
    }

    let mut data = raw;
    if config.checksum.size() > 0 {
        let trailer = data.split_off(expected_len);
        let received = trailer[0];
        if let Some(computed) = config.checksum.compute(&data) {
            if computed != received {
                trace!(computed, received, "payload checksum mismatch");
                return Err(FrameError::Corrupt(CorruptKind::Checksum { computed, received }));
            }
        }
    }
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(frame: &CommandFrame, config: &FrameConfig) -> BytesMut {
        let mut buf = BytesMut::new();
        encode_command(frame, config, &mut buf).unwrap();
        buf
    }

    #[test]
    fn write_frame_layout() {
        let frame = CommandFrame::write(0x1234, vec![0xAA, 0xBB]).unwrap();
        let buf = encode(&frame, &FrameConfig::default());
        assert_eq!(
            buf.as_ref(),
            &[0x02, 0x34, 0x12, 0x00, 0x02, 0x00, 0xAA, 0xBB]
        );
        assert_eq!(buf.len(), frame.wire_size(&FrameConfig::default()));
    }

    #[test]
    fn read_frame_layout() {
        let frame = CommandFrame::read(0x00_7F00, 16);
        let buf = encode(&frame, &FrameConfig::default());
        assert_eq!(buf.as_ref(), &[0x03, 0x00, 0x7F, 0x00, 0x10, 0x00]);
        assert_eq!(frame.reply_len(), 16);
    }

    #[test]
    fn bank_byte_is_third_address_byte() {
        let frame = CommandFrame::read(0x01_0203, 1);
        let buf = encode(&frame, &FrameConfig::default());
        assert_eq!(&buf[1..4], &[0x03, 0x02, 0x01]);
    }

    #[test]
    fn info_is_bare_and_exec_carries_length_one() {
        let cfg = FrameConfig::default();
        assert_eq!(encode(&CommandFrame::info(), &cfg).as_ref(), &[0x04]);
        let exec = encode(&CommandFrame::exec(), &cfg);
        assert_eq!(exec.as_ref(), &[0x05, 0x01, 0x00]);
        assert_eq!(exec.len(), CommandFrame::exec().wire_size(&cfg));
        assert_eq!(CommandFrame::info().reply_len(), INFO_SIZE);
        assert_eq!(CommandFrame::exec().reply_len(), 0);
    }

    #[test]
    fn checksum_is_appended_last() {
        let cfg = FrameConfig {
            checksum: Checksum::Xor8,
            ..FrameConfig::default()
        };
        let frame = CommandFrame::write(0x0010, vec![0x0F]).unwrap();
        let buf = encode(&frame, &cfg);
        let body = &buf[..buf.len() - 1];
        let expected = body.iter().fold(0u8, |acc, b| acc ^ b);
        assert_eq!(buf[buf.len() - 1], expected);
        assert_eq!(buf.len(), frame.wire_size(&cfg));
    }

    #[test]
    fn sum8_wraps() {
        assert_eq!(Checksum::Sum8.compute(&[0xFF, 0x02]), Some(0x01));
        assert_eq!(Checksum::None.compute(&[0xFF]), None);
    }

    #[test]
    fn oversized_payload_is_rejected() {
        let cfg = FrameConfig::default();
        let frame = CommandFrame::write(0, vec![0u8; DEFAULT_MAX_PAYLOAD + 1]).unwrap();
        let mut buf = BytesMut::new();
        let err = encode_command(&frame, &cfg, &mut buf).unwrap_err();
        assert!(matches!(err, FrameError::PayloadTooLarge { size: 63, max: 62 }));
        assert!(buf.is_empty());
    }

    #[test]
    fn zero_length_memory_command_is_rejected() {
        let mut buf = BytesMut::new();
        let err = encode_command(&CommandFrame::read(0, 0), &FrameConfig::default(), &mut buf)
            .unwrap_err();
        assert_eq!(err, FrameError::EmptyPayload("READ_MEM"));
    }

    #[test]
    fn address_beyond_24_bits_is_rejected() {
        let mut buf = BytesMut::new();
        let err = encode_command(
            &CommandFrame::read(0x0100_0000, 1),
            &FrameConfig::default(),
            &mut buf,
        )
        .unwrap_err();
        assert_eq!(err, FrameError::AddressOutOfRange(0x0100_0000));
    }

    #[test]
    fn status_classification() {
        let cfg = FrameConfig {
            error_statuses: vec![0xEE],
            ..FrameConfig::default()
        };
        assert_eq!(decode_status(0xCC, &cfg).unwrap(), Status::Ack);
        assert_eq!(decode_status(0xEE, &cfg).unwrap(), Status::Error(0xEE));
        assert_eq!(
            decode_status(0x00, &cfg).unwrap_err(),
            FrameError::Corrupt(CorruptKind::UnexpectedStatus(0x00))
        );
    }

    #[test]
    fn payload_without_checksum_passes_through() {
        let raw = Bytes::from_static(&[1, 2, 3]);
        let data = decode_payload(raw, 3, &FrameConfig::default()).unwrap();
        assert_eq!(data.as_ref(), &[1, 2, 3]);
    }

    #[test]
    fn short_payload_is_corrupt() {
        let err = decode_payload(Bytes::from_static(&[1, 2]), 3, &FrameConfig::default())
            .unwrap_err();
        assert_eq!(
            err,
            FrameError::Corrupt(CorruptKind::Short {
                expected: 3,
                actual: 2
            })
        );
    }

    #[test]
    fn corrupted_checksum_never_decodes() {
        let cfg = FrameConfig {
            checksum: Checksum::Sum8,
            ..FrameConfig::default()
        };
        let data = [0x10u8, 0x20, 0x30];
        let good = Checksum::Sum8.compute(&data).unwrap();

        for bad in (0..=u8::MAX).filter(|b| *b != good) {
            let mut raw = data.to_vec();
            raw.push(bad);
            let err = decode_payload(Bytes::from(raw), data.len(), &cfg).unwrap_err();
            assert!(err.is_corrupt());
        }

        let mut raw = data.to_vec();
        raw.push(good);
        let decoded = decode_payload(Bytes::from(raw), data.len(), &cfg).unwrap();
        assert_eq!(decoded.as_ref(), &data);
    }

    #[test]
    fn flipped_data_bit_fails_checksum() {
        let cfg = FrameConfig {
            checksum: Checksum::Xor8,
            ..FrameConfig::default()
        };
        let data = [0xAAu8, 0xBB];
        let sum = Checksum::Xor8.compute(&data).unwrap();
        let raw = Bytes::from(vec![0xAA ^ 0x01, 0xBB, sum]);
        let err = decode_payload(raw, 2, &cfg).unwrap_err();
        assert!(matches!(err, FrameError::Corrupt(CorruptKind::Checksum { .. })));
    }

    #[test]
    fn write_longer_than_length_field_is_rejected() {
        let err = CommandFrame::write(0, vec![0u8; 70_000]).unwrap_err();
        assert!(matches!(err, FrameError::PayloadTooLarge { size: 70_000, .. }));
    }
}
