//! Memory model: addresses, blocks and chunking.
//!
//! Everything here is pure validation and assembly. Requests are checked
//! before the command engine is allowed to build a frame.

use std::fmt;
use std::str::FromStr;

use bytes::{Bytes, BytesMut};
use serde::Serialize;

use crate::error::ValidationError;

/// Size of the board's addressable memory window.
pub const ADDRESS_SPACE: usize = 0x1_0000;

/// A 16-bit offset into the board's memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(transparent)]
pub struct Address(u16);

impl Address {
    pub const fn new(value: u16) -> Self {
        Self(value)
    }

    pub const fn get(self) -> u16 {
        self.0
    }

    /// The 24-bit wire form (bank 0).
    pub fn wire(self) -> u32 {
        u32::from(self.0)
    }
}

impl From<u16> for Address {
    fn from(value: u16) -> Self {
        Self(value)
    }
}

impl TryFrom<u32> for Address {
    type Error = ValidationError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        u16::try_from(value)
            .map(Self)
            .map_err(|_| ValidationError::AddressOutOfRange(value))
    }
}

impl FromStr for Address {
    type Err = ValidationError;

    /// Accepts `0x2000`, `$2000`, `2000h` (hex) or plain decimal.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from(parse_number(s)?)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06x}", self.0)
    }
}

/// Parse a number written in hex (`0x`, `$`, `h` suffix) or decimal.
pub fn parse_number(input: &str) -> Result<u32, ValidationError> {
    let s = input.trim();
    let invalid = || ValidationError::InvalidNumber(input.to_string());

    let hex = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .or_else(|| s.strip_prefix('$'))
        .or_else(|| s.strip_suffix('h'))
        .or_else(|| s.strip_suffix('H'));

    match hex {
        Some(digits) if !digits.is_empty() => {
            u32::from_str_radix(digits, 16).map_err(|_| invalid())
        }
        Some(_) => Err(invalid()),
        None => s.parse::<u32>().map_err(|_| invalid()),
    }
}

/// Check that `len` bytes starting at `start` fit the address space.
pub fn validate_range(start: Address, len: usize) -> Result<(), ValidationError> {
    if len == 0 {
        return Err(ValidationError::ZeroLength);
    }
    if start.get() as usize + len > ADDRESS_SPACE {
        return Err(ValidationError::RangeOverflow { start, len });
    }
    Ok(())
}

/// A contiguous run of board memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryBlock {
    start: Address,
    data: Bytes,
}

impl MemoryBlock {
    /// Wrap `data` located at `start`; the range must be non-empty and in bounds.
    pub fn new(start: Address, data: impl Into<Bytes>) -> Result<Self, ValidationError> {
        let data = data.into();
        validate_range(start, data.len())?;
        Ok(Self { start, data })
    }

    pub fn start(&self) -> Address {
        self.start
    }

    /// Last address covered by the block.
    pub fn end(&self) -> Address {
        Address::new(self.start.get() + (self.data.len() - 1) as u16)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Bytes {
        self.data
    }
}

/// One frame-sized piece of a larger transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk {
    /// Board address of the first byte.
    pub address: Address,
    /// Offset of the first byte within the whole transfer.
    pub offset: usize,
    pub len: usize,
}

/// Split `len` bytes at `start` into chunks of at most `max` bytes.
///
/// Chunks are contiguous, ascending and non-overlapping. The range must
/// already be validated with [`validate_range`].
pub fn chunk_ranges(start: Address, len: usize, max: usize) -> impl Iterator<Item = Chunk> {
    let max = max.max(1);
    (0..len).step_by(max).map(move |offset| Chunk {
        address: Address::new(start.get().wrapping_add(offset as u16)),
        offset,
        len: max.min(len - offset),
    })
}

/// Collects successive read replies into one [`MemoryBlock`].
#[derive(Debug)]
pub struct BlockAssembler {
    start: Address,
    expected: usize,
    buf: BytesMut,
}

impl BlockAssembler {
    /// Expect `expected` bytes starting at `start`.
    pub fn new(start: Address, expected: usize) -> Result<Self, ValidationError> {
        validate_range(start, expected)?;
        Ok(Self {
            start,
            expected,
            buf: BytesMut::with_capacity(expected),
        })
    }

    /// Append a chunk; it must begin exactly where the previous one ended.
    pub fn push(&mut self, at: Address, bytes: &[u8]) -> Result<(), ValidationError> {
        let next = self.start.get() as usize + self.buf.len();
        if at.get() as usize != next {
            return Err(ValidationError::ChunkOrder {
                expected: Address::new(next as u16),
                got: at,
            });
        }
        if self.buf.len() + bytes.len() > self.expected {
            return Err(ValidationError::ChunkOverrun {
                at,
                len: bytes.len(),
                end: Address::new(self.start.get() + (self.expected - 1) as u16),
            });
        }
        self.buf.extend_from_slice(bytes);
        Ok(())
    }

    /// Bytes collected so far.
    pub fn completed(&self) -> usize {
        self.buf.len()
    }

    /// Finish the block; every expected byte must have arrived.
    pub fn finish(self) -> Result<MemoryBlock, ValidationError> {
        if self.buf.len() != self.expected {
            return Err(ValidationError::Incomplete {
                expected: self.expected,
                received: self.buf.len(),
            });
        }
        MemoryBlock::new(self.start, self.buf.freeze())
    }
}
