//! Board information reported by the monitor's `GET_INFO` command.

use serde::Serialize;

use crate::error::ValidationError;
use crate::model::{validate_range, Address};
use crate::registers::REGISTER_BLOCK_SIZE;

/// Bytes of the info block that carry fields.
const INFO_FIELDS_SIZE: usize = 20;

/// Processor fitted to the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Cpu {
    /// W65C02: emulation-mode only, no ABORT or COP vectors.
    W65C02,
    /// W65C816: native and emulation modes.
    W65C816,
}

/// Hardware vectors the monitor shadows in RAM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Vector {
    Cop,
    Brk,
    Abort,
    Nmi,
    Reset,
    Irq,
}

impl Vector {
    pub const ALL: [Vector; 6] = [
        Vector::Cop,
        Vector::Brk,
        Vector::Abort,
        Vector::Nmi,
        Vector::Reset,
        Vector::Irq,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Vector::Cop => "COP",
            Vector::Brk => "BRK",
            Vector::Abort => "ABORT",
            Vector::Nmi => "NMI",
            Vector::Reset => "RESET",
            Vector::Irq => "IRQ",
        }
    }

    /// Offset from the shadow vector base in native mode.
    fn native_offset(self) -> u32 {
        match self {
            Vector::Cop => 0,
            Vector::Brk => 2,
            Vector::Abort => 4,
            Vector::Nmi => 6,
            Vector::Reset => 8,
            Vector::Irq => 10,
        }
    }

    /// Offset from the shadow vector base in emulation mode.
    ///
    /// BRK shares the IRQ vector in emulation mode.
    fn emulation_offset(self) -> u32 {
        match self {
            Vector::Brk => 26,
            other => other.native_offset() + 16,
        }
    }
}

/// Parsed `GET_INFO` block.
///
/// ```text
/// 0..3   monitor RAM base (register block)   3  CPU type   4  board id
/// 8..11  monitor ROM base   11..14 shadow vector base
/// 14..17 hardware I/O base  17..20 hardware vector base
/// ```
/// All addresses are 24-bit little-endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BoardInfo {
    pub mon_ram: u32,
    pub cpu: Cpu,
    pub board_id: u8,
    pub mon_rom: u32,
    pub shadow_vector_base: u32,
    pub hw_io: u32,
    pub hw_vector_base: u32,
}

impl BoardInfo {
    /// Decode the info block returned by the monitor.
    pub fn parse(bytes: &[u8]) -> Result<Self, ValidationError> {
        if bytes.len() < INFO_FIELDS_SIZE {
            return Err(ValidationError::BoardInfoSize {
                expected: INFO_FIELDS_SIZE,
                actual: bytes.len(),
            });
        }
        let addr = |at: usize| {
            u32::from(bytes[at]) | u32::from(bytes[at + 1]) << 8 | u32::from(bytes[at + 2]) << 16
        };
        Ok(Self {
            mon_ram: addr(0),
            cpu: if bytes[3] == 0 { Cpu::W65C02 } else { Cpu::W65C816 },
            board_id: bytes[4],
            mon_rom: addr(8),
            shadow_vector_base: addr(11),
            hw_io: addr(14),
            hw_vector_base: addr(17),
        })
    }

    /// Where the monitor keeps the saved register block.
    pub fn register_block(&self) -> Result<Address, ValidationError> {
        let start = Address::try_from(self.mon_ram)?;
        validate_range(start, REGISTER_BLOCK_SIZE)?;
        Ok(start)
    }

    /// Whether execution starts in emulation mode.
    ///
    /// A 65C02 has no native mode, so `native` is ignored for it.
    pub fn emulation(&self, native: bool) -> bool {
        match self.cpu {
            Cpu::W65C02 => true,
            Cpu::W65C816 => !native,
        }
    }

    /// RAM address of a shadowed vector, or `None` if the CPU lacks it.
    pub fn vector(&self, vector: Vector, emulation: bool) -> Option<u32> {
        if self.cpu == Cpu::W65C02 && matches!(vector, Vector::Cop | Vector::Abort) {
            return None;
        }
        let offset = if emulation {
            vector.emulation_offset()
        } else {
            vector.native_offset()
        };
        Some(self.shadow_vector_base + offset)
    }

    /// Map a low byte onto the hardware vector page.
    pub fn hardware_address(&self, address: u32) -> u32 {
        (self.hw_vector_base & 0xFF00) | (address & 0x00FF)
    }
}
