//! The 65xx register block kept by the monitor.
//!
//! The monitor saves CPU state in a 16-byte block at the start of its RAM
//! area and restores it on `EXEC`:
//!
//! ```text
//! off  0  2  4  6   8  10  12 13 14  15
//!      A  X  Y  PC  D  SP  P  E  PBR DBR
//! ```
//! Words are little-endian.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::board::Cpu;
use crate::error::ValidationError;
use crate::model::parse_number;

/// Size of the saved register block.
pub const REGISTER_BLOCK_SIZE: usize = 16;

/// Status flags loaded when the caller does not choose any (`V`, `M`, `X`, `I`, `Z` set).
pub const DEFAULT_STATUS: u8 = 0x76;

/// Stack pointer loaded when the caller does not choose one.
pub const DEFAULT_STACK: u16 = 0x01FF;

/// A CPU register name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Register {
    A,
    X,
    Y,
    PC,
    D,
    SP,
    P,
    E,
    PBR,
    DBR,
}

impl Register {
    pub const ALL: [Register; 10] = [
        Register::A,
        Register::X,
        Register::Y,
        Register::PC,
        Register::D,
        Register::SP,
        Register::P,
        Register::E,
        Register::PBR,
        Register::DBR,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Register::A => "A",
            Register::X => "X",
            Register::Y => "Y",
            Register::PC => "PC",
            Register::D => "D",
            Register::SP => "SP",
            Register::P => "P",
            Register::E => "E",
            Register::PBR => "PBR",
            Register::DBR => "DBR",
        }
    }

    /// Width of the register in bits.
    pub fn bits(self) -> u8 {
        match self {
            Register::A
            | Register::X
            | Register::Y
            | Register::PC
            | Register::D
            | Register::SP => 16,
            Register::P | Register::PBR | Register::DBR => 8,
            Register::E => 1,
        }
    }

    /// Width of the register on `cpu`. The W65C02 has an 8-bit A, X and Y.
    pub fn bits_on(self, cpu: Cpu) -> u8 {
        match (cpu, self) {
            (Cpu::W65C02, Register::A | Register::X | Register::Y) => 8,
            _ => self.bits(),
        }
    }

    fn check(self, value: u32) -> Result<u16, ValidationError> {
        let max = (1u32 << self.bits()) - 1;
        if value > max {
            return Err(ValidationError::RegisterWidth {
                register: self,
                value,
                bits: self.bits(),
            });
        }
        Ok(value as u16)
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Register {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" | "C" => Ok(Register::A),
            "X" => Ok(Register::X),
            "Y" => Ok(Register::Y),
            "PC" => Ok(Register::PC),
            "D" | "DP" => Ok(Register::D),
            "SP" | "S" => Ok(Register::SP),
            "P" | "FLAGS" => Ok(Register::P),
            "E" => Ok(Register::E),
            "PBR" | "K" => Ok(Register::PBR),
            "DBR" | "B" => Ok(Register::DBR),
            _ => Err(ValidationError::UnknownRegister(s.to_string())),
        }
    }
}

/// A snapshot of every register in the monitor's block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RegisterSet {
    pub a: u16,
    pub x: u16,
    pub y: u16,
    pub pc: u16,
    pub d: u16,
    pub sp: u16,
    pub p: u8,
    pub emulation: bool,
    pub pbr: u8,
    pub dbr: u8,
}

impl RegisterSet {
    /// The state loaded when nothing else is known.
    pub fn reset(emulation: bool) -> Self {
        Self {
            a: 0,
            x: 0,
            y: 0,
            pc: 0,
            d: 0,
            sp: DEFAULT_STACK,
            p: DEFAULT_STATUS,
            emulation,
            pbr: 0,
            dbr: 0,
        }
    }

    /// Encode into the monitor's block layout.
    pub fn to_bytes(&self) -> [u8; REGISTER_BLOCK_SIZE] {
        let mut out = [0u8; REGISTER_BLOCK_SIZE];
        for (i, word) in [self.a, self.x, self.y, self.pc, self.d, self.sp]
            .into_iter()
            .enumerate()
        {
            out[i * 2..i * 2 + 2].copy_from_slice(&word.to_le_bytes());
        }
        out[12] = self.p;
        out[13] = u8::from(self.emulation);
        out[14] = self.pbr;
        out[15] = self.dbr;
        out
    }

    /// Decode the monitor's block layout.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ValidationError> {
        if bytes.len() != REGISTER_BLOCK_SIZE {
            return Err(ValidationError::RegisterBlockSize {
                expected: REGISTER_BLOCK_SIZE,
                actual: bytes.len(),
            });
        }
        let word = |i: usize| u16::from_le_bytes([bytes[i], bytes[i + 1]]);
        Ok(Self {
            a: word(0),
            x: word(2),
            y: word(4),
            pc: word(6),
            d: word(8),
            sp: word(10),
            p: bytes[12],
            emulation: bytes[13] != 0,
            pbr: bytes[14],
            dbr: bytes[15],
        })
    }

    pub fn get(&self, register: Register) -> u16 {
        match register {
            Register::A => self.a,
            Register::X => self.x,
            Register::Y => self.y,
            Register::PC => self.pc,
            Register::D => self.d,
            Register::SP => self.sp,
            Register::P => u16::from(self.p),
            Register::E => u16::from(self.emulation),
            Register::PBR => u16::from(self.pbr),
            Register::DBR => u16::from(self.dbr),
        }
    }

    /// Set one register, rejecting values wider than it.
    pub fn set(&mut self, register: Register, value: u32) -> Result<(), ValidationError> {
        let value = register.check(value)?;
        match register {
            Register::A => self.a = value,
            Register::X => self.x = value,
            Register::Y => self.y = value,
            Register::PC => self.pc = value,
            Register::D => self.d = value,
            Register::SP => self.sp = value,
            Register::P => self.p = value as u8,
            Register::E => self.emulation = value != 0,
            Register::PBR => self.pbr = value as u8,
            Register::DBR => self.dbr = value as u8,
        }
        Ok(())
    }

    /// Reject values wider than the registers of `cpu`.
    pub fn check_widths(&self, cpu: Cpu) -> Result<(), ValidationError> {
        for register in Register::ALL {
            let bits = register.bits_on(cpu);
            let value = u32::from(self.get(register));
            if value >= 1u32 << bits {
                return Err(ValidationError::RegisterWidth {
                    register,
                    value,
                    bits,
                });
            }
        }
        Ok(())
    }

    /// Overlay every register the overrides name.
    pub fn apply(&mut self, overrides: &RegisterOverrides) {
        let RegisterOverrides {
            a,
            x,
            y,
            pc,
            d,
            sp,
            p,
            emulation,
            pbr,
            dbr,
        } = *overrides;
        self.a = a.unwrap_or(self.a);
        self.x = x.unwrap_or(self.x);
        self.y = y.unwrap_or(self.y);
        self.pc = pc.unwrap_or(self.pc);
        self.d = d.unwrap_or(self.d);
        self.sp = sp.unwrap_or(self.sp);
        self.p = p.unwrap_or(self.p);
        self.emulation = emulation.unwrap_or(self.emulation);
        self.pbr = pbr.unwrap_or(self.pbr);
        self.dbr = dbr.unwrap_or(self.dbr);
    }
}

/// Caller-chosen register values loaded before execution.
///
/// Registers left as `None` keep their base value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegisterOverrides {
    pub a: Option<u16>,
    pub x: Option<u16>,
    pub y: Option<u16>,
    pub pc: Option<u16>,
    pub d: Option<u16>,
    pub sp: Option<u16>,
    pub p: Option<u8>,
    pub emulation: Option<bool>,
    pub pbr: Option<u8>,
    pub dbr: Option<u8>,
}

impl RegisterOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`RegisterOverrides::set`].
    pub fn with(mut self, register: Register, value: u32) -> Result<Self, ValidationError> {
        self.set(register, value)?;
        Ok(self)
    }

    /// Record an override, rejecting values wider than the register.
    pub fn set(&mut self, register: Register, value: u32) -> Result<(), ValidationError> {
        let value = register.check(value)?;
        match register {
            Register::A => self.a = Some(value),
            Register::X => self.x = Some(value),
            Register::Y => self.y = Some(value),
            Register::PC => self.pc = Some(value),
            Register::D => self.d = Some(value),
            Register::SP => self.sp = Some(value),
            Register::P => self.p = Some(value as u8),
            Register::E => self.emulation = Some(value != 0),
            Register::PBR => self.pbr = Some(value as u8),
            Register::DBR => self.dbr = Some(value as u8),
        }
        Ok(())
    }

    pub fn get(&self, register: Register) -> Option<u16> {
        match register {
            Register::A => self.a,
            Register::X => self.x,
            Register::Y => self.y,
            Register::PC => self.pc,
            Register::D => self.d,
            Register::SP => self.sp,
            Register::P => self.p.map(u16::from),
            Register::E => self.emulation.map(u16::from),
            Register::PBR => self.pbr.map(u16::from),
            Register::DBR => self.dbr.map(u16::from),
        }
    }

    pub fn is_empty(&self) -> bool {
        Register::ALL.iter().all(|r| self.get(*r).is_none())
    }

    /// Parse `NAME=VALUE` assignments (`A=0x10`, `pc=$2000`).
    pub fn parse_assignments<I, S>(assignments: I) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut overrides = Self::new();
        for assignment in assignments {
            let assignment = assignment.as_ref();
            let (name, value) = assignment
                .split_once('=')
                .ok_or_else(|| ValidationError::InvalidAssignment(assignment.to_string()))?;
            let register: Register = name.parse()?;
            overrides.set(register, parse_number(value)?)?;
        }
        Ok(overrides)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_layout_matches_monitor() {
        let regs = RegisterSet {
            a: 0x1234,
            x: 0x0001,
            y: 0x0002,
            pc: 0x2000,
            d: 0x0000,
            sp: 0x01FF,
            p: 0x76,
            emulation: true,
            pbr: 0x00,
            dbr: 0x01,
        };
        assert_eq!(
            regs.to_bytes(),
            [0x34, 0x12, 0x01, 0x00, 0x02, 0x00, 0x00, 0x20, 0x00, 0x00, 0xFF, 0x01, 0x76, 0x01, 0x00, 0x01]
        );
        assert_eq!(RegisterSet::from_bytes(&regs.to_bytes()).unwrap(), regs);
    }

    #[test]
    fn w65c02_accumulator_and_index_are_8_bit() {
        let mut regs = RegisterSet::reset(true);
        regs.x = 0xBEEF;
        assert_eq!(
            regs.check_widths(Cpu::W65C02),
            Err(ValidationError::RegisterWidth {
                register: Register::X,
                value: 0xBEEF,
                bits: 8,
            })
        );
        assert_eq!(regs.check_widths(Cpu::W65C816), Ok(()));

        regs.x = 0xEF;
        assert_eq!(regs.check_widths(Cpu::W65C02), Ok(()));
        assert_eq!(Register::PC.bits_on(Cpu::W65C02), 16);
    }

    #[test]
    fn from_bytes_rejects_wrong_size() {
        let err = RegisterSet::from_bytes(&[0u8; 15]).unwrap_err();
        assert_eq!(
            err,
            ValidationError::RegisterBlockSize {
                expected: 16,
                actual: 15
            }
        );
    }

    #[test]
    fn register_names_are_case_insensitive() {
        assert_eq!("a".parse::<Register>().unwrap(), Register::A);
        assert_eq!("pc".parse::<Register>().unwrap(), Register::PC);
        assert_eq!("Dp".parse::<Register>().unwrap(), Register::D);
        assert_eq!("k".parse::<Register>().unwrap(), Register::PBR);
    }

    #[test]
    fn unknown_register_is_rejected() {
        assert_eq!(
            "Q".parse::<Register>().unwrap_err(),
            ValidationError::UnknownRegister("Q".to_string())
        );
        assert!(RegisterOverrides::parse_assignments(["ACC=1"]).is_err());
    }

    #[test]
    fn over_wide_values_are_rejected() {
        let mut regs = RegisterSet::reset(true);
        assert!(matches!(
            regs.set(Register::P, 0x100),
            Err(ValidationError::RegisterWidth { bits: 8, .. })
        ));
        assert!(regs.set(Register::E, 2).is_err());
        assert!(regs.set(Register::A, 0x1_0000).is_err());
        regs.set(Register::A, 0xFFFF).unwrap();
        assert_eq!(regs.get(Register::A), 0xFFFF);
    }

    #[test]
    fn overrides_apply_only_named_registers() {
        let overrides = RegisterOverrides::parse_assignments(["A=0x10", "x=$20", "E=0"]).unwrap();
        let mut regs = RegisterSet::reset(true);
        regs.apply(&overrides);

        assert_eq!(regs.a, 0x10);
        assert_eq!(regs.x, 0x20);
        assert!(!regs.emulation);
        assert_eq!(regs.y, 0);
        assert_eq!(regs.sp, DEFAULT_STACK);
        assert_eq!(regs.p, DEFAULT_STATUS);
    }

    #[test]
    fn assignment_without_value_is_rejected() {
        assert_eq!(
            RegisterOverrides::parse_assignments(["A"]).unwrap_err(),
            ValidationError::InvalidAssignment("A".to_string())
        );
    }

    #[test]
    fn overrides_builder() {
        let overrides = RegisterOverrides::new().with(Register::A, 0x10).unwrap();
        assert_eq!(overrides.get(Register::A), Some(0x10));
        assert_eq!(overrides.get(Register::X), None);
        assert_eq!(overrides.a, Some(0x10));
        assert!(!overrides.is_empty());
        assert!(RegisterOverrides::new().is_empty());
    }
}
