//! Monitor opcodes and protocol bytes.
//!
//! Every exchange opens with [`SYNC`]; the monitor answers with one status
//! byte ([`ACK`] when it is ready for a command).

/// Attention sequence sent before every command.
pub const SYNC: [u8; 2] = [0x55, 0xAA];

/// Status byte the monitor returns when it accepts the sync.
pub const ACK: u8 = 0xCC;

/// Monitor command opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    /// Write memory: address + length + data.
    WriteMem = 0x02,
    /// Read memory: address + length; the monitor streams `length` bytes back.
    ReadMem = 0x03,
    /// Board information block (TIDE info).
    GetInfo = 0x04,
    /// Resume execution from the saved register block: length `0x0001`.
    Exec = 0x05,
}

impl Opcode {
    /// The wire byte.
    pub fn byte(self) -> u8 {
        self as u8
    }

    /// Whether the opcode is followed by address and length fields.
    pub fn has_operands(self) -> bool {
        matches!(self, Opcode::WriteMem | Opcode::ReadMem)
    }

    /// Whether the opcode is followed by a length field.
    pub fn has_length(self) -> bool {
        self.has_operands() || self == Opcode::Exec
    }

    /// Human-readable name, used in logs and errors.
    pub fn name(self) -> &'static str {
        match self {
            Opcode::WriteMem => "WRITE_MEM",
            Opcode::ReadMem => "READ_MEM",
            Opcode::GetInfo => "GET_INFO",
            Opcode::Exec => "EXEC",
        }
    }
}

impl TryFrom<u8> for Opcode {
    type Error = u8;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        match byte {
            0x02 => Ok(Opcode::WriteMem),
            0x03 => Ok(Opcode::ReadMem),
            0x04 => Ok(Opcode::GetInfo),
            0x05 => Ok(Opcode::Exec),
            other => Err(other),
        }
    }
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opcode_bytes_match_monitor() {
        assert_eq!(Opcode::WriteMem.byte(), 0x02);
        assert_eq!(Opcode::ReadMem.byte(), 0x03);
        assert_eq!(Opcode::GetInfo.byte(), 0x04);
        assert_eq!(Opcode::Exec.byte(), 0x05);
    }

    #[test]
    fn unknown_opcode_is_rejected() {
        assert_eq!(Opcode::try_from(0x03), Ok(Opcode::ReadMem));
        assert_eq!(Opcode::try_from(0x01), Err(0x01));
    }

    #[test]
    fn only_memory_commands_carry_operands() {
        assert!(Opcode::WriteMem.has_operands());
        assert!(Opcode::ReadMem.has_operands());
        assert!(!Opcode::GetInfo.has_operands());
        assert!(!Opcode::Exec.has_operands());
        assert!(Opcode::Exec.has_length());
        assert!(!Opcode::GetInfo.has_length());
    }
}
