//! Instruction opcodes.
//!
//! Opcodes are single bytes; operands are little-endian 16-bit values
//! except for the `*32` variants, which carry 32-bit codepoints.

/// Instruction opcodes.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(u8)]
pub enum Opcode {
    Halt = 0x00,
    Any = 0x01,
    Char = 0x02,
    Char32 = 0x03,
    Range = 0x04,
    Range32 = 0x05,
    Set = 0x06,
    Span = 0x07,
    Fail = 0x08,
    FailTwice = 0x09,
    Choice = 0x0a,
    ChoicePred = 0x0b,
    Commit = 0x0c,
    PartialCommit = 0x0d,
    BackCommit = 0x0e,
    Call = 0x0f,
    Return = 0x10,
    CapReturn = 0x11,
    Jump = 0x12,
    Throw = 0x13,
    CapBegin = 0x14,
    CapEnd = 0x15,
    CapTerm = 0x16,
    CapNonTerm = 0x17,
}

impl Opcode {
    /// Decode an opcode byte, or `None` if it is not assigned.
    pub fn try_from_u8(v: u8) -> Option<Self> {
        Some(match v {
            0x00 => Self::Halt,
            0x01 => Self::Any,
            0x02 => Self::Char,
            0x03 => Self::Char32,
            0x04 => Self::Range,
            0x05 => Self::Range32,
            0x06 => Self::Set,
            0x07 => Self::Span,
            0x08 => Self::Fail,
            0x09 => Self::FailTwice,
            0x0a => Self::Choice,
            0x0b => Self::ChoicePred,
            0x0c => Self::Commit,
            0x0d => Self::PartialCommit,
            0x0e => Self::BackCommit,
            0x0f => Self::Call,
            0x10 => Self::Return,
            0x11 => Self::CapReturn,
            0x12 => Self::Jump,
            0x13 => Self::Throw,
            0x14 => Self::CapBegin,
            0x15 => Self::CapEnd,
            0x16 => Self::CapTerm,
            0x17 => Self::CapNonTerm,
            _ => return None,
        })
    }

    /// Decode an opcode byte.
    ///
    /// # Panics
    /// Panics on an unassigned byte; the encoder never produces one.
    pub fn from_u8(v: u8) -> Self {
        Self::try_from_u8(v).unwrap_or_else(|| panic!("invalid opcode: {v:#04x}"))
    }

    /// Instruction size in bytes, opcode included.
    pub fn size(self) -> usize {
        match self {
            Self::Halt
            | Self::Any
            | Self::Fail
            | Self::FailTwice
            | Self::Return
            | Self::CapReturn
            | Self::CapEnd => 1,
            Self::Char
            | Self::Set
            | Self::Span
            | Self::Choice
            | Self::ChoicePred
            | Self::Commit
            | Self::PartialCommit
            | Self::BackCommit
            | Self::Call
            | Self::Jump
            | Self::Throw
            | Self::CapBegin
            | Self::CapTerm => 3,
            Self::Char32 | Self::Range | Self::CapNonTerm => 5,
            Self::Range32 => 9,
        }
    }

    /// Mnemonic used by the disassembler.
    pub fn name(self) -> &'static str {
        match self {
            Self::Halt => "halt",
            Self::Any => "any",
            Self::Char => "char",
            Self::Char32 => "char32",
            Self::Range => "range",
            Self::Range32 => "range32",
            Self::Set => "set",
            Self::Span => "span",
            Self::Fail => "fail",
            Self::FailTwice => "fail_twice",
            Self::Choice => "choice",
            Self::ChoicePred => "choice_pred",
            Self::Commit => "commit",
            Self::PartialCommit => "partial_commit",
            Self::BackCommit => "back_commit",
            Self::Call => "call",
            Self::Return => "return",
            Self::CapReturn => "cap_return",
            Self::Jump => "jump",
            Self::Throw => "throw",
            Self::CapBegin => "cap_begin",
            Self::CapEnd => "cap_end",
            Self::CapTerm => "cap_term",
            Self::CapNonTerm => "cap_non_term",
        }
    }

    /// Whether the instruction carries a code-address operand.
    pub fn has_address(self) -> bool {
        matches!(
            self,
            Self::Choice
                | Self::ChoicePred
                | Self::Commit
                | Self::PartialCommit
                | Self::BackCommit
                | Self::Call
                | Self::Jump
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_all_opcodes() {
        for v in 0x00..=0x17u8 {
            let op = Opcode::from_u8(v);
            assert_eq!(op as u8, v);
            assert!(op.size() >= 1);
        }
        assert_eq!(Opcode::try_from_u8(0x42), None);
    }

    #[test]
    fn sizes_match_operand_layout() {
        assert_eq!(Opcode::Halt.size(), 1);
        assert_eq!(Opcode::Char.size(), 3);
        assert_eq!(Opcode::Range.size(), 5);
        assert_eq!(Opcode::Range32.size(), 9);
        assert_eq!(Opcode::CapNonTerm.size(), 5);
    }
}
