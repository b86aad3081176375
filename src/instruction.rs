//! The opcode table and the fixed instruction encoding.
use std::convert::TryFrom;

/// The stable numeric opcode table. Gaps are permitted and present (`24`..`30` cover the
/// remaining bitwise/comparison opcodes), mirroring the original `enum CommandCode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Opcode {
    SetByte = 1,
    SetInt = 2,
    SetUInt = 3,
    SetFloat = 4,
    /// Reserved; a no-op. Left intentionally unspecified.
    Malloc = 5,
    /// Reserved; a no-op. Left intentionally unspecified.
    Free = 6,
    Add = 7,
    Sub = 8,
    Mult = 9,
    Div = 10,
    Jump = 11,
    Jcond = 12,
    And = 13,
    Or = 14,
    Xor = 15,
    Not = 16,
    Push = 17,
    Pop = 18,
    Stack = 19,
    Commands = 20,
    Print = 21,
    Copy = 22,
    Assign = 23,
    Rshift = 24,
    Lshift = 25,
    Greater = 26,
    Less = 27,
    Equal = 28,
    Geq = 29,
    Leq = 30,
}

impl TryFrom<u8> for Opcode {
    /// The raw code that failed to decode, so the kernel can report it verbatim.
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            1 => Opcode::SetByte,
            2 => Opcode::SetInt,
            3 => Opcode::SetUInt,
            4 => Opcode::SetFloat,
            5 => Opcode::Malloc,
            6 => Opcode::Free,
            7 => Opcode::Add,
            8 => Opcode::Sub,
            9 => Opcode::Mult,
            10 => Opcode::Div,
            11 => Opcode::Jump,
            12 => Opcode::Jcond,
            13 => Opcode::And,
            14 => Opcode::Or,
            15 => Opcode::Xor,
            16 => Opcode::Not,
            17 => Opcode::Push,
            18 => Opcode::Pop,
            19 => Opcode::Stack,
            20 => Opcode::Commands,
            21 => Opcode::Print,
            22 => Opcode::Copy,
            23 => Opcode::Assign,
            24 => Opcode::Rshift,
            25 => Opcode::Lshift,
            26 => Opcode::Greater,
            27 => Opcode::Less,
            28 => Opcode::Equal,
            29 => Opcode::Geq,
            30 => Opcode::Leq,
            other => return Err(other),
        })
    }
}

/// The overlaid secondary payload of an [`Instruction`].
///
/// Each opcode only ever inhabits one variant of this payload; using an `enum` instead of
/// a raw union makes the live field self-describing instead of leaving it to convention.
/// Builders are the sanctioned way to produce a well-formed `Operand` for a given opcode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Operand {
    None,
    Addr(i64),
    Byte(u8),
    UInt(u64),
    Int(i64),
    Float(f64),
    Ptr(usize),
}

impl Default for Operand {
    fn default() -> Self {
        Operand::None
    }
}

/// A single program instruction: an opcode plus a primary address, an overlaid
/// secondary payload, and a result address.
///
/// Stored by raw `code: u8` rather than a decoded `Opcode` so that `push_cmd`, the
/// direct, builder-bypassing path, can hold an opcode value that fails to decode; the
/// kernel reports that as `VmError::UnknownOpcode` rather than refusing to store it.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Instruction {
    pub code: u8,
    pub addr: i64,
    pub operand: Operand,
    pub raddr: i64,
}

impl Instruction {
    pub fn new(code: Opcode, addr: i64, operand: Operand, raddr: i64) -> Self {
        Self {
            code: code as u8,
            addr,
            operand,
            raddr,
        }
    }

    /// Decodes [`Self::code`], or `Err(code)` if it doesn't name a live opcode.
    pub fn opcode(&self) -> Result<Opcode, u8> {
        Opcode::try_from(self.code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opcode_round_trips_through_its_numeric_code() {
        for code in 1u8..=30 {
            if let Ok(op) = Opcode::try_from(code) {
                assert_eq!(op as u8, code);
            }
        }
    }

    #[test]
    fn unknown_code_reports_itself_as_the_error() {
        assert_eq!(Opcode::try_from(0), Err(0));
        assert_eq!(Opcode::try_from(31), Err(31));
    }

    #[test]
    fn default_instruction_decodes_to_an_unknown_opcode() {
        let instr = Instruction::default();
        assert_eq!(instr.opcode(), Err(0));
    }
}
