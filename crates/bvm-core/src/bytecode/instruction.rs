//! Bytecode Instruction Representation
//!
//! Defines the fixed-width instruction format for BVM bytecode:
//! `[1-byte opcode][4-byte little-endian argument]`.
//! This layer contains no execution semantics.

use std::fmt;

use super::opcode::{OpCode, SENTINEL};

/// Encoded size of one instruction record
pub const INSTRUCTION_SIZE: usize = 5;

/// Raw bytecode instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    pub opcode: u8,
    pub arg: u32,
}

impl Instruction {
    /// Create an instruction with an argument
    pub fn new(opcode: OpCode, arg: u32) -> Self {
        Instruction {
            opcode: opcode as u8,
            arg,
        }
    }

    /// Create an instruction whose argument is unused
    pub fn bare(opcode: OpCode) -> Self {
        Self::new(opcode, 0)
    }

    /// Create an instruction whose argument is the sentinel
    pub fn sentinel(opcode: OpCode) -> Self {
        Self::new(opcode, SENTINEL)
    }

    /// `STORE_FLOAT` carrying the bit pattern of `value`
    pub fn float(value: f32) -> Self {
        Self::new(OpCode::StoreFloat, value.to_bits())
    }

    /// Create an instruction from an arbitrary opcode byte
    pub fn raw(opcode: u8, arg: u32) -> Self {
        Instruction { opcode, arg }
    }

    /// Decoded opcode, if the byte names one
    pub fn op(&self) -> Option<OpCode> {
        OpCode::from_u8(self.opcode)
    }

    pub fn encode(&self) -> [u8; INSTRUCTION_SIZE] {
        let arg = self.arg.to_le_bytes();
        [self.opcode, arg[0], arg[1], arg[2], arg[3]]
    }

    pub fn decode(record: [u8; INSTRUCTION_SIZE]) -> Self {
        Instruction {
            opcode: record[0],
            arg: u32::from_le_bytes([record[1], record[2], record[3], record[4]]),
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.op() {
            Some(op) => write!(f, "{:<12}", op.mnemonic())?,
            None => write!(f, "{:<12}", format!("0x{:02X}", self.opcode))?,
        }
        match self.op() {
            Some(OpCode::StoreFloat) => write!(f, " {}", f32::from_bits(self.arg)),
            _ if self.arg == SENTINEL => write!(f, " -1"),
            _ => write!(f, " {}", self.arg),
        }
    }
}

/// Encode a program into its on-disk image
pub fn assemble(program: &[Instruction]) -> Vec<u8> {
    let mut out = Vec::with_capacity(program.len() * INSTRUCTION_SIZE);
    for instr in program {
        out.extend_from_slice(&instr.encode());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argument_is_little_endian() {
        let bytes = Instruction::new(OpCode::Jump, 0x0102_0304).encode();
        assert_eq!(bytes, [0x15, 0x04, 0x03, 0x02, 0x01]);
        assert_eq!(Instruction::decode(bytes).arg, 0x0102_0304);
    }

    #[test]
    fn display_uses_mnemonics() {
        assert_eq!(Instruction::new(OpCode::Call, 7).to_string(), "CALL         7");
        assert_eq!(Instruction::sentinel(OpCode::StoreMem).to_string(), "STORE_MEM    -1");
        assert_eq!(Instruction::float(1.5).to_string(), "STORE_FLOAT  1.5");
        assert_eq!(Instruction::raw(0x77, 0).to_string(), "0x77         0");
    }

    #[test]
    fn float_immediate_keeps_bits() {
        let instr = Instruction::float(-0.0);
        assert_eq!(instr.arg, 0x8000_0000);
        assert_eq!(instr.op(), Some(OpCode::StoreFloat));
    }
}
