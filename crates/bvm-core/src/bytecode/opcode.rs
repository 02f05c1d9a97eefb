//! Bytecode Opcode Definitions
//!
//! Defines the raw opcode set for BVM bytecode.
//! This file contains no execution semantics.
//! Opcode values are shared with the compiler and must not be renumbered.

/// Bytecode opcodes
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpCode {
    // Arithmetic
    Add = 0x01,
    Sub = 0x02,
    Mul = 0x03,
    Div = 0x04,
    Mod = 0x05,

    // Logic
    And = 0x06,
    Or  = 0x07,
    Not = 0x08,

    // Comparison
    Eq  = 0x09,
    Neq = 0x0A,
    Lt  = 0x0B,
    Gt  = 0x0C,
    Le  = 0x0D,
    Ge  = 0x0E,

    // Immediates
    Store      = 0x0F,
    StoreByte  = 0x10,
    StoreFloat = 0x11,
    StoreChar  = 0x12,

    // Linear memory
    StoreMem = 0x13,
    Load     = 0x14,

    // Control flow
    Jump   = 0x15,
    JumpIf = 0x16,
    Call   = 0x17,
    Return = 0x18,

    // Heap
    BuildList  = 0x19,
    ListAccess = 0x1A,
    ListSet    = 0x1B,
    DefineType = 0x1C,
    New        = 0x1D,
    Cast       = 0x1E,
    BuildStr   = 0x1F,

    // Scopes
    StoreLocal  = 0x20,
    LoadLocal   = 0x21,
    CreateScope = 0x22,
    DelScope    = 0x23,

    // Library boundary
    ObjCall = 0xFE,
    Syscall = 0xFF,
}

/// Argument value meaning "append" or "take the operand from the stack".
pub const SENTINEL: u32 = u32::MAX;

impl OpCode {
    /// First opcode that is not handled by the ALU.
    pub const FIRST_NON_ALU: u8 = OpCode::Store as u8;

    /// Convert raw byte to opcode
    pub fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            0x01 => Some(OpCode::Add),
            0x02 => Some(OpCode::Sub),
            0x03 => Some(OpCode::Mul),
            0x04 => Some(OpCode::Div),
            0x05 => Some(OpCode::Mod),

            0x06 => Some(OpCode::And),
            0x07 => Some(OpCode::Or),
            0x08 => Some(OpCode::Not),

            0x09 => Some(OpCode::Eq),
            0x0A => Some(OpCode::Neq),
            0x0B => Some(OpCode::Lt),
            0x0C => Some(OpCode::Gt),
            0x0D => Some(OpCode::Le),
            0x0E => Some(OpCode::Ge),

            0x0F => Some(OpCode::Store),
            0x10 => Some(OpCode::StoreByte),
            0x11 => Some(OpCode::StoreFloat),
            0x12 => Some(OpCode::StoreChar),

            0x13 => Some(OpCode::StoreMem),
            0x14 => Some(OpCode::Load),

            0x15 => Some(OpCode::Jump),
            0x16 => Some(OpCode::JumpIf),
            0x17 => Some(OpCode::Call),
            0x18 => Some(OpCode::Return),

            0x19 => Some(OpCode::BuildList),
            0x1A => Some(OpCode::ListAccess),
            0x1B => Some(OpCode::ListSet),
            0x1C => Some(OpCode::DefineType),
            0x1D => Some(OpCode::New),
            0x1E => Some(OpCode::Cast),
            0x1F => Some(OpCode::BuildStr),

            0x20 => Some(OpCode::StoreLocal),
            0x21 => Some(OpCode::LoadLocal),
            0x22 => Some(OpCode::CreateScope),
            0x23 => Some(OpCode::DelScope),

            0xFE => Some(OpCode::ObjCall),
            0xFF => Some(OpCode::Syscall),

            _ => None,
        }
    }

    /// True for raw bytes that the interpreter routes straight to the ALU.
    #[inline]
    pub fn is_alu(byte: u8) -> bool {
        byte != 0 && byte < Self::FIRST_NON_ALU
    }

    /// Assembly mnemonic used by listings and traces
    pub fn mnemonic(self) -> &'static str {
        match self {
            OpCode::Add => "ADD",
            OpCode::Sub => "SUB",
            OpCode::Mul => "MUL",
            OpCode::Div => "DIV",
            OpCode::Mod => "MOD",
            OpCode::And => "AND",
            OpCode::Or => "OR",
            OpCode::Not => "NOT",
            OpCode::Eq => "EQ",
            OpCode::Neq => "NEQ",
            OpCode::Lt => "LT",
            OpCode::Gt => "GT",
            OpCode::Le => "LE",
            OpCode::Ge => "GE",
            OpCode::Store => "STORE",
            OpCode::StoreByte => "STORE_BYTE",
            OpCode::StoreFloat => "STORE_FLOAT",
            OpCode::StoreChar => "STORE_CHAR",
            OpCode::StoreMem => "STORE_MEM",
            OpCode::Load => "LOAD",
            OpCode::Jump => "JUMP",
            OpCode::JumpIf => "JUMP_IF",
            OpCode::Call => "CALL",
            OpCode::Return => "RETURN",
            OpCode::BuildList => "BUILD_LIST",
            OpCode::ListAccess => "LIST_ACCESS",
            OpCode::ListSet => "LIST_SET",
            OpCode::DefineType => "DEFINE_TYPE",
            OpCode::New => "NEW",
            OpCode::Cast => "CAST",
            OpCode::BuildStr => "BUILD_STR",
            OpCode::StoreLocal => "STORE_LOCAL",
            OpCode::LoadLocal => "LOAD_LOCAL",
            OpCode::CreateScope => "CREATE_SCOPE",
            OpCode::DelScope => "DEL_SCOPE",
            OpCode::ObjCall => "OBJCALL",
            OpCode::Syscall => "SYSCALL",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_u8_round_trips_every_opcode() {
        for byte in 0..=u8::MAX {
            if let Some(op) = OpCode::from_u8(byte) {
                assert_eq!(op as u8, byte, "{}", op.mnemonic());
            }
        }
    }

    #[test]
    fn alu_range_stops_before_store() {
        assert!(OpCode::is_alu(OpCode::Add as u8));
        assert!(OpCode::is_alu(OpCode::Ge as u8));
        assert!(!OpCode::is_alu(0x00));
        assert!(!OpCode::is_alu(OpCode::Store as u8));
        assert!(!OpCode::is_alu(OpCode::Syscall as u8));
    }
}
