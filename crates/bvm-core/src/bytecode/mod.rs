pub mod instruction;
pub mod opcode;

pub use instruction::{assemble, Instruction, INSTRUCTION_SIZE};
pub use opcode::{OpCode, SENTINEL};
