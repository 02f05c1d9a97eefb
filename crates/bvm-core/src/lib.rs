//! BVM - Core Library
//!
//! Public API surface for the bytecode VM core: the tagged value model,
//! operand stack, linear memory, heap, ALU, interpreter loop and the
//! boundary to external library routines.

pub mod error;
pub mod config;
pub mod bytecode;
pub mod vm;
pub mod loader;
pub mod syscall;

// Re-export commonly used types
pub use error::{VmError, VmResult};
pub use config::VmConfig;
pub use bytecode::{Instruction, OpCode, SENTINEL};
pub use vm::{DataType, Value, VirtualMachine};
pub use loader::BytecodeLoader;
pub use syscall::{Flow, HostIo, RoutineTable, SyscallContext};
