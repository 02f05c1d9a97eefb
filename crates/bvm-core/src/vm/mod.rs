pub mod alu;
pub mod cast;
pub mod frame;
pub mod heap;
pub mod memory;
pub mod stack;
pub mod trace;
pub mod value;
pub mod vm;

pub use heap::{Block, Heap};
pub use memory::Memory;
pub use stack::Stack;
pub use trace::{Snapshot, Tracer};
pub use value::{DataType, Item, Value};
pub use vm::VirtualMachine;
