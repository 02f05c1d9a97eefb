//! Execution trace hook
//!
//! A tracer observes the machine after every executed instruction through a
//! read-only snapshot. It cannot mutate VM state.

use crate::bytecode::Instruction;
use super::heap::Heap;
use super::memory::Memory;
use super::stack::Stack;

/// Read-only view of the machine after one instruction
#[derive(Debug, Clone, Copy)]
pub struct Snapshot<'a> {
    /// Address of the instruction just executed
    pub pc: usize,
    pub instruction: Instruction,
    pub stack: &'a Stack,
    pub memory: &'a Memory,
    pub heap: &'a Heap,
    pub frame_depth: usize,
}

pub trait Tracer {
    fn after_step(&mut self, snapshot: &Snapshot<'_>);
}
