//! Library Routine Registry
//!
//! Small, explicit table mapping integer indices to library routines. The VM
//! holds one table for `SYSCALL` and one for `OBJCALL`. A missing index is
//! not an error at this layer; the interpreter logs it and moves on.

use crate::error::VmResult;
use crate::vm::heap::Heap;
use crate::vm::stack::Stack;
use super::io::HostIo;

/// What the interpreter should do after a routine returns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// Stop the program successfully
    Exit,
}

/// State a routine may touch. Routines pop their own operands and push
/// their own results.
pub struct SyscallContext<'a> {
    pub stack: &'a mut Stack,
    pub heap: &'a mut Heap,
    pub io: &'a mut HostIo,
}

pub type Routine = fn(&mut SyscallContext<'_>) -> VmResult<Flow>;

#[derive(Clone, Copy)]
struct Entry {
    name: &'static str,
    routine: Routine,
}

impl std::fmt::Debug for Entry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name)
    }
}

/// Index-addressed routine table
#[derive(Debug, Clone)]
pub struct RoutineTable {
    kind: &'static str,
    entries: Vec<Option<Entry>>,
}

impl RoutineTable {
    /// New empty table; `kind` names it in diagnostics
    pub fn new(kind: &'static str) -> Self {
        RoutineTable {
            kind,
            entries: Vec::new(),
        }
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    /// Register (or replace) the routine at `index`
    pub fn register(&mut self, index: u32, name: &'static str, routine: Routine) -> &mut Self {
        let index = index as usize;
        if index >= self.entries.len() {
            self.entries.resize(index + 1, None);
        }
        self.entries[index] = Some(Entry { name, routine });
        self
    }

    pub fn unregister(&mut self, index: u32) {
        if let Some(slot) = self.entries.get_mut(index as usize) {
            *slot = None;
        }
    }

    pub fn get(&self, index: u32) -> Option<(&'static str, Routine)> {
        self.entries
            .get(index as usize)
            .copied()
            .flatten()
            .map(|e| (e.name, e.routine))
    }

    /// Registered `(index, name)` pairs in index order
    pub fn names(&self) -> impl Iterator<Item = (u32, &'static str)> + '_ {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(i, e)| e.map(|e| (i as u32, e.name)))
    }
}
