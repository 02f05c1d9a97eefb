//! BVM builtins: the standard library routine tables
//!
//! The core VM only knows how to look up a routine by index. This crate
//! supplies the routines compiled programs expect behind `SYSCALL` and
//! `OBJCALL`, and installs them into a VM.

pub use bvm_core::vm::VirtualMachine;
pub use bvm_core::VmResult;

pub mod format;
pub mod objects;
pub mod system;

use bvm_core::vm::{DataType, Heap, Value};
use bvm_core::{RoutineTable, SyscallContext};

/// Fresh table holding the standard SYSCALL routines
pub fn standard_syscalls() -> RoutineTable {
    let mut table = RoutineTable::new("syscall");
    system::register(&mut table);
    table
}

/// Fresh table holding the standard OBJCALL routines
pub fn standard_objcalls() -> RoutineTable {
    let mut table = RoutineTable::new("objcall");
    objects::register(&mut table);
    table
}

/// Register both standard tables on `vm`, replacing same-index entries.
pub fn install(vm: &mut VirtualMachine) {
    system::register(vm.syscalls_mut());
    objects::register(vm.objcalls_mut());
}

pub(crate) fn pop_block(ctx: &mut SyscallContext<'_>) -> VmResult<usize> {
    ctx.stack.pop()?.as_pointer()
}

/// Pop a numeric operand as a signed integer
pub(crate) fn pop_int(ctx: &mut SyscallContext<'_>) -> VmResult<i32> {
    Ok(match ctx.stack.pop()? {
        Value::Float(f) => f as i32,
        Value::Bool(b) | Value::Char(b) => b as i32,
        other => other.bits() as i32,
    })
}

/// New Char block holding the bytes of `text`
pub(crate) fn new_string(heap: &mut Heap, text: &str) -> VmResult<usize> {
    let block = heap.add_block(DataType::Char);
    for byte in text.bytes() {
        heap.push(block, Value::Char(byte))?;
    }
    Ok(block)
}
