//! OBJCALL routines: operations over heap blocks
//!
//! Every routine pops the block handle first, then any further operands.

use std::cmp::Ordering;

use bvm_core::vm::{DataType, Value};
use bvm_core::{Flow, RoutineTable, SyscallContext, VmError, VmResult};

use crate::format;
use crate::{new_string, pop_block, pop_int};

pub const APPEND: u32 = 0;
pub const SIZE: u32 = 1;
pub const REMOVE_AT: u32 = 2;
pub const POP: u32 = 3;
pub const IS_EMPTY: u32 = 4;
pub const SLICE: u32 = 5;
pub const MIN: u32 = 8;
pub const MAX: u32 = 9;
pub const LOWER: u32 = 10;
pub const UPPER: u32 = 11;
pub const TO_STRING: u32 = 12;

/// Fill `table` with the standard OBJCALL routines
pub fn register(table: &mut RoutineTable) {
    table
        .register(APPEND, "append", append)
        .register(SIZE, "size", size)
        .register(REMOVE_AT, "remove_at", remove_at)
        .register(POP, "pop", pop)
        .register(IS_EMPTY, "is_empty", is_empty)
        .register(SLICE, "slice", slice)
        .register(MIN, "min", min)
        .register(MAX, "max", max)
        .register(LOWER, "lower", lower)
        .register(UPPER, "upper", upper)
        .register(TO_STRING, "to_string", to_string);
}

/// An empty untyped block takes the type of its first element.
fn append(ctx: &mut SyscallContext<'_>) -> VmResult<Flow> {
    let block = pop_block(ctx)?;
    let item = ctx.stack.pop()?;
    let ty = ctx.heap.element_type(block)?;

    if ty == DataType::Unassigned && ctx.heap.len(block)? == 0 {
        ctx.heap.retype_block(block, item.data_type(), Ok)?;
    } else if ty != item.data_type() {
        return Err(VmError::TypeCastError(format!(
            "cannot append {} to a block of {}",
            item.data_type(),
            ty
        )));
    }
    ctx.heap.push(block, item)?;
    Ok(Flow::Continue)
}

fn size(ctx: &mut SyscallContext<'_>) -> VmResult<Flow> {
    let block = pop_block(ctx)?;
    let len = ctx.heap.len(block)?;
    ctx.stack.push(Value::Int(len as i32))?;
    Ok(Flow::Continue)
}

fn remove_at(ctx: &mut SyscallContext<'_>) -> VmResult<Flow> {
    let block = pop_block(ctx)?;
    let index = pop_int(ctx)?;
    let len = ctx.heap.len(block)?;
    let index = checked_index(index, len)?;
    let width = ctx.heap.element_type(block)?.width();
    ctx.heap.remove_element(block, index, width)?;
    Ok(Flow::Continue)
}

fn pop(ctx: &mut SyscallContext<'_>) -> VmResult<Flow> {
    let block = pop_block(ctx)?;
    let len = ctx.heap.len(block)?;
    let last = checked_index(len as i32 - 1, len)?;
    let value = ctx.heap.get(block, last)?;
    let width = ctx.heap.element_type(block)?.width();
    ctx.heap.remove_element(block, last, width)?;
    ctx.stack.push(value)?;
    Ok(Flow::Continue)
}

fn is_empty(ctx: &mut SyscallContext<'_>) -> VmResult<Flow> {
    let block = pop_block(ctx)?;
    let empty = ctx.heap.len(block)? == 0;
    ctx.stack.push(Value::bool(empty))?;
    Ok(Flow::Continue)
}

/// Operands after the handle: start, end. The range is half-open and
/// clamped to the block, so an inverted range yields an empty copy.
fn slice(ctx: &mut SyscallContext<'_>) -> VmResult<Flow> {
    let block = pop_block(ctx)?;
    let start = pop_int(ctx)?;
    let end = pop_int(ctx)?;

    let values = ctx.heap.values(block)?;
    let clamp = |i: i32| (i.max(0) as usize).min(values.len());
    let (start, end) = (clamp(start), clamp(end));

    let ty = ctx.heap.element_type(block)?;
    let copy = ctx.heap.add_block(ty);
    for value in values.iter().take(end).skip(start) {
        ctx.heap.push(copy, *value)?;
    }
    ctx.stack.push(Value::Pointer(copy))?;
    Ok(Flow::Continue)
}

fn min(ctx: &mut SyscallContext<'_>) -> VmResult<Flow> {
    extreme(ctx, Ordering::Less)
}

fn max(ctx: &mut SyscallContext<'_>) -> VmResult<Flow> {
    extreme(ctx, Ordering::Greater)
}

fn extreme(ctx: &mut SyscallContext<'_>, keep: Ordering) -> VmResult<Flow> {
    let block = pop_block(ctx)?;
    let values = ctx.heap.values(block)?;
    let mut iter = values.into_iter();
    let Some(mut best) = iter.next() else {
        return Err(VmError::IndexOutOfBounds { index: 0, len: 0 });
    };
    for value in iter {
        if compare(value, best) == Some(keep) {
            best = value;
        }
    }
    ctx.stack.push(best)?;
    Ok(Flow::Continue)
}

fn compare(a: Value, b: Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => Some(x.cmp(&y)),
        (Value::Float(x), Value::Float(y)) => x.partial_cmp(&y),
        (Value::Char(x), Value::Char(y)) | (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(&y)),
        _ => a.bits().partial_cmp(&b.bits()),
    }
}

fn lower(ctx: &mut SyscallContext<'_>) -> VmResult<Flow> {
    map_chars(ctx, |c| c.to_ascii_lowercase())
}

fn upper(ctx: &mut SyscallContext<'_>) -> VmResult<Flow> {
    map_chars(ctx, |c| c.to_ascii_uppercase())
}

/// Copy a Char block through `f`; the source is left untouched.
fn map_chars(ctx: &mut SyscallContext<'_>, f: fn(u8) -> u8) -> VmResult<Flow> {
    let block = pop_block(ctx)?;
    let ty = ctx.heap.element_type(block)?;
    if ty != DataType::Char {
        return Err(VmError::TypeCastError(format!("expected a string, got a block of {}", ty)));
    }
    let bytes: Vec<u8> = ctx.heap.block(block)?.memory().bytes().iter().map(|b| f(*b)).collect();
    let copy = ctx.heap.add_block(DataType::Char);
    for byte in bytes {
        ctx.heap.push(copy, Value::Char(byte))?;
    }
    ctx.stack.push(Value::Pointer(copy))?;
    Ok(Flow::Continue)
}

fn to_string(ctx: &mut SyscallContext<'_>) -> VmResult<Flow> {
    let value = ctx.stack.pop()?;
    let text = format::to_text(ctx.heap, value)?;
    let block = new_string(ctx.heap, &text)?;
    ctx.stack.push(Value::Pointer(block))?;
    Ok(Flow::Continue)
}

fn checked_index(index: i32, len: usize) -> VmResult<usize> {
    if index < 0 || index as usize >= len {
        return Err(VmError::IndexOutOfBounds {
            index: index.max(0) as usize,
            len,
        });
    }
    Ok(index as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bvm_core::vm::{Heap, Stack};
    use bvm_core::HostIo;

    fn run(stack: &mut Stack, heap: &mut Heap, routine: bvm_core::syscall::Routine) -> VmResult<Flow> {
        let (mut io, _) = HostIo::capture("");
        let mut ctx = SyscallContext {
            stack,
            heap,
            io: &mut io,
        };
        routine(&mut ctx)
    }

    fn int_block(heap: &mut Heap, values: &[i32]) -> usize {
        let block = heap.add_block(DataType::Int);
        for v in values {
            heap.push(block, Value::Int(*v)).unwrap();
        }
        block
    }

    #[test]
    fn append_types_empty_block() {
        let mut stack = Stack::new(16);
        let mut heap = Heap::new();
        let block = heap.add_block(DataType::Unassigned);

        stack.push(Value::Float(1.5)).unwrap();
        stack.push(Value::Pointer(block)).unwrap();
        run(&mut stack, &mut heap, append).unwrap();
        assert_eq!(heap.element_type(block).unwrap(), DataType::Float);
        assert_eq!(heap.values(block).unwrap(), vec![Value::Float(1.5)]);

        stack.push(Value::Int(2)).unwrap();
        stack.push(Value::Pointer(block)).unwrap();
        assert!(matches!(
            run(&mut stack, &mut heap, append),
            Err(VmError::TypeCastError(_))
        ));
    }

    #[test]
    fn size_counts_elements() {
        let mut stack = Stack::new(16);
        let mut heap = Heap::new();
        let block = int_block(&mut heap, &[4, 5, 6]);
        stack.push(Value::Pointer(block)).unwrap();
        run(&mut stack, &mut heap, size).unwrap();
        assert_eq!(stack.pop().unwrap(), Value::Int(3));
    }

    #[test]
    fn remove_and_pop() {
        let mut stack = Stack::new(16);
        let mut heap = Heap::new();
        let block = int_block(&mut heap, &[4, 5, 6]);

        stack.push(Value::Int(0)).unwrap();
        stack.push(Value::Pointer(block)).unwrap();
        run(&mut stack, &mut heap, remove_at).unwrap();
        assert_eq!(heap.values(block).unwrap(), vec![Value::Int(5), Value::Int(6)]);

        stack.push(Value::Pointer(block)).unwrap();
        run(&mut stack, &mut heap, pop).unwrap();
        assert_eq!(stack.pop().unwrap(), Value::Int(6));
        assert_eq!(heap.len(block).unwrap(), 1);

        stack.push(Value::Int(1)).unwrap();
        stack.push(Value::Pointer(block)).unwrap();
        assert!(matches!(
            run(&mut stack, &mut heap, remove_at),
            Err(VmError::IndexOutOfBounds { index: 1, len: 1 })
        ));
    }

    #[test]
    fn pop_on_empty_block_fails() {
        let mut stack = Stack::new(16);
        let mut heap = Heap::new();
        let block = int_block(&mut heap, &[]);
        stack.push(Value::Pointer(block)).unwrap();
        assert!(matches!(
            run(&mut stack, &mut heap, pop),
            Err(VmError::IndexOutOfBounds { .. })
        ));

        stack.push(Value::Pointer(block)).unwrap();
        run(&mut stack, &mut heap, is_empty).unwrap();
        assert_eq!(stack.pop().unwrap(), Value::Bool(1));
    }

    #[test]
    fn slice_is_half_open_and_clamped() {
        let mut stack = Stack::new(16);
        let mut heap = Heap::new();
        let block = int_block(&mut heap, &[1, 2, 3, 4]);

        stack.push(Value::Int(10)).unwrap(); // end
        stack.push(Value::Int(1)).unwrap(); // start
        stack.push(Value::Pointer(block)).unwrap();
        run(&mut stack, &mut heap, slice).unwrap();
        let copy = stack.pop().unwrap().as_pointer().unwrap();
        assert_eq!(
            heap.values(copy).unwrap(),
            vec![Value::Int(2), Value::Int(3), Value::Int(4)]
        );
        assert_eq!(heap.len(block).unwrap(), 4);
    }

    #[test]
    fn min_max_compare_signed() {
        let mut stack = Stack::new(16);
        let mut heap = Heap::new();
        let block = int_block(&mut heap, &[3, -7, 12, 0]);

        stack.push(Value::Pointer(block)).unwrap();
        run(&mut stack, &mut heap, min).unwrap();
        stack.push(Value::Pointer(block)).unwrap();
        run(&mut stack, &mut heap, max).unwrap();
        assert_eq!(stack.as_slice(), &[Value::Int(-7), Value::Int(12)]);
    }

    #[test]
    fn case_mapping_copies() {
        let mut stack = Stack::new(16);
        let mut heap = Heap::new();
        let word = new_string(&mut heap, "MiXed").unwrap();

        stack.push(Value::Pointer(word)).unwrap();
        run(&mut stack, &mut heap, upper).unwrap();
        let up = stack.pop().unwrap().as_pointer().unwrap();
        assert_eq!(format::block_string(&heap, up).unwrap(), "MIXED");

        stack.push(Value::Pointer(word)).unwrap();
        run(&mut stack, &mut heap, lower).unwrap();
        let low = stack.pop().unwrap().as_pointer().unwrap();
        assert_eq!(format::block_string(&heap, low).unwrap(), "mixed");
        assert_eq!(format::block_string(&heap, word).unwrap(), "MiXed");

        let nums = int_block(&mut heap, &[1]);
        stack.push(Value::Pointer(nums)).unwrap();
        assert!(run(&mut stack, &mut heap, upper).is_err());
    }

    #[test]
    fn to_string_renders_value() {
        let mut stack = Stack::new(16);
        let mut heap = Heap::new();
        let block = int_block(&mut heap, &[1, 2]);
        stack.push(Value::Pointer(block)).unwrap();
        run(&mut stack, &mut heap, to_string).unwrap();
        let text = stack.pop().unwrap().as_pointer().unwrap();
        assert_eq!(format::block_string(&heap, text).unwrap(), "[1, 2]");
    }
}
