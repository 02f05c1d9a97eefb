//! SYSCALL routines: process control, console and file I/O

use std::fs::{self, OpenOptions};
use std::io::Write;

use log::{debug, warn};

use bvm_core::vm::{DataType, Heap, Value};
use bvm_core::{Flow, RoutineTable, SyscallContext, VmError, VmResult};

use crate::format;
use crate::{new_string, pop_block, pop_int};

pub const EXIT: u32 = 0;
pub const PRINT: u32 = 1;
pub const INPUT: u32 = 2;
pub const GETF: u32 = 3;
pub const TYPE: u32 = 4;
pub const SCAN: u32 = 5;
pub const READ: u32 = 6;
pub const WRITE: u32 = 7;

/// Fill `table` with the standard SYSCALL routines
pub fn register(table: &mut RoutineTable) {
    table
        .register(EXIT, "exit", exit)
        .register(PRINT, "print", print)
        .register(INPUT, "input", input)
        .register(GETF, "getf", getf)
        .register(TYPE, "type", type_name)
        .register(SCAN, "scan", scan)
        .register(READ, "read", read)
        .register(WRITE, "write", write);
}

fn exit(_ctx: &mut SyscallContext<'_>) -> VmResult<Flow> {
    Ok(Flow::Exit)
}

fn print(ctx: &mut SyscallContext<'_>) -> VmResult<Flow> {
    let value = ctx.stack.pop()?;
    let text = format::to_text(ctx.heap, value)?;
    ctx.io.out.write_all(text.as_bytes())?;
    Ok(Flow::Continue)
}

/// Read an integer; an unparsable or missing word yields 0.
fn input(ctx: &mut SyscallContext<'_>) -> VmResult<Flow> {
    let word = ctx.io.read_word()?;
    let value = match word.as_deref().map(str::parse::<i32>) {
        Some(Ok(v)) => v,
        Some(Err(_)) | None => {
            warn!("input: expected an integer, got {:?}", word);
            0
        }
    };
    ctx.stack.push(Value::Int(value))?;
    Ok(Flow::Continue)
}

fn getf(ctx: &mut SyscallContext<'_>) -> VmResult<Flow> {
    let word = ctx.io.read_word()?;
    let value = match word.as_deref().map(str::parse::<f32>) {
        Some(Ok(v)) => v,
        Some(Err(_)) | None => {
            warn!("getf: expected a float, got {:?}", word);
            0.0
        }
    };
    ctx.stack.push(Value::Float(value))?;
    Ok(Flow::Continue)
}

fn type_name(ctx: &mut SyscallContext<'_>) -> VmResult<Flow> {
    let ty = ctx.stack.pop()?.data_type();
    let block = new_string(ctx.heap, ty.name())?;
    ctx.stack.push(Value::Pointer(block))?;
    Ok(Flow::Continue)
}

fn scan(ctx: &mut SyscallContext<'_>) -> VmResult<Flow> {
    let word = ctx.io.read_word()?.unwrap_or_default();
    let block = new_string(ctx.heap, &word)?;
    ctx.stack.push(Value::Pointer(block))?;
    Ok(Flow::Continue)
}

/// Operands, top first: file name, start offset, byte count.
///
/// A negative start counts back from the end of the file. The bytes land in
/// a new Bool-typed (byte) block.
fn read(ctx: &mut SyscallContext<'_>) -> VmResult<Flow> {
    let path = file_name(ctx)?;
    let from = pop_int(ctx)?;
    let count = pop_int(ctx)?.max(0) as usize;

    let contents = fs::read(&path).map_err(|e| VmError::from_io(e, &path))?;
    let start = if from < 0 {
        contents.len().saturating_sub(from.unsigned_abs() as usize)
    } else {
        (from as usize).min(contents.len())
    };
    let end = start.saturating_add(count).min(contents.len());
    debug!("read {} bytes from {} at {}", end - start, path, start);

    let block = ctx.heap.add_block(DataType::Bool);
    for byte in &contents[start..end] {
        ctx.heap.push(block, Value::Bool(*byte))?;
    }
    ctx.stack.push(Value::Pointer(block))?;
    Ok(Flow::Continue)
}

/// Operands, top first: file name, source block, byte count, overwrite flag.
///
/// Writes the block's raw bytes, truncating the file when the flag is
/// non-zero and appending otherwise. Pushes the number of bytes written.
fn write(ctx: &mut SyscallContext<'_>) -> VmResult<Flow> {
    let path = file_name(ctx)?;
    let source = pop_block(ctx)?;
    let count = pop_int(ctx)?.max(0) as usize;
    let overwrite = ctx.stack.pop()?.is_truthy();

    let bytes = serializable_bytes(ctx.heap, source)?;
    let bytes = &bytes[..count.min(bytes.len())];

    let mut options = OpenOptions::new();
    options.create(true);
    if overwrite {
        options.write(true).truncate(true);
    } else {
        options.append(true);
    }
    let mut file = options.open(&path).map_err(|e| VmError::from_io(e, &path))?;
    file.write_all(bytes)?;
    debug!("wrote {} bytes to {}", bytes.len(), path);

    ctx.stack.push(Value::Int(bytes.len() as i32))?;
    Ok(Flow::Continue)
}

fn file_name(ctx: &mut SyscallContext<'_>) -> VmResult<String> {
    let block = pop_block(ctx)?;
    format::block_string(ctx.heap, block)
}

/// Blocks of handles have no byte form.
fn serializable_bytes(heap: &Heap, block: usize) -> VmResult<Vec<u8>> {
    match heap.element_type(block)? {
        DataType::Pointer | DataType::Obj => Err(VmError::UnsupportedSerialization(format!(
            "cannot write a block of {}",
            heap.element_type(block)?
        ))),
        _ => Ok(heap.block(block)?.memory().bytes().to_vec()),
    }
}
