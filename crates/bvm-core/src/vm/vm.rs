//! Virtual Machine Core
//!
//! Defines the virtual machine structure and its fetch-decode-execute loop.
//! ALU opcodes take a single compact path; every other opcode is dispatched
//! through one match over the closed opcode set.

use std::fmt;
use std::io::Write;

use log::{debug, trace, warn};

use crate::bytecode::{Instruction, OpCode, SENTINEL};
use crate::config::VmConfig;
use crate::error::{VmError, VmResult};
use crate::syscall::{Flow, HostIo, RoutineTable, SyscallContext};

use super::alu;
use super::cast::{self, CastSpec};
use super::frame::CallStack;
use super::heap::Heap;
use super::memory::Memory;
use super::stack::Stack;
use super::trace::{Snapshot, Tracer};
use super::value::{DataType, Value};

/// Library table selected by a call instruction
#[derive(Debug, Clone, Copy)]
enum Library {
    Sys,
    Obj,
}

/// Bytecode virtual machine
pub struct VirtualMachine {
    config: VmConfig,
    stack: Stack,
    memory: Memory,
    heap: Heap,
    frames: CallStack,

    program: Vec<Instruction>,
    pc: usize,
    halted: bool,

    io: HostIo,
    syscalls: RoutineTable,
    objcalls: RoutineTable,
    tracer: Option<Box<dyn Tracer>>,
}

impl fmt::Debug for VirtualMachine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VirtualMachine")
            .field("config", &self.config)
            .field("pc", &self.pc)
            .field("halted", &self.halted)
            .field("stack", &self.stack)
            .field("frame_depth", &self.frames.depth())
            .field("heap_blocks", &self.heap.block_count())
            .finish_non_exhaustive()
    }
}

impl VirtualMachine {
    /// Create a new VM instance with empty library tables
    pub fn new(config: VmConfig, program: Vec<Instruction>) -> Self {
        VirtualMachine {
            stack: Stack::new(config.max_stack_size),
            memory: Memory::new(),
            heap: Heap::new(),
            frames: CallStack::new(config.max_call_depth),
            program,
            pc: 0,
            halted: false,
            io: HostIo::default(),
            syscalls: RoutineTable::new("syscall"),
            objcalls: RoutineTable::new("objcall"),
            tracer: None,
            config,
        }
    }

    /// Replace the streams library routines read from and write to
    pub fn set_io(&mut self, io: HostIo) {
        self.io = io;
    }

    pub fn set_tracer(&mut self, tracer: Box<dyn Tracer>) {
        self.tracer = Some(tracer);
    }

    pub fn syscalls_mut(&mut self) -> &mut RoutineTable {
        &mut self.syscalls
    }

    pub fn objcalls_mut(&mut self) -> &mut RoutineTable {
        &mut self.objcalls
    }

    /// Execute until the program runs off its end, exits, or faults
    pub fn execute(&mut self) -> VmResult<()> {
        while !self.halted && self.pc < self.program.len() {
            self.step()?;
        }
        self.io.out.flush()?;
        Ok(())
    }

    /// Fetch and execute a single instruction
    pub fn step(&mut self) -> VmResult<()> {
        let at = self.pc;
        let instr = *self
            .program
            .get(at)
            .ok_or(VmError::InvalidJumpTarget(at))?;
        self.pc += 1;
        trace!("{:>6}: {}", at, instr);

        self.dispatch(instr).map_err(|source| VmError::Fault {
            pc: at,
            opcode: instr.opcode,
            source: Box::new(source),
        })?;

        if let Some(tracer) = self.tracer.as_mut() {
            tracer.after_step(&Snapshot {
                pc: at,
                instruction: instr,
                stack: &self.stack,
                memory: &self.memory,
                heap: &self.heap,
                frame_depth: self.frames.depth(),
            });
        }
        Ok(())
    }

    fn dispatch(&mut self, instr: Instruction) -> VmResult<()> {
        if OpCode::is_alu(instr.opcode) {
            return self.exec_alu(instr.opcode);
        }
        let op = instr.op().ok_or_else(|| no_handler(instr.opcode))?;
        let arg = instr.arg;

        match op {
            OpCode::Store => self.stack.push(Value::Int(arg as i32)),
            OpCode::StoreByte => self.stack.push(Value::Bool(arg as u8)),
            OpCode::StoreFloat => self.stack.push(Value::Float(f32::from_bits(arg))),
            OpCode::StoreChar => self.stack.push(Value::Char(arg as u8)),

            OpCode::StoreMem => {
                let value = self.stack.pop()?;
                store_into(&mut self.memory, arg, value)
            }
            OpCode::Load => {
                let value = self.memory.load(arg as usize)?;
                self.stack.push(value)
            }

            OpCode::Jump => self.jump(arg),
            OpCode::JumpIf => {
                if self.stack.pop()?.is_truthy() {
                    self.jump(arg)?;
                }
                Ok(())
            }
            OpCode::Call => {
                let target = self.operand_or_pop(arg)?;
                self.check_target(target)?;
                self.frames.push_call(self.pc)?;
                self.pc = target as usize;
                Ok(())
            }
            OpCode::Return => {
                self.pc = self.frames.pop_call()?;
                Ok(())
            }

            OpCode::BuildList => self.build_block(arg, None),
            OpCode::BuildStr => self.build_block(arg, Some(DataType::Char)),
            OpCode::ListAccess => {
                let index = self.operand_or_pop(arg)? as usize;
                let block = self.stack.pop()?.as_pointer()?;
                let value = self.heap.get(block, index)?;
                self.stack.push(value)
            }
            OpCode::ListSet => {
                let index = self.operand_or_pop(arg)? as usize;
                let block = self.stack.pop()?.as_pointer()?;
                let value = self.stack.pop()?;
                let element_type = self.heap.element_type(block)?;
                if value.data_type() != element_type {
                    return Err(VmError::TypeCastError(format!(
                        "cannot store {} into a block of {}",
                        value.data_type(),
                        element_type
                    )));
                }
                self.heap.set(block, index, value)
            }
            OpCode::Cast => {
                let spec = CastSpec::decode(arg)?;
                let value = self.stack.pop()?;
                let result = cast::cast_value(&mut self.heap, value, spec)?;
                self.stack.push(result)
            }

            OpCode::StoreLocal => {
                let value = self.stack.pop()?;
                store_into(&mut self.frames.current_mut()?.locals, arg, value)
            }
            OpCode::LoadLocal => {
                let value = self.frames.current()?.locals.load(arg as usize)?;
                self.stack.push(value)
            }
            OpCode::CreateScope => self.frames.push_scope(),
            OpCode::DelScope => self.frames.pop_scope(),

            OpCode::Syscall => self.library_call(Library::Sys, arg),
            OpCode::ObjCall => self.library_call(Library::Obj, arg),

            OpCode::DefineType | OpCode::New => Err(no_handler(instr.opcode)),

            OpCode::Add
            | OpCode::Sub
            | OpCode::Mul
            | OpCode::Div
            | OpCode::Mod
            | OpCode::And
            | OpCode::Or
            | OpCode::Not
            | OpCode::Eq
            | OpCode::Neq
            | OpCode::Lt
            | OpCode::Gt
            | OpCode::Le
            | OpCode::Ge => self.exec_alu(instr.opcode),
        }
    }

    fn exec_alu(&mut self, byte: u8) -> VmResult<()> {
        let op = OpCode::from_u8(byte).ok_or_else(|| no_handler(byte))?;
        let right = self.stack.pop()?;
        let result = if op == OpCode::Not {
            alu::not(right)
        } else {
            let left = self.stack.pop()?;
            if matches!(op, OpCode::Div | OpCode::Mod) && !right.is_float() && right.bits() == 0 {
                return Err(VmError::DivisionByZero);
            }
            alu::binary(op, left, right)?
        };
        self.stack.push(result)
    }

    /// Immediate argument, or the top of the stack when the argument is the sentinel
    fn operand_or_pop(&mut self, arg: u32) -> VmResult<u32> {
        if arg == SENTINEL {
            Ok(self.stack.pop()?.bits())
        } else {
            Ok(arg)
        }
    }

    fn check_target(&self, target: u32) -> VmResult<()> {
        if target as usize > self.program.len() {
            return Err(VmError::InvalidJumpTarget(target as usize));
        }
        Ok(())
    }

    fn jump(&mut self, target: u32) -> VmResult<()> {
        self.check_target(target)?;
        self.pc = target as usize;
        Ok(())
    }

    /// Pop `count` uniformly typed values into a fresh block; the first value
    /// popped becomes element 0. A string block also takes Int elements,
    /// narrowed to Char.
    fn build_block(&mut self, count: u32, element_type: Option<DataType>) -> VmResult<()> {
        let mut elements = Vec::with_capacity(count as usize);
        for _ in 0..count {
            elements.push(self.stack.pop()?);
        }
        let element_type = element_type
            .or_else(|| elements.first().map(Value::data_type))
            .unwrap_or(DataType::Unassigned);

        let block = self.heap.add_block(element_type);
        for value in elements {
            // String literals arrive as Int character codes.
            let value = match (element_type, value) {
                (DataType::Char, Value::Int(_)) => cast::cast_scalar(value, DataType::Char)?,
                _ => value,
            };
            if value.data_type() != element_type {
                return Err(VmError::TypeCastError(format!(
                    "{} element in a block of {}",
                    value.data_type(),
                    element_type
                )));
            }
            self.heap.push(block, value)?;
        }
        self.stack.push(Value::Pointer(block))
    }

    fn library_call(&mut self, library: Library, index: u32) -> VmResult<()> {
        let table = match library {
            Library::Sys => &self.syscalls,
            Library::Obj => &self.objcalls,
        };
        let Some((name, routine)) = table.get(index) else {
            warn!("unknown {}: {}", table.kind(), index);
            return Ok(());
        };
        debug!("{} {} ({})", table.kind(), index, name);

        let mut ctx = SyscallContext {
            stack: &mut self.stack,
            heap: &mut self.heap,
            io: &mut self.io,
        };
        if routine(&mut ctx)? == Flow::Exit {
            debug!("exit requested by {}", name);
            self.halted = true;
        }
        Ok(())
    }

    pub fn config(&self) -> &VmConfig {
        &self.config
    }

    pub fn program(&self) -> &[Instruction] {
        &self.program
    }

    pub fn pc(&self) -> usize {
        self.pc
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub fn stack(&self) -> &Stack {
        &self.stack
    }

    pub fn stack_mut(&mut self) -> &mut Stack {
        &mut self.stack
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    pub fn heap_mut(&mut self) -> &mut Heap {
        &mut self.heap
    }

    pub fn frame_depth(&self) -> usize {
        self.frames.depth()
    }

    /// Top of the operand stack
    pub fn peek_top(&self) -> VmResult<Value> {
        self.stack.peek().copied()
    }
}

fn store_into(memory: &mut Memory, arg: u32, value: Value) -> VmResult<()> {
    if arg == SENTINEL {
        memory.push(value)?;
    } else {
        memory.store(arg as usize, value)?;
    }
    Ok(())
}

fn no_handler(opcode: u8) -> VmError {
    VmError::UndefinedError(format!("no handler for opcode 0x{:02X}", opcode))
}
