//! VM Operand Stack
//!
//! Fixed-capacity LIFO of values. No execution semantics and no type checks;
//! the type travels inside each value.

use crate::error::{VmError, VmResult};
use super::value::Value;

/// VM operand stack
#[derive(Debug)]
pub struct Stack {
    values: Vec<Value>,
    max_size: usize,
}

impl Stack {
    /// Create new stack with maximum size
    pub fn new(max_size: usize) -> Self {
        Stack {
            values: Vec::with_capacity(max_size),
            max_size,
        }
    }

    /// Push value onto stack
    pub fn push(&mut self, value: Value) -> VmResult<()> {
        if self.values.len() >= self.max_size {
            return Err(VmError::StackOverflow {
                capacity: self.max_size,
            });
        }
        self.values.push(value);
        Ok(())
    }

    /// Pop value from stack
    pub fn pop(&mut self) -> VmResult<Value> {
        self.values.pop().ok_or(VmError::StackUnderflow)
    }

    /// Peek at top of stack without removing
    pub fn peek(&self) -> VmResult<&Value> {
        self.values.last().ok_or(VmError::StackUnderflow)
    }

    /// Values from bottom to top
    pub fn as_slice(&self) -> &[Value] {
        &self.values
    }

    /// Get current stack size
    pub fn size(&self) -> usize {
        self.values.len()
    }

    pub fn capacity(&self) -> usize {
        self.max_size
    }

    /// Check if stack is empty
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Clear stack
    pub fn clear(&mut self) {
        self.values.clear();
    }
}
