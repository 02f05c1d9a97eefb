//! Call/Recursion Control
//!
//! Bounded stack of frames. A frame is pushed by `CALL` (with a return
//! address) or by scope entry (without one), and each frame owns a private
//! local segment. Reaching the configured depth is fatal.

use log::debug;

use crate::error::{VmError, VmResult};
use super::memory::Memory;

/// One activation record
#[derive(Debug, Default)]
pub struct Frame {
    /// `None` for lexical scopes
    pub return_address: Option<usize>,
    pub locals: Memory,
}

/// Frame stack with a fixed ceiling
#[derive(Debug)]
pub struct CallStack {
    frames: Vec<Frame>,
    limit: usize,
}

impl CallStack {
    pub fn new(limit: usize) -> Self {
        CallStack {
            frames: Vec::new(),
            limit,
        }
    }

    /// Current frame pointer (number of live frames)
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    fn enter(&mut self, return_address: Option<usize>) -> VmResult<()> {
        if self.frames.len() >= self.limit {
            return Err(VmError::RecursionLimitExceeded { limit: self.limit });
        }
        self.frames.push(Frame {
            return_address,
            locals: Memory::new(),
        });
        Ok(())
    }

    /// Enter a called function that returns to `return_address`
    pub fn push_call(&mut self, return_address: usize) -> VmResult<()> {
        self.enter(Some(return_address))?;
        debug!("call: depth {} returns to {}", self.depth(), return_address);
        Ok(())
    }

    pub fn push_scope(&mut self) -> VmResult<()> {
        self.enter(None)?;
        debug!("scope: enter depth {}", self.depth());
        Ok(())
    }

    /// Leave the innermost call and yield its return address. Scopes opened
    /// inside the call are closed with it.
    pub fn pop_call(&mut self) -> VmResult<usize> {
        let innermost = self
            .frames
            .iter()
            .enumerate()
            .rev()
            .find_map(|(i, f)| f.return_address.map(|address| (i, address)));
        let Some((call, address)) = innermost else {
            return Err(VmError::UndefinedError("RETURN outside of a call".to_string()));
        };
        let closed = self.frames.len() - call - 1;
        self.frames.truncate(call);
        debug!(
            "return: depth {} to {} ({} scopes closed)",
            self.depth(),
            address,
            closed
        );
        Ok(address)
    }

    pub fn pop_scope(&mut self) -> VmResult<()> {
        match self.frames.pop() {
            Some(Frame {
                return_address: None,
                ..
            }) => {
                debug!("scope: leave to depth {}", self.depth());
                Ok(())
            }
            Some(_) => Err(VmError::UndefinedError(
                "DEL_SCOPE would discard a call frame".to_string(),
            )),
            None => Err(VmError::UndefinedError("DEL_SCOPE without a scope".to_string())),
        }
    }

    pub fn current(&self) -> VmResult<&Frame> {
        self.frames
            .last()
            .ok_or_else(|| VmError::UndefinedError("no active frame".to_string()))
    }

    pub fn current_mut(&mut self) -> VmResult<&mut Frame> {
        self.frames
            .last_mut()
            .ok_or_else(|| VmError::UndefinedError("no active frame".to_string()))
    }
}
