//! BVM Error Types
//!
//! Defines all core error conditions produced by the bytecode VM.
//! Every condition is fatal for the running program; the core reports it as
//! an `Err` and leaves process termination to the host.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum VmError {
    // Loading and host boundary
    #[error("FileNotFound: unable to locate {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("FilePermissionError: failed to open {}", .0.display())]
    FilePermissionError(PathBuf),

    #[error("io error: {0}")]
    Io(String),

    // Stack and call control
    #[error("StackOverflow: attempted to push beyond capacity {capacity}")]
    StackOverflow { capacity: usize },

    #[error("StackUnderflow: attempted to pop from an empty stack")]
    StackUnderflow,

    #[error("RecursionLimitExceeded: call depth limit {limit} reached")]
    RecursionLimitExceeded { limit: usize },

    #[error("invalid jump target: {0}")]
    InvalidJumpTarget(usize),

    // Memory and heap
    #[error(
        "MemoryAccessOutOfBounds: access of width {width} at {address} (size {size})"
    )]
    MemoryAccessOutOfBounds {
        address: usize,
        width: usize,
        size: usize,
    },

    #[error("IndexOutOfBounds: index {index} outside 0..{len}")]
    IndexOutOfBounds { index: usize, len: usize },

    // Values
    #[error("TypeCastError: {0}")]
    TypeCastError(String),

    #[error("division by zero")]
    DivisionByZero,

    #[error("UnsupportedSerialization: {0}")]
    UnsupportedSerialization(String),

    #[error("UndefinedError: {0}")]
    UndefinedError(String),

    /// An error raised while executing a specific instruction.
    #[error("{source} (opcode 0x{opcode:02X} at pc {pc})")]
    Fault {
        pc: usize,
        opcode: u8,
        #[source]
        source: Box<VmError>,
    },
}

impl VmError {
    /// Shorthand for a bounds violation.
    pub fn out_of_bounds(address: usize, width: usize, size: usize) -> Self {
        VmError::MemoryAccessOutOfBounds {
            address,
            width,
            size,
        }
    }

    /// The underlying error with any instruction context removed.
    pub fn root(&self) -> &VmError {
        match self {
            VmError::Fault { source, .. } => source.root(),
            other => other,
        }
    }

    /// Map an io error raised while touching `path`.
    pub fn from_io(err: io::Error, path: impl Into<PathBuf>) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => VmError::FileNotFound(path.into()),
            io::ErrorKind::PermissionDenied => VmError::FilePermissionError(path.into()),
            _ => VmError::Io(err.to_string()),
        }
    }
}

impl From<io::Error> for VmError {
    fn from(err: io::Error) -> Self {
        VmError::Io(err.to_string())
    }
}

pub type VmResult<T> = Result<T, VmError>;
