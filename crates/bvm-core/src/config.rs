//! BVM Configuration
//!
//! Defines runtime limits for the virtual machine.
//! Configuration specifies constraints only; enforcement is handled by the VM.

/// VM Configuration
#[derive(Debug, Clone)]
pub struct VmConfig {
    /// Maximum operand stack depth
    pub max_stack_size: usize,

    /// Maximum number of live frames (calls plus scopes)
    pub max_call_depth: usize,
}

impl Default for VmConfig {
    fn default() -> Self {
        VmConfig {
            max_stack_size: Self::DEFAULT_MAX_STACK_SIZE,
            max_call_depth: Self::DEFAULT_MAX_CALL_DEPTH,
        }
    }
}

impl VmConfig {
    pub const DEFAULT_MAX_STACK_SIZE: usize = 1024;
    pub const DEFAULT_MAX_CALL_DEPTH: usize = 256;

    /// Create a new configuration with default limits
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_stack_size(mut self, size: usize) -> Self {
        self.max_stack_size = size;
        self
    }

    pub fn with_max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth;
        self
    }
}
