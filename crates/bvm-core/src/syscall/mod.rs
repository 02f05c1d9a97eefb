pub mod io;
pub mod registry;

pub use io::{HostIo, SharedBuffer};
pub use registry::{Flow, Routine, RoutineTable, SyscallContext};
