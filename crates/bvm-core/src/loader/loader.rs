//! Bytecode Loader
//!
//! Turns a program image into instructions. The image is a flat sequence of
//! 5-byte records with no header; the instruction count is the image size
//! divided by five.

use std::fs;
use std::path::Path;

use log::{info, warn};

use crate::bytecode::{Instruction, INSTRUCTION_SIZE};
use crate::error::{VmError, VmResult};

/// Bytecode loader
pub struct BytecodeLoader;

impl BytecodeLoader {
    /// Decode raw bytes. Trailing bytes that do not form a full record are
    /// ignored.
    pub fn load(bytes: &[u8]) -> Vec<Instruction> {
        let records = bytes.chunks_exact(INSTRUCTION_SIZE);
        let trailing = records.remainder().len();
        if trailing != 0 {
            warn!("ignoring {} trailing bytes after the last instruction", trailing);
        }
        records
            .map(|chunk| Instruction::decode([chunk[0], chunk[1], chunk[2], chunk[3], chunk[4]]))
            .collect()
    }

    /// Read and decode a program file
    pub fn load_file(path: impl AsRef<Path>) -> VmResult<Vec<Instruction>> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|e| VmError::from_io(e, path))?;
        let program = Self::load(&bytes);
        info!("loaded {} instructions from {}", program.len(), path.display());
        Ok(program)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::{assemble, OpCode};

    #[test]
    fn load_decodes_records() {
        let program = vec![
            Instruction::new(OpCode::Store, 2),
            Instruction::new(OpCode::Syscall, 1),
        ];
        let mut image = assemble(&program);
        assert_eq!(image.len(), 10);
        image.extend_from_slice(&[0x0F, 0x01]);
        assert_eq!(BytecodeLoader::load(&image), program);
    }

    #[test]
    fn missing_file_is_file_not_found() {
        let err = BytecodeLoader::load_file("/nonexistent/program.bin").unwrap_err();
        assert!(matches!(err, VmError::FileNotFound(_)));
    }
}
