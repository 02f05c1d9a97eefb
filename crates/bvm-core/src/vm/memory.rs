//! VM Linear Memory
//!
//! A resizable byte segment with a parallel per-address type tag. Values are
//! stored little-endian, 1 to 4 bytes wide. Addressed accesses never grow the
//! segment; only appends do.

use crate::error::{VmError, VmResult};
use super::value::{DataType, Item, Value};

const MAX_WIDTH: usize = 4;

/// Linear byte-addressed segment
#[derive(Debug, Clone, Default)]
pub struct Memory {
    data: Vec<u8>,
    types: Vec<DataType>,
}

impl Memory {
    pub fn new() -> Self {
        Memory::default()
    }

    /// Allocated size in bytes
    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// Grow to at least `new_size` bytes. Never shrinks.
    pub fn expand(&mut self, new_size: usize) -> VmResult<()> {
        if new_size <= self.data.len() {
            return Ok(());
        }
        let additional = new_size - self.data.len();
        self.data
            .try_reserve(additional)
            .and_then(|_| self.types.try_reserve(additional))
            .map_err(|e| VmError::UndefinedError(format!("allocation failed: {}", e)))?;
        self.data.resize(new_size, 0);
        self.types.resize(new_size, DataType::Unassigned);
        Ok(())
    }

    /// Store `width` bytes of `value` at `address`, tagging the slot with `ty`.
    pub fn write(&mut self, address: usize, value: u32, width: usize, ty: DataType) -> VmResult<usize> {
        self.check(address, width)?;
        for (i, byte) in value.to_le_bytes().iter().take(width).enumerate() {
            self.data[address + i] = *byte;
        }
        self.types[address] = ty;
        Ok(address)
    }

    /// Store at the current end, growing the segment. Returns the address used.
    pub fn append(&mut self, value: u32, width: usize, ty: DataType) -> VmResult<usize> {
        Self::check_width(self.data.len(), width, self.data.len())?;
        let address = self.data.len();
        self.expand(address + width)?;
        self.write(address, value, width, ty)
    }

    /// Reassemble a `width`-byte little-endian payload
    pub fn read(&self, address: usize, width: usize) -> VmResult<u32> {
        self.check(address, width)?;
        let value = self.data[address..address + width]
            .iter()
            .enumerate()
            .fold(0u32, |acc, (i, byte)| acc | (*byte as u32) << (8 * i));
        Ok(value)
    }

    /// Type recorded for the slot starting at `address`
    pub fn type_at(&self, address: usize) -> VmResult<DataType> {
        self.types
            .get(address)
            .copied()
            .ok_or_else(|| VmError::out_of_bounds(address, 1, self.data.len()))
    }

    /// Write a value at its natural width
    pub fn store(&mut self, address: usize, value: Value) -> VmResult<usize> {
        let item = value.to_item();
        self.write(address, item.value, item.ty.width(), item.ty)
    }

    /// Append a value at its natural width
    pub fn push(&mut self, value: Value) -> VmResult<usize> {
        let item = value.to_item();
        self.append(item.value, item.ty.width(), item.ty)
    }

    /// Read the value whose type was recorded at `address`
    pub fn load(&self, address: usize) -> VmResult<Value> {
        Ok(Value::from_item(self.load_item(address)?))
    }

    /// Raw tagged slot at `address`
    pub fn load_item(&self, address: usize) -> VmResult<Item> {
        let ty = self.type_at(address)?;
        Ok(Item::new(ty, self.read(address, ty.width())?))
    }

    /// Remove `len` bytes starting at `start`, shifting the tail left.
    pub(crate) fn remove_range(&mut self, start: usize, len: usize) -> VmResult<()> {
        self.check_span(start, len)?;
        self.data.drain(start..start + len);
        self.types.drain(start..start + len);
        Ok(())
    }

    fn check(&self, address: usize, width: usize) -> VmResult<()> {
        Self::check_width(address, width, self.data.len())?;
        self.check_span(address, width)
    }

    fn check_span(&self, address: usize, len: usize) -> VmResult<()> {
        match address.checked_add(len) {
            Some(end) if end <= self.data.len() => Ok(()),
            _ => Err(VmError::out_of_bounds(address, len, self.data.len())),
        }
    }

    fn check_width(address: usize, width: usize, size: usize) -> VmResult<()> {
        if width == 0 || width > MAX_WIDTH {
            return Err(VmError::out_of_bounds(address, width, size));
        }
        Ok(())
    }
}
