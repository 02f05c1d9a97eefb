//! VM Heap
//!
//! Arena of independently growable typed blocks backing arrays, strings and
//! aggregates. Blocks are addressed by stable integer handles: the table is
//! append-only and a handle is never recycled within a run.

use log::debug;

use crate::error::{VmError, VmResult};
use super::memory::Memory;
use super::value::{DataType, Item, Value};

/// Deepest structural cast accepted by `duplicate_block`
pub const MAX_NESTING: u32 = 1024;

/// One heap block: a linear segment plus the element type fixing its stride
#[derive(Debug, Clone)]
pub struct Block {
    memory: Memory,
    element_type: DataType,
}

impl Block {
    fn new(element_type: DataType) -> Self {
        Block {
            memory: Memory::new(),
            element_type,
        }
    }

    pub fn element_type(&self) -> DataType {
        self.element_type
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    /// Size in bytes
    pub fn size(&self) -> usize {
        self.memory.size()
    }

    /// Number of whole elements
    pub fn len(&self) -> usize {
        self.memory.size() / self.element_type.width()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Block table
#[derive(Debug, Default)]
pub struct Heap {
    blocks: Vec<Block>,
}

impl Heap {
    pub fn new() -> Self {
        Heap::default()
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Append an empty block and return its handle
    pub fn add_block(&mut self, element_type: DataType) -> usize {
        self.blocks.push(Block::new(element_type));
        let index = self.blocks.len() - 1;
        debug!("heap: block {} allocated ({})", index, element_type);
        index
    }

    pub fn block(&self, index: usize) -> VmResult<&Block> {
        self.blocks
            .get(index)
            .ok_or_else(|| VmError::UndefinedError(format!("no heap block {}", index)))
    }

    fn block_mut(&mut self, index: usize) -> VmResult<&mut Block> {
        self.blocks
            .get_mut(index)
            .ok_or_else(|| VmError::UndefinedError(format!("no heap block {}", index)))
    }

    pub fn element_type(&self, index: usize) -> VmResult<DataType> {
        Ok(self.block(index)?.element_type)
    }

    /// Element count of a block
    pub fn len(&self, index: usize) -> VmResult<usize> {
        Ok(self.block(index)?.len())
    }

    /// Write `width` bytes at `offset`, growing the block as needed.
    pub fn write(&mut self, index: usize, value: u32, offset: usize, width: usize) -> VmResult<usize> {
        let block = self.block_mut(index)?;
        let end = offset
            .checked_add(width)
            .ok_or_else(|| VmError::out_of_bounds(offset, width, block.size()))?;
        if (1..=4).contains(&width) {
            block.memory.expand(end)?;
        }
        let ty = block.element_type;
        block.memory.write(offset, value, width, ty)
    }

    /// Write at the end of the block. Returns the offset used.
    pub fn append(&mut self, index: usize, value: u32, width: usize) -> VmResult<usize> {
        let block = self.block_mut(index)?;
        let ty = block.element_type;
        block.memory.append(value, width, ty)
    }

    pub fn read(&self, index: usize, offset: usize, width: usize) -> VmResult<u32> {
        self.block(index)?.memory.read(offset, width)
    }

    /// Element `element` of a block, typed by the block's element type
    pub fn get(&self, index: usize, element: usize) -> VmResult<Value> {
        let ty = self.element_type(index)?;
        let bits = self.read(index, element * ty.width(), ty.width())?;
        Ok(Value::from_item(Item::new(ty, bits)))
    }

    /// Overwrite (or grow to) element `element` of a block
    pub fn set(&mut self, index: usize, element: usize, value: Value) -> VmResult<()> {
        let width = self.element_type(index)?.width();
        self.write(index, value.bits(), element * width, width)?;
        Ok(())
    }

    /// Append one element at the block's stride
    pub fn push(&mut self, index: usize, value: Value) -> VmResult<()> {
        let width = self.element_type(index)?.width();
        self.append(index, value.bits(), width)?;
        Ok(())
    }

    /// All elements of a block in order
    pub fn values(&self, index: usize) -> VmResult<Vec<Value>> {
        let block = self.block(index)?;
        (0..block.len()).map(|i| self.get(index, i)).collect()
    }

    /// Drop one element, shifting the following elements left.
    pub fn remove_element(&mut self, index: usize, element_index: usize, element_width: usize) -> VmResult<()> {
        let count = self.blocks.len();
        let block = self
            .blocks
            .get_mut(index)
            .ok_or_else(|| VmError::out_of_bounds(index, 1, count))?;
        let total = if element_width == 0 { 0 } else { block.size() / element_width };
        if element_index >= total {
            return Err(VmError::out_of_bounds(
                element_index.saturating_mul(element_width),
                element_width,
                block.size(),
            ));
        }
        block.memory.remove_range(element_index * element_width, element_width)
    }

    /// Rewrite every element of a block through `convert` and retag it as `to`.
    pub fn retype_block<F>(&mut self, index: usize, to: DataType, mut convert: F) -> VmResult<()>
    where
        F: FnMut(Value) -> VmResult<Value>,
    {
        let converted = self
            .values(index)?
            .into_iter()
            .map(&mut convert)
            .collect::<VmResult<Vec<_>>>()?;
        let mut memory = Memory::new();
        for value in converted {
            memory.append(value.bits(), to.width(), to)?;
        }
        let block = self.block_mut(index)?;
        block.memory = memory;
        block.element_type = to;
        Ok(())
    }

    /// Deep-copy `source` through `depth` levels of nesting.
    ///
    /// At depth 1 the copy is a new block of `to_type` whose elements are the
    /// source bytes re-read at `to_type`'s stride. Above depth 1 the source's
    /// elements are block handles: the copy keeps the source element type and
    /// holds handles to recursively duplicated children. A block that
    /// contains itself on the path being copied is a `TypeCastError`.
    pub fn duplicate_block(&mut self, source: usize, to_type: DataType, depth: u32) -> VmResult<usize> {
        if depth == 0 {
            return Err(VmError::TypeCastError(
                "block duplication needs a depth of at least 1".to_string(),
            ));
        }
        if depth > MAX_NESTING {
            return Err(VmError::TypeCastError(format!(
                "cast depth {} exceeds the nesting limit {}",
                depth, MAX_NESTING
            )));
        }
        let mut path = Vec::new();
        self.duplicate_on_path(source, to_type, depth, &mut path)
    }

    fn duplicate_on_path(
        &mut self,
        source: usize,
        to_type: DataType,
        depth: u32,
        path: &mut Vec<usize>,
    ) -> VmResult<usize> {
        let src = self
            .blocks
            .get(source)
            .ok_or_else(|| VmError::out_of_bounds(source, 1, self.blocks.len()))?;

        if depth == 1 {
            let width = to_type.width();
            let count = src.size() / width;
            let elements = (0..count)
                .map(|i| src.memory.read(i * width, width))
                .collect::<VmResult<Vec<_>>>()?;

            let copy = self.add_block(to_type);
            self.block_mut(copy)?.memory.expand(count * width)?;
            for (i, bits) in elements.into_iter().enumerate() {
                self.write(copy, bits, i * width, width)?;
            }
            return Ok(copy);
        }

        let element_type = src.element_type;
        if element_type != DataType::Pointer {
            return Err(VmError::TypeCastError(format!(
                "depth {} cast over a block of {}",
                depth, element_type
            )));
        }
        if path.contains(&source) {
            return Err(VmError::TypeCastError(format!(
                "block {} contains itself",
                source
            )));
        }
        let width = element_type.width();
        let children = (0..src.len())
            .map(|i| src.memory.read(i * width, width))
            .collect::<VmResult<Vec<_>>>()?;

        path.push(source);
        let copy = self.add_block(element_type);
        for (i, child) in children.into_iter().enumerate() {
            let child_copy = self.duplicate_on_path(child as usize, to_type, depth - 1, path)?;
            self.write(copy, child_copy as u32, i * width, width)?;
        }
        path.pop();
        Ok(copy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn int_block(heap: &mut Heap, values: &[i32]) -> usize {
        let b = heap.add_block(DataType::Int);
        for v in values {
            heap.push(b, Value::Int(*v)).unwrap();
        }
        b
    }

    #[test]
    fn handles_are_stable_and_sequential() {
        let mut heap = Heap::new();
        assert_eq!(heap.add_block(DataType::Int), 0);
        assert_eq!(heap.add_block(DataType::Char), 1);
        assert_eq!(heap.element_type(1).unwrap(), DataType::Char);
        assert!(matches!(heap.read(2, 0, 1), Err(VmError::UndefinedError(_))));
        assert!(matches!(heap.write(5, 0, 0, 1), Err(VmError::UndefinedError(_))));
    }

    #[test]
    fn write_expands_but_read_does_not() {
        let mut heap = Heap::new();
        let b = heap.add_block(DataType::Int);
        heap.write(b, 42, 8, 4).unwrap();
        assert_eq!(heap.block(b).unwrap().size(), 12);
        assert_eq!(heap.read(b, 8, 4).unwrap(), 42);
        assert_eq!(heap.read(b, 0, 4).unwrap(), 0);
        assert!(heap.read(b, 12, 4).is_err());
    }

    #[test]
    fn remove_element_shifts_tail() {
        let mut heap = Heap::new();
        let b = int_block(&mut heap, &[1, 2, 3, 4]);
        heap.remove_element(b, 1, 4).unwrap();
        assert_eq!(
            heap.values(b).unwrap(),
            vec![Value::Int(1), Value::Int(3), Value::Int(4)]
        );
        assert_eq!(heap.block(b).unwrap().size(), 12);
        assert!(matches!(
            heap.remove_element(b, 3, 4),
            Err(VmError::MemoryAccessOutOfBounds { .. })
        ));
        assert!(heap.remove_element(9, 0, 4).is_err());
    }

    #[test]
    fn flat_duplicate_is_independent() {
        let mut heap = Heap::new();
        let b = int_block(&mut heap, &[5, 6, 7]);
        let copy = heap.duplicate_block(b, DataType::Int, 1).unwrap();
        assert_ne!(copy, b);
        assert_eq!(heap.values(copy).unwrap(), heap.values(b).unwrap());
        assert_eq!(heap.block(copy).unwrap().size(), heap.block(b).unwrap().size());

        heap.set(copy, 0, Value::Int(99)).unwrap();
        assert_eq!(heap.get(b, 0).unwrap(), Value::Int(5));
    }

    #[test]
    fn leaf_elements_are_reinterpreted() {
        let mut heap = Heap::new();
        let b = heap.add_block(DataType::Int);
        heap.push(b, Value::Int(0x4443_4241)).unwrap();
        let copy = heap.duplicate_block(b, DataType::Char, 1).unwrap();
        assert_eq!(heap.element_type(copy).unwrap(), DataType::Char);
        assert_eq!(
            heap.values(copy).unwrap(),
            vec![Value::Char(b'A'), Value::Char(b'B'), Value::Char(b'C'), Value::Char(b'D')]
        );
    }

    #[test]
    fn nested_duplicate_copies_every_level() {
        let mut heap = Heap::new();
        let a = int_block(&mut heap, &[1, 2]);
        let b = int_block(&mut heap, &[3]);
        let outer = heap.add_block(DataType::Pointer);
        heap.push(outer, Value::Pointer(a)).unwrap();
        heap.push(outer, Value::Pointer(b)).unwrap();

        let copy = heap.duplicate_block(outer, DataType::Float, 2).unwrap();
        assert_eq!(heap.element_type(copy).unwrap(), DataType::Pointer);
        let children = heap.values(copy).unwrap();
        assert_eq!(children.len(), 2);
        for (child, original) in children.iter().zip([a, b]) {
            let child = child.as_pointer().unwrap();
            assert_ne!(child, original);
            assert_eq!(heap.element_type(child).unwrap(), DataType::Float);
        }
        let first = children[0].as_pointer().unwrap();
        assert_eq!(heap.read(first, 4, 4).unwrap(), 2);

        heap.set(first, 0, Value::Float(1.5)).unwrap();
        assert_eq!(heap.get(a, 0).unwrap(), Value::Int(1));
    }

    #[test]
    fn nested_duplicate_requires_pointer_blocks() {
        let mut heap = Heap::new();
        let b = int_block(&mut heap, &[1]);
        assert!(matches!(
            heap.duplicate_block(b, DataType::Int, 2),
            Err(VmError::TypeCastError(_))
        ));
        assert!(matches!(
            heap.duplicate_block(7, DataType::Int, 1),
            Err(VmError::MemoryAccessOutOfBounds { .. })
        ));
    }

    #[test]
    fn self_containing_block_is_rejected() {
        let mut heap = Heap::new();
        let looped = heap.add_block(DataType::Pointer);
        heap.push(looped, Value::Pointer(looped)).unwrap();
        let before = heap.block_count();

        assert!(matches!(
            heap.duplicate_block(looped, DataType::Int, 900),
            Err(VmError::TypeCastError(_))
        ));
        assert!(matches!(
            heap.duplicate_block(looped, DataType::Int, 60000),
            Err(VmError::TypeCastError(_))
        ));
        assert!(heap.block_count() <= before + 1);
    }

    #[test]
    fn shared_children_are_not_cycles() {
        let mut heap = Heap::new();
        let leaf = int_block(&mut heap, &[8]);
        let outer = heap.add_block(DataType::Pointer);
        heap.push(outer, Value::Pointer(leaf)).unwrap();
        heap.push(outer, Value::Pointer(leaf)).unwrap();

        let copy = heap.duplicate_block(outer, DataType::Int, 2).unwrap();
        let children = heap.values(copy).unwrap();
        assert_ne!(children[0], children[1]);
    }

    #[test]
    fn retype_converts_and_restrides() {
        let mut heap = Heap::new();
        let b = int_block(&mut heap, &[65, 66]);
        heap.retype_block(b, DataType::Char, |v| Ok(Value::Char(v.bits() as u8)))
            .unwrap();
        assert_eq!(heap.block(b).unwrap().size(), 2);
        assert_eq!(heap.values(b).unwrap(), vec![Value::Char(b'A'), Value::Char(b'B')]);
    }

    proptest! {
        #[test]
        fn growing_writes_read_back(values in prop::collection::vec(any::<u32>(), 1..48)) {
            let mut heap = Heap::new();
            let b = heap.add_block(DataType::Int);
            for (k, v) in values.iter().enumerate() {
                heap.write(b, *v, k * 4, 4).unwrap();
                prop_assert_eq!(heap.read(b, k * 4, 4).unwrap(), *v);
            }
            for (k, v) in values.iter().enumerate() {
                prop_assert_eq!(heap.read(b, k * 4, 4).unwrap(), *v);
            }
        }
    }
}
