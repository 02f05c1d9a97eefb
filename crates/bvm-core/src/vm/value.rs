//! Runtime Value Representation
//!
//! Two views of the same data: `Item` is the storage form (type tag plus a
//! raw 32-bit payload) used in linear memory and heap blocks, `Value` is the
//! tagged union the interpreter and ALU work with. Conversion between them is
//! bit-exact; float payloads always travel as IEEE-754 bit patterns.

use std::fmt;

use crate::error::{VmError, VmResult};

/// Closed set of element/value type tags
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DataType {
    #[default]
    Unassigned = 0,
    Bool = 1,
    Int = 2,
    Float = 3,
    Char = 4,
    /// Reference to a heap block
    Pointer = 5,
    Obj = 6,
}

impl DataType {
    pub fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(DataType::Unassigned),
            1 => Some(DataType::Bool),
            2 => Some(DataType::Int),
            3 => Some(DataType::Float),
            4 => Some(DataType::Char),
            5 => Some(DataType::Pointer),
            6 => Some(DataType::Obj),
            _ => None,
        }
    }

    /// Byte width of one element of this type
    pub fn width(self) -> usize {
        match self {
            DataType::Bool | DataType::Char => 1,
            DataType::Unassigned
            | DataType::Int
            | DataType::Float
            | DataType::Pointer
            | DataType::Obj => 4,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            DataType::Unassigned => "UNASSIGNED",
            DataType::Bool => "BOOL",
            DataType::Int => "INT",
            DataType::Float => "FLOAT",
            DataType::Char => "CHAR",
            DataType::Pointer => "POINTER",
            DataType::Obj => "OBJ",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Storage form of a value: a type tag plus its 32-bit payload, as kept
/// in linear memory and heap blocks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Item {
    pub ty: DataType,
    pub value: u32,
}

impl Item {
    pub fn new(ty: DataType, value: u32) -> Self {
        Item { ty, value }
    }
}

/// Runtime value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    /// Slot that was never written
    Unassigned,
    Bool(u8),
    Int(i32),
    Float(f32),
    Char(u8),
    /// Heap block handle
    Pointer(usize),
    Obj(u32),
}

impl Value {
    pub fn data_type(&self) -> DataType {
        match self {
            Value::Unassigned => DataType::Unassigned,
            Value::Bool(_) => DataType::Bool,
            Value::Int(_) => DataType::Int,
            Value::Float(_) => DataType::Float,
            Value::Char(_) => DataType::Char,
            Value::Pointer(_) => DataType::Pointer,
            Value::Obj(_) => DataType::Obj,
        }
    }

    /// Raw 32-bit payload
    pub fn bits(&self) -> u32 {
        match *self {
            Value::Unassigned => 0,
            Value::Bool(b) => b as u32,
            Value::Int(i) => i as u32,
            Value::Float(f) => f.to_bits(),
            Value::Char(c) => c as u32,
            Value::Pointer(p) => p as u32,
            Value::Obj(o) => o,
        }
    }

    /// Rebuild a value from a type tag and payload, narrowing byte-wide types.
    pub fn from_bits(ty: DataType, bits: u32) -> Self {
        match ty {
            DataType::Unassigned => Value::Unassigned,
            DataType::Bool => Value::Bool(bits as u8),
            DataType::Int => Value::Int(bits as i32),
            DataType::Float => Value::Float(f32::from_bits(bits)),
            DataType::Char => Value::Char(bits as u8),
            DataType::Pointer => Value::Pointer(bits as usize),
            DataType::Obj => Value::Obj(bits),
        }
    }

    pub fn from_item(item: Item) -> Self {
        Self::from_bits(item.ty, item.value)
    }

    pub fn to_item(&self) -> Item {
        Item::new(self.data_type(), self.bits())
    }

    pub fn bool(b: bool) -> Self {
        Value::Bool(b as u8)
    }

    pub fn is_truthy(&self) -> bool {
        self.bits() != 0
    }

    pub fn is_float(&self) -> bool {
        matches!(self, Value::Float(_))
    }

    /// Heap handle carried by a `Pointer` value
    pub fn as_pointer(&self) -> VmResult<usize> {
        match self {
            Value::Pointer(p) => Ok(*p),
            other => Err(VmError::TypeCastError(format!(
                "expected POINTER, found {}",
                other.data_type()
            ))),
        }
    }
}
