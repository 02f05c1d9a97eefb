//! Value and structural casts
//!
//! `CAST` packs its operands into the instruction argument:
//! bits 0..8 source type, bits 8..16 destination type, bits 16..32 depth.
//! Depth 0 converts a scalar; depth 1 and above deep-copies a block tree and
//! converts its leaf elements.

use crate::error::{VmError, VmResult};
use super::heap::Heap;
use super::value::{DataType, Value};

/// Decoded `CAST` argument
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CastSpec {
    pub from: DataType,
    pub to: DataType,
    pub depth: u32,
}

impl CastSpec {
    pub fn new(from: DataType, to: DataType, depth: u32) -> Self {
        CastSpec { from, to, depth }
    }

    pub fn decode(arg: u32) -> VmResult<Self> {
        let ty = |byte: u32| {
            DataType::from_u8(byte as u8)
                .ok_or_else(|| VmError::TypeCastError(format!("unknown type tag {}", byte)))
        };
        Ok(CastSpec {
            from: ty(arg & 0xFF)?,
            to: ty((arg >> 8) & 0xFF)?,
            depth: arg >> 16,
        })
    }

    pub fn encode(&self) -> u32 {
        (self.from as u32) | (self.to as u32) << 8 | (self.depth & 0xFFFF) << 16
    }
}

/// Convert one scalar value to `to`.
pub fn cast_scalar(value: Value, to: DataType) -> VmResult<Value> {
    if value.data_type() == to {
        return Ok(value);
    }
    let converted = match (value, to) {
        (Value::Int(i), DataType::Float) => Value::Float(i as f32),
        (Value::Bool(b) | Value::Char(b), DataType::Float) => Value::Float(b as f32),
        (Value::Float(f), DataType::Int) => Value::Int(truncate(f)?),
        (Value::Bool(b) | Value::Char(b), DataType::Int) => Value::Int(b as i32),
        (Value::Int(i), DataType::Bool) => Value::bool(i != 0),
        (Value::Char(c), DataType::Bool) => Value::bool(c != 0),
        (Value::Float(f), DataType::Bool) => Value::bool(f != 0.0),
        (Value::Int(i), DataType::Char) => Value::Char(narrow_char(i)?),
        (Value::Bool(b), DataType::Char) => Value::Char(b),
        (Value::Float(f), DataType::Char) => Value::Char(narrow_char(truncate(f)?)?),
        (other, to) => {
            return Err(VmError::TypeCastError(format!(
                "cannot cast {} to {}",
                other.data_type(),
                to
            )))
        }
    };
    Ok(converted)
}

fn truncate(f: f32) -> VmResult<i32> {
    let t = f.trunc();
    if t.is_finite() && t >= i32::MIN as f32 && t < 2_147_483_648.0 {
        Ok(t as i32)
    } else {
        Err(VmError::TypeCastError(format!("{} does not fit in INT", f)))
    }
}

fn narrow_char(i: i32) -> VmResult<u8> {
    u8::try_from(i).map_err(|_| VmError::TypeCastError(format!("{} does not fit in CHAR", i)))
}

/// Execute a decoded cast against `value`, allocating on the heap for depth >= 1.
pub fn cast_value(heap: &mut Heap, value: Value, spec: CastSpec) -> VmResult<Value> {
    if spec.depth == 0 {
        if value.data_type() != spec.from {
            return Err(VmError::TypeCastError(format!(
                "operand is {}, cast expects {}",
                value.data_type(),
                spec.from
            )));
        }
        return cast_scalar(value, spec.to);
    }

    let source = value.as_pointer()?;
    let copy = heap.duplicate_block(source, spec.from, spec.depth)?;
    if spec.from != spec.to {
        let mut leaves = Vec::new();
        collect_leaves(heap, copy, spec.depth, &mut leaves)?;
        for leaf in leaves {
            heap.retype_block(leaf, spec.to, |v| cast_scalar(v, spec.to))?;
        }
    }
    Ok(Value::Pointer(copy))
}

/// Blocks `depth - 1` levels below `root`, walked without recursion.
fn collect_leaves(heap: &Heap, root: usize, depth: u32, out: &mut Vec<usize>) -> VmResult<()> {
    let mut pending = vec![(root, depth)];
    while let Some((block, depth)) = pending.pop() {
        if depth <= 1 {
            out.push(block);
            continue;
        }
        for child in heap.values(block)?.into_iter().rev() {
            pending.push((child.as_pointer()?, depth - 1));
        }
    }
    Ok(())
}
