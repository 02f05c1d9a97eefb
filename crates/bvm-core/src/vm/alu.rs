//! Arithmetic/Logic Unit
//!
//! Pure functions over values. Logic operators look only at raw payload
//! truthiness. Arithmetic and comparison switch to float when either operand
//! is a float or the operator is DIV/MOD; otherwise they run as 32-bit
//! wrapping integer arithmetic with signed comparisons.
//!
//! Comparison and logic results are tagged `Bool`. Division by zero is not
//! checked here.

use crate::bytecode::OpCode;
use crate::error::{VmError, VmResult};
use super::value::Value;

/// Bit pattern of a float, as stored in a payload slot
#[inline]
pub fn format_float(value: f32) -> u32 {
    value.to_bits()
}

/// Float view of a value: float payloads are reinterpreted, everything else
/// is widened from its signed 32-bit payload.
#[inline]
pub fn extract_float(value: Value) -> f32 {
    match value {
        Value::Float(f) => f,
        other => other.bits() as i32 as f32,
    }
}

/// Floor-division remainder; takes the sign of `b`.
#[inline]
pub fn float_mod(a: f32, b: f32) -> f32 {
    a - b * (a / b).floor()
}

/// Unary NOT over the right-hand operand
pub fn not(right: Value) -> Value {
    Value::bool(right.bits() == 0)
}

/// Apply a binary ALU operator
pub fn binary(op: OpCode, left: Value, right: Value) -> VmResult<Value> {
    match op {
        OpCode::And => Ok(Value::bool(left.is_truthy() && right.is_truthy())),
        OpCode::Or => Ok(Value::bool(left.is_truthy() || right.is_truthy())),
        OpCode::Not => Ok(not(right)),
        _ if left.is_float() || right.is_float() || matches!(op, OpCode::Div | OpCode::Mod) => {
            float_alu(op, extract_float(left), extract_float(right))
        }
        _ => int_alu(op, left.bits(), right.bits()),
    }
}

fn float_alu(op: OpCode, l: f32, r: f32) -> VmResult<Value> {
    let value = match op {
        OpCode::Add => Value::Float(l + r),
        OpCode::Sub => Value::Float(l - r),
        OpCode::Mul => Value::Float(l * r),
        OpCode::Div => Value::Float(l / r),
        OpCode::Mod => Value::Float(float_mod(l, r)),
        OpCode::Eq => Value::bool(l == r),
        OpCode::Neq => Value::bool(l != r),
        OpCode::Lt => Value::bool(l < r),
        OpCode::Gt => Value::bool(l > r),
        OpCode::Le => Value::bool(l <= r),
        OpCode::Ge => Value::bool(l >= r),
        other => return Err(not_alu(other)),
    };
    Ok(value)
}

fn int_alu(op: OpCode, l: u32, r: u32) -> VmResult<Value> {
    let (sl, sr) = (l as i32, r as i32);
    let value = match op {
        OpCode::Add => Value::Int(l.wrapping_add(r) as i32),
        OpCode::Sub => Value::Int(l.wrapping_sub(r) as i32),
        OpCode::Mul => Value::Int(l.wrapping_mul(r) as i32),
        OpCode::Eq => Value::bool(l == r),
        OpCode::Neq => Value::bool(l != r),
        OpCode::Lt => Value::bool(sl < sr),
        OpCode::Gt => Value::bool(sl > sr),
        OpCode::Le => Value::bool(sl <= sr),
        OpCode::Ge => Value::bool(sl >= sr),
        other => return Err(not_alu(other)),
    };
    Ok(value)
}

fn not_alu(op: OpCode) -> VmError {
    VmError::UndefinedError(format!("{} is not an ALU operation", op.mnemonic()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn integer_arithmetic_wraps() {
        assert_eq!(
            binary(OpCode::Add, Value::Int(i32::MAX), Value::Int(1)).unwrap(),
            Value::Int(i32::MIN)
        );
        assert_eq!(binary(OpCode::Sub, Value::Int(2), Value::Int(5)).unwrap(), Value::Int(-3));
        assert_eq!(
            binary(OpCode::Mul, Value::Int(0x10000), Value::Int(0x10000)).unwrap(),
            Value::Int(0)
        );
    }

    #[test]
    fn comparisons_are_signed() {
        let minus_one = Value::from_bits(crate::vm::DataType::Int, 0xFFFF_FFFF);
        assert_eq!(binary(OpCode::Lt, minus_one, Value::Int(1)).unwrap(), Value::Bool(1));
        assert_eq!(binary(OpCode::Ge, minus_one, Value::Int(1)).unwrap(), Value::Bool(0));
        assert_eq!(binary(OpCode::Eq, Value::Int(4), Value::Int(4)).unwrap(), Value::Bool(1));
    }

    #[test]
    fn division_is_always_float() {
        assert_eq!(binary(OpCode::Div, Value::Int(7), Value::Int(2)).unwrap(), Value::Float(3.5));
        assert_eq!(binary(OpCode::Mod, Value::Int(-7), Value::Int(3)).unwrap(), Value::Float(2.0));
    }

    #[test]
    fn float_operand_promotes() {
        assert_eq!(
            binary(OpCode::Add, Value::Int(1), Value::Float(0.5)).unwrap(),
            Value::Float(1.5)
        );
        assert_eq!(
            binary(OpCode::Lt, Value::Float(-0.5), Value::Int(0)).unwrap(),
            Value::Bool(1)
        );
    }

    #[test]
    fn logic_uses_truthiness() {
        assert_eq!(binary(OpCode::And, Value::Int(3), Value::Int(0)).unwrap(), Value::Bool(0));
        assert_eq!(binary(OpCode::Or, Value::Int(0), Value::Char(1)).unwrap(), Value::Bool(1));
        assert_eq!(not(Value::Int(0)), Value::Bool(1));
        assert_eq!(not(Value::Float(-0.0)), Value::Bool(0));
    }

    #[test]
    fn non_alu_opcode_is_rejected() {
        assert!(binary(OpCode::Jump, Value::Int(1), Value::Int(1)).is_err());
    }

    proptest! {
        #[test]
        fn float_bits_round_trip(bits in any::<u32>()) {
            let f = f32::from_bits(bits);
            let back = extract_float(Value::from_bits(crate::vm::DataType::Float, format_float(f)));
            prop_assert_eq!(back.to_bits(), bits);
        }

        #[test]
        fn float_mod_follows_floor_division(a in -1000i32..1000, b in -100i32..100) {
            prop_assume!(b != 0);
            let (a, b) = (a as f32, b as f32);
            let m = float_mod(a, b);
            prop_assert_eq!(m, a - b * (a / b).floor());
            if m != 0.0 {
                prop_assert_eq!(m.is_sign_negative(), b.is_sign_negative());
            }
        }

        #[test]
        fn int_add_matches_wrapping(a in any::<i32>(), b in any::<i32>()) {
            prop_assert_eq!(
                binary(OpCode::Add, Value::Int(a), Value::Int(b)).unwrap(),
                Value::Int(a.wrapping_add(b))
            );
            prop_assert_eq!(
                binary(OpCode::Lt, Value::Int(a), Value::Int(b)).unwrap(),
                Value::bool(a < b)
            );
        }
    }
}
