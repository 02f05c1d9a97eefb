//! Text rendering of runtime values
//!
//! Integers print in decimal, booleans as `True`/`False`, floats like C's
//! `%g`, characters as themselves. Char blocks print as strings and every
//! other block as a bracketed, comma-separated list.

use bvm_core::vm::{DataType, Heap, Value};
use bvm_core::VmResult;

/// Append the printed form of `value` to `out`
pub fn render(heap: &Heap, value: Value, out: &mut String) -> VmResult<()> {
    render_on_path(heap, value, out, &mut Vec::new())
}

/// `path` holds the blocks currently being printed; meeting one again
/// prints `[...]`.
fn render_on_path(heap: &Heap, value: Value, out: &mut String, path: &mut Vec<usize>) -> VmResult<()> {
    match value {
        Value::Unassigned => {}
        Value::Int(i) => out.push_str(&i.to_string()),
        Value::Bool(1) => out.push_str("True"),
        Value::Bool(0) => out.push_str("False"),
        Value::Bool(b) => out.push_str(&(b as i8).to_string()),
        Value::Float(f) => out.push_str(&format_g(f)),
        Value::Char(c) => out.push(c as char),
        Value::Obj(o) => out.push_str(&format!("<obj {}>", o)),
        Value::Pointer(block) => {
            if heap.element_type(block)? == DataType::Char {
                out.push_str(&block_string(heap, block)?);
                return Ok(());
            }
            if path.contains(&block) {
                out.push_str("[...]");
                return Ok(());
            }
            path.push(block);
            out.push('[');
            for (i, element) in heap.values(block)?.into_iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                render_on_path(heap, element, out, path)?;
            }
            out.push(']');
            path.pop();
        }
    }
    Ok(())
}

/// Printed form of `value` as an owned string
pub fn to_text(heap: &Heap, value: Value) -> VmResult<String> {
    let mut out = String::new();
    render(heap, value, &mut out)?;
    Ok(out)
}

/// Raw bytes of a block as text
pub fn block_string(heap: &Heap, block: usize) -> VmResult<String> {
    let bytes = heap.block(block)?.memory().bytes();
    Ok(bytes.iter().map(|b| *b as char).collect())
}

/// C `%g` formatting with the default precision of six significant digits.
pub fn format_g(value: f32) -> String {
    const PRECISION: i32 = 6;
    let v = value as f64;
    if v.is_nan() {
        return if v.is_sign_negative() { "-nan" } else { "nan" }.to_string();
    }
    if v.is_infinite() {
        return if v < 0.0 { "-inf" } else { "inf" }.to_string();
    }
    if v == 0.0 {
        return if v.is_sign_negative() { "-0" } else { "0" }.to_string();
    }

    // The exponent must come from the rounded value, so format first.
    let sci = format!("{:.*e}", (PRECISION - 1) as usize, v);
    let (mantissa, exponent) = match sci.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (sci.as_str(), 0),
    };

    if exponent < -4 || exponent >= PRECISION {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", strip_zeros(mantissa), sign, exponent.abs())
    } else {
        let decimals = (PRECISION - 1 - exponent) as usize;
        strip_zeros(&format!("{:.*}", decimals, v))
    }
}

fn strip_zeros(s: &str) -> String {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        s.to_string()
    }
}
