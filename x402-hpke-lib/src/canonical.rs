//! Deterministic JSON serialization.
//!
//! All AAD construction, plaintext derivation, and sidecar verification go
//! through this encoder so that two implementations given the same logical
//! input emit identical bytes. The rules:
//!
//! - Object keys sorted in strictly-ascending code-point order at every depth
//! - No whitespace between tokens
//! - Array order preserved verbatim
//! - Numbers emitted without a decimal point when mathematically integral
//!   within the safe integer range (|n| <= 2^53)
//! - Strings escaped minimally (quote, backslash, control characters) and
//!   emitted as UTF-8
//!
//! The encoder must not be swapped for `serde_json::to_string`: that preserves
//! map insertion order under the `preserve_order` feature and formats whole
//! floats with a trailing `.0`, both of which break cross-implementation
//! equality.

use serde_json::Value;

/// Largest magnitude a float may have and still be emitted as an integer.
const SAFE_INTEGER_MAX: f64 = 9_007_199_254_740_992.0; // 2^53

/// Serialize a JSON value into its canonical string form.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::with_capacity(64);
    write_value(value, &mut out);
    out
}

/// Serialize a JSON value into canonical UTF-8 bytes.
pub fn canonicalize(value: &Value) -> Vec<u8> {
    canonical_json(value).into_bytes()
}

fn write_value(value: &Value, out: &mut String) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(true) => out.push_str("true"),
        Value::Bool(false) => out.push_str("false"),
        Value::Number(n) => write_number(n, out),
        Value::String(s) => write_string(s, out),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort_unstable();
            out.push('{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_string(key, out);
                out.push(':');
                write_value(&map[key.as_str()], out);
            }
            out.push('}');
        }
    }
}

fn write_number(n: &serde_json::Number, out: &mut String) {
    if let Some(i) = n.as_i64() {
        out.push_str(&i.to_string());
    } else if let Some(u) = n.as_u64() {
        out.push_str(&u.to_string());
    } else if let Some(f) = n.as_f64() {
        if f.fract() == 0.0 && f.abs() <= SAFE_INTEGER_MAX {
            out.push_str(&(f as i64).to_string());
        } else {
            out.push_str(&n.to_string());
        }
    } else {
        out.push_str(&n.to_string());
    }
}

fn write_string(s: &str, out: &mut String) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0c}' => out.push_str("\\f"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => {
                out.push_str(&format!("\\u{:04x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push('"');
}
