//! Scalar coercions shared by the evaluator and the key checker.

use std::borrow::Cow;

use serde_json::{Number, Value};

/// Whether a value counts as "not filled in".
///
/// Blank values are `null`, `false`, numeric zero, `""`, `"0"` and empty
/// arrays or objects.
pub(crate) fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty() || s == "0",
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}

/// Text a pattern or a key lookup sees for a value.
///
/// `true` reads as `"1"`; `false` and `null` read as the empty string.
pub(crate) fn text_of(value: &Value) -> Cow<'_, str> {
    match value {
        Value::String(s) => Cow::Borrowed(s.as_str()),
        Value::Number(n) => Cow::Owned(number_text(n)),
        Value::Bool(true) => Cow::Borrowed("1"),
        Value::Bool(false) | Value::Null => Cow::Borrowed(""),
        Value::Array(_) | Value::Object(_) => Cow::Owned(value.to_string()),
    }
}

/// Text of a JSON number. Whole floats that fit an `i64` drop their
/// fraction, so `10.0` reads as `"10"`.
pub(crate) fn number_text(n: &Number) -> String {
    if let Some(f) = n.as_f64().filter(|_| n.is_f64()) {
        if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
            return (f as i64).to_string();
        }
    }
    n.to_string()
}

/// Numeric reading of a value, if it has one.
pub(crate) fn number_of(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
