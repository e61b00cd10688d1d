//! Nested document to `path -> leaf` flattening.

use serde_json::Value;

use crate::types::{FlatFields, PathDelimiters};

/// Flatten `document` into field paths built with `delimiters`.
///
/// Top-level keys are used as-is; each deeper key is appended as
/// `left + key + right`. Arrays are walked with their index as the key, and
/// empty containers contribute no fields. A scalar document has no keys and
/// flattens to nothing.
///
/// If two leaves produce the same path the later value wins, keeping the
/// position of the first.
pub fn flatten(document: &Value, delimiters: &PathDelimiters) -> FlatFields {
    let mut fields = FlatFields::new();
    collect(document, delimiters, "", &mut fields);
    fields
}

fn collect(node: &Value, delimiters: &PathDelimiters, path: &str, out: &mut FlatFields) {
    let mut visit = |key: &str, item: &Value| {
        let item_path = if path.is_empty() {
            key.to_string()
        } else {
            format!("{path}{}{key}{}", delimiters.left, delimiters.right)
        };
        match item {
            Value::Object(_) | Value::Array(_) => collect(item, delimiters, &item_path, out),
            leaf => {
                out.insert(item_path, leaf.clone());
            }
        }
    };

    match node {
        Value::Object(map) => {
            for (key, item) in map {
                visit(key, item);
            }
        }
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                visit(&index.to_string(), item);
            }
        }
        _ => {}
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
