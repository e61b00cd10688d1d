use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Flattened document: field path to leaf value, in traversal order.
pub type FlatFields = IndexMap<String, serde_json::Value>;

/// Strings wrapped around every nested key segment of a field path.
///
/// With the default `[` / `]`, `{"goods_prices": {"phone": 1}}` flattens to
/// `goods_prices[phone]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathDelimiters {
    pub left: String,
    pub right: String,
}

impl PathDelimiters {
    pub fn new(left: impl Into<String>, right: impl Into<String>) -> Self {
        Self {
            left: left.into(),
            right: right.into(),
        }
    }
}

impl Default for PathDelimiters {
    fn default() -> Self {
        Self::new("[", "]")
    }
}
