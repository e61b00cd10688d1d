//! Referential existence lookups used by the key checker.

use std::collections::{HashMap, HashSet};
use std::convert::Infallible;
use std::future::Future;

/// Backing store that can tell which candidate values exist.
pub trait KeyStore: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Return the subset of `candidates` present in `column` of `table`.
    fn existing_values(
        &self,
        table: &str,
        column: &str,
        candidates: &[String],
    ) -> impl Future<Output = Result<HashSet<String>, Self::Error>> + Send;
}

impl<T: KeyStore> KeyStore for &T {
    type Error = T::Error;

    fn existing_values(
        &self,
        table: &str,
        column: &str,
        candidates: &[String],
    ) -> impl Future<Output = Result<HashSet<String>, Self::Error>> + Send {
        (**self).existing_values(table, column, candidates)
    }
}

/// In-memory [`KeyStore`] keyed by `(table, column)`.
#[derive(Debug, Clone, Default)]
pub struct MemoryKeyStore {
    tables: HashMap<(String, String), HashSet<String>>,
}

impl MemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `values` to `table.column`.
    pub fn insert<I, V>(&mut self, table: &str, column: &str, values: I)
    where
        I: IntoIterator<Item = V>,
        V: ToString,
    {
        self.tables
            .entry((table.to_string(), column.to_string()))
            .or_default()
            .extend(values.into_iter().map(|v| v.to_string()));
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with<I, V>(mut self, table: &str, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: ToString,
    {
        self.insert(table, column, values);
        self
    }
}

impl KeyStore for MemoryKeyStore {
    type Error = Infallible;

    async fn existing_values(
        &self,
        table: &str,
        column: &str,
        candidates: &[String],
    ) -> Result<HashSet<String>, Self::Error> {
        let Some(values) = self.tables.get(&(table.to_string(), column.to_string())) else {
            return Ok(HashSet::new());
        };
        Ok(candidates
            .iter()
            .filter(|candidate| values.contains(*candidate))
            .cloned()
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
