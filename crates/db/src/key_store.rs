//! [`KeyStore`] over a PostgreSQL pool.

use std::collections::HashSet;
use std::sync::LazyLock;

use fieldcheck_core::KeyStore;
use regex::Regex;

use crate::error::DbError;
use crate::DbPool;

/// Plain unquoted SQL identifier.
static IDENTIFIER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid regex"));

/// Answers existence queries with
/// `SELECT DISTINCT column::text FROM table WHERE column::text = ANY($1)`.
///
/// Table and column names come from configuration, not user input, but are
/// still validated and quoted. They are folded to lower case first, so
/// `Parties` names the same table as it would unquoted. A table may be
/// schema-qualified (`reference.parties`).
///
/// Values are compared as text, so `"1"` matches an integer `1`. Casting the
/// column keeps the query independent of its type but prevents a plain
/// B-tree index on the column from being used; large reference tables want
/// an expression index on `(column::text)`.
#[derive(Debug, Clone)]
pub struct PgKeyStore {
    pool: DbPool,
}

impl PgKeyStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

/// Validate, lower-case and double-quote a possibly schema-qualified
/// identifier.
pub(crate) fn quote_identifier(name: &str) -> Result<String, DbError> {
    let parts: Vec<&str> = name.split('.').collect();
    if parts.len() > 2 || !parts.iter().all(|part| IDENTIFIER_RE.is_match(part)) {
        return Err(DbError::InvalidIdentifier(name.to_string()));
    }
    Ok(parts
        .iter()
        .map(|part| format!("\"{}\"", part.to_ascii_lowercase()))
        .collect::<Vec<_>>()
        .join("."))
}

/// Build the existence query for `table.column`.
pub(crate) fn existence_query(table: &str, column: &str) -> Result<String, DbError> {
    if column.contains('.') {
        return Err(DbError::InvalidIdentifier(column.to_string()));
    }
    let table = quote_identifier(table)?;
    let column = quote_identifier(column)?;
    Ok(format!(
        "SELECT DISTINCT {column}::text FROM {table} WHERE {column}::text = ANY($1)"
    ))
}

impl KeyStore for PgKeyStore {
    type Error = DbError;

    async fn existing_values(
        &self,
        table: &str,
        column: &str,
        candidates: &[String],
    ) -> Result<HashSet<String>, DbError> {
        let sql = existence_query(table, column)?;
        let rows: Vec<String> = sqlx::query_scalar(&sql)
            .bind(candidates.to_vec())
            .fetch_all(&self.pool)
            .await?;
        tracing::debug!(
            table,
            column,
            candidates = candidates.len(),
            found = rows.len(),
            "Queried existing key values"
        );
        Ok(rows.into_iter().collect())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
