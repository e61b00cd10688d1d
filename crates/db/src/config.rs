use crate::error::DbError;

/// Default pool size.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 20;

/// Database configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbConfig {
    /// PostgreSQL connection string.
    pub database_url: String,
    /// Upper bound on pooled connections (default: `20`).
    pub max_connections: u32,
}

impl DbConfig {
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// | Env Var              | Default    |
    /// |----------------------|------------|
    /// | `DATABASE_URL`       | (required) |
    /// | `DB_MAX_CONNECTIONS` | `20`       |
    pub fn from_env() -> Result<Self, DbError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, DbError> {
        let database_url = lookup("DATABASE_URL")
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| DbError::Config("DATABASE_URL must be set".into()))?;

        let max_connections = match lookup("DB_MAX_CONNECTIONS") {
            Some(raw) => raw.trim().parse::<u32>().ok().filter(|n| *n > 0).ok_or_else(|| {
                DbError::Config(format!(
                    "DB_MAX_CONNECTIONS must be a positive integer, got {raw:?}"
                ))
            })?,
            None => DEFAULT_MAX_CONNECTIONS,
        };

        Ok(Self {
            database_url,
            max_connections,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
