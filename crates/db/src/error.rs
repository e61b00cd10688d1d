/// Errors raised by the PostgreSQL key store.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// A table or column name that cannot be used as an SQL identifier.
    #[error("Invalid identifier: {0:?}")]
    InvalidIdentifier(String),

    #[error("Invalid database configuration: {0}")]
    Config(String),
}
