//! PostgreSQL-backed key store for `fieldcheck-core`.

use sqlx::postgres::PgPoolOptions;

pub mod config;
pub mod error;
pub mod key_store;

pub use config::DbConfig;
pub use error::DbError;
pub use key_store::PgKeyStore;

pub type DbPool = sqlx::PgPool;

/// Create a connection pool from the database configuration.
pub async fn create_pool(config: &DbConfig) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await
}

/// Run a trivial query to confirm the pool can reach the database.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}
