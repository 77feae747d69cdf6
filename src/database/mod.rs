//! # Task Record Storage
//!
//! Implementations of [`crate::state_machine::TaskRecordStore`]:
//!
//! - [`InMemoryTaskStore`] - process-local, used by tests and database-less deployments
//! - [`PgTaskStore`] - PostgreSQL backed (feature `postgres`)
//!
//! Schema migrations live in `migrations/` and are embedded with `sqlx::migrate!`.

pub mod in_memory;
#[cfg(feature = "postgres")]
pub mod postgres;

pub use in_memory::InMemoryTaskStore;
#[cfg(feature = "postgres")]
pub use postgres::PgTaskStore;

#[cfg(feature = "postgres")]
use crate::config::DatabaseConfig;
#[cfg(feature = "postgres")]
use crate::state_machine::{PersistenceError, PersistenceResult};

/// Open a connection pool for the configured database
#[cfg(feature = "postgres")]
pub async fn connect(config: &DatabaseConfig) -> PersistenceResult<sqlx::PgPool> {
    let url = config
        .url
        .as_deref()
        .ok_or_else(|| PersistenceError::validation("database.url", "no database url configured"))?;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(url)
        .await?;
    tracing::info!(max_connections = config.max_connections, "🗄️ Database pool connected");
    Ok(pool)
}

/// Apply the embedded schema migrations
#[cfg(feature = "postgres")]
pub async fn run_migrations(pool: &sqlx::PgPool) -> PersistenceResult<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}
