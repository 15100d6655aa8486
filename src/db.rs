//! SQLite pool construction and schema migrations.
//!
//! The pool runs in WAL mode so plain reads never wait on the booking
//! transactions. Writers queue on the database write lock for up to
//! `busy_timeout_secs`; that lock is what serializes reservations.

use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;

use crate::config::DatabaseConfig;
use crate::error::Result;

/// Opens the pool described by `config`, creating the database file if needed.
pub async fn connect(config: &DatabaseConfig) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(&config.url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(config.busy_timeout_secs));

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .connect_with(options)
        .await?;

    tracing::debug!("Connected to {}", config.url);
    Ok(pool)
}

pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    tracing::info!("Database migrations applied");
    Ok(())
}

/// `connect` followed by `run_migrations`.
pub async fn init(config: &DatabaseConfig) -> Result<SqlitePool> {
    let pool = connect(config).await?;
    run_migrations(&pool).await?;
    Ok(pool)
}
