//! Database connection pool and migrations.
//!
//! The pool is the only shared in-process state: every repository call checks
//! out a connection for one statement and returns it immediately.

pub mod jobs;

use crate::config::DatabaseConfig;
use crate::error::Result;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

/// Database handle. Owns the connection pool shared by workers and clients.
pub struct Db {
    pool: PgPool,
}

impl Db {
    /// Connect to Postgres and create a bounded connection pool.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .min_connections(config.min_connections)
            .max_connections(config.max_connections)
            .connect_with(config.connect_options()?)
            .await?;
        info!(
            min = config.min_connections,
            max = config.max_connections,
            "database pool opened"
        );
        Ok(Self { pool })
    }

    /// Run all pending migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Close the pool, waiting for checked-out connections to come back.
    pub async fn close(&self) {
        self.pool.close().await;
        info!("database pool closed");
    }
}
