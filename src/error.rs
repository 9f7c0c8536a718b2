//! Error types for jobq.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("job not found: {0}")]
    NotFound(String),

    #[error("invalid payload: {0}")]
    Validation(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("unknown job status: {0}")]
    UnknownStatus(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// True for lookups that found nothing, as opposed to store failures.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
