use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Store error: {0}")]
    Store(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Whether the error means the telemetry store could not serve a request
    pub fn is_store_failure(&self) -> bool {
        matches!(
            self,
            Error::Database(_) | Error::Migration(_) | Error::Store(_)
        )
    }
}
