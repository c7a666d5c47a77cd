//! Typed error type for the db crate.

use lpt_platform::PlatformError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("sqlx error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("row not found")]
    NotFound,

    #[error("database instance {0} does not exist")]
    InstanceNotFound(String),

    #[error("failed to connect to the database: {0}")]
    Connection(String),

    #[error("database configuration error: {0}")]
    Config(String),

    #[error("{0} requires the Postgres backend")]
    Unsupported(&'static str),

    #[error("migration {module}/{id} failed: {source}")]
    Migration {
        module: String,
        id: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("platform error: {0}")]
    Platform(#[from] PlatformError),
}
