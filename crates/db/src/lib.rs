//! Database access for lpt-event: backend selection, the managed Postgres
//! pool with rotating credentials, migrations and schema inspection.

pub mod backend;
pub mod credentials;
pub mod database;
pub mod error;
pub mod inspect;
pub mod migrate;
pub mod module;

#[cfg(test)]
mod testing;

pub use backend::{BackendKind, ConnectionTarget};
pub use credentials::CredentialCache;
pub use database::Database;
pub use error::DbError;
pub use module::DatabaseModule;
