//! Backend selection and Postgres connection target resolution.

use lpt_kernel::settings::DatabaseSettings;
use lpt_platform::{PlatformError, WorkspaceApi};
use sqlx::postgres::{PgConnectOptions, PgSslMode};

use crate::DbError;

/// Instance names that select the in-memory development backend.
pub const MEMORY_INSTANCE_NAMES: &[&str] = &["sqlite-memory", "memory"];

pub const MEMORY_ENGINE_URL: &str = "memory://local";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendKind {
    Memory,
    Postgres { instance_name: String },
}

impl BackendKind {
    pub fn from_settings(settings: &DatabaseSettings) -> Result<Self, DbError> {
        let name = settings
            .instance_name()
            .map_err(|e| DbError::Config(e.to_string()))?;

        if MEMORY_INSTANCE_NAMES
            .iter()
            .any(|memory| name.eq_ignore_ascii_case(memory))
        {
            Ok(BackendKind::Memory)
        } else {
            Ok(BackendKind::Postgres {
                instance_name: name.to_string(),
            })
        }
    }
}

/// Where and as whom to connect. The password is never part of the target;
/// it is injected from a generated credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionTarget {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
}

impl ConnectionTarget {
    /// Display form of the connection string, password omitted.
    pub fn url(&self) -> String {
        format!(
            "postgresql://{}:@{}:{}/{}",
            self.username, self.host, self.port, self.database
        )
    }

    pub fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .database(&self.database)
            .username(&self.username)
            .ssl_mode(PgSslMode::Require)
            .application_name("lpt-event")
    }
}

/// Look up the instance and the identity to connect as.
///
/// The username is the service principal's client id when the client has
/// one, otherwise the user name of whoever the client authenticates as.
pub async fn resolve_target(
    api: &dyn WorkspaceApi,
    instance_name: &str,
    settings: &DatabaseSettings,
) -> Result<ConnectionTarget, DbError> {
    let instance = api
        .get_database_instance(instance_name)
        .await
        .map_err(|err| instance_error(instance_name, err))?;

    let host = instance.read_write_dns.ok_or_else(|| {
        DbError::Connection(format!(
            "instance {} has no read-write DNS name (state: {})",
            instance_name,
            instance.state.as_deref().unwrap_or("unknown")
        ))
    })?;

    let username = match api.client_id() {
        Some(client_id) => client_id,
        None => api.current_user().await?.user_name.ok_or_else(|| {
            DbError::Config("platform did not report a user name for the caller".to_string())
        })?,
    };

    Ok(ConnectionTarget {
        host,
        port: settings.port,
        database: settings.database_name.clone(),
        username,
    })
}

pub(crate) fn instance_error(instance_name: &str, err: PlatformError) -> DbError {
    if err.is_not_found() {
        DbError::InstanceNotFound(instance_name.to_string())
    } else {
        DbError::Platform(err)
    }
}
