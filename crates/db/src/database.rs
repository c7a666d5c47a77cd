//! The application's handle on its database, whichever backend is configured.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use lpt_kernel::settings::DatabaseSettings;
use lpt_platform::WorkspaceApi;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tokio::task::JoinHandle;

use crate::backend::{self, BackendKind, ConnectionTarget, MEMORY_ENGINE_URL};
use crate::credentials::{self, CredentialCache};
use crate::DbError;

pub struct Database {
    settings: DatabaseSettings,
    backend: Backend,
}

enum Backend {
    Memory,
    Postgres(PostgresBackend),
}

struct PostgresBackend {
    instance_name: String,
    api: Arc<dyn WorkspaceApi>,
    target: ConnectionTarget,
    pool: PgPool,
    credentials: Arc<CredentialCache>,
    rotation: Mutex<Option<JoinHandle<()>>>,
}

impl Database {
    /// In-memory backend for local development and tests.
    pub fn memory(settings: DatabaseSettings) -> Self {
        Self {
            settings,
            backend: Backend::Memory,
        }
    }

    /// Select the backend from `settings` and, for Postgres, build the
    /// credential-rotating connection pool. `api` is required for Postgres.
    ///
    /// The pool connects lazily; call [`Database::validate`] to fail fast.
    pub async fn connect(
        settings: &DatabaseSettings,
        api: Option<Arc<dyn WorkspaceApi>>,
    ) -> Result<Self, DbError> {
        let instance_name = match BackendKind::from_settings(settings)? {
            BackendKind::Memory => {
                tracing::info!("using in-memory database backend");
                return Ok(Self::memory(settings.clone()));
            }
            BackendKind::Postgres { instance_name } => instance_name,
        };

        let api = api.ok_or_else(|| {
            DbError::Config("the Postgres backend requires a workspace platform client".to_string())
        })?;

        let target = backend::resolve_target(api.as_ref(), &instance_name, settings).await?;
        tracing::info!(
            instance = %instance_name,
            url = %target.url(),
            pool_size = settings.pool_size,
            "configuring Postgres connection pool"
        );

        let credentials = Arc::new(CredentialCache::new(
            api.clone(),
            vec![instance_name.clone()],
            Duration::from_secs(settings.credential_ttl_secs),
            Duration::from_secs(settings.credential_refresh_margin_secs),
        ));
        let token = credentials.current().await?;

        let base = target.connect_options();
        let pool = PgPoolOptions::new()
            .max_connections(settings.pool_size)
            .max_lifetime(Duration::from_secs(settings.max_lifetime_secs))
            .acquire_timeout(Duration::from_secs(settings.connect_timeout_secs))
            .connect_lazy_with(base.clone().password(&token));

        let rotation = credentials::spawn_rotation(credentials.clone(), pool.clone(), base);

        Ok(Self {
            settings: settings.clone(),
            backend: Backend::Postgres(PostgresBackend {
                instance_name,
                api,
                target,
                pool,
                credentials,
                rotation: Mutex::new(Some(rotation)),
            }),
        })
    }

    pub fn is_memory(&self) -> bool {
        matches!(self.backend, Backend::Memory)
    }

    pub fn settings(&self) -> &DatabaseSettings {
        &self.settings
    }

    pub fn instance_name(&self) -> Option<&str> {
        self.settings.instance_name.as_deref()
    }

    /// Connection string for display; never carries a password.
    pub fn engine_url(&self) -> String {
        match &self.backend {
            Backend::Memory => MEMORY_ENGINE_URL.to_string(),
            Backend::Postgres(pg) => pg.target.url(),
        }
    }

    /// The shared pool, authenticated as the service identity.
    pub fn pool(&self) -> Option<&PgPool> {
        match &self.backend {
            Backend::Memory => None,
            Backend::Postgres(pg) => Some(&pg.pool),
        }
    }

    pub fn platform(&self) -> Option<&Arc<dyn WorkspaceApi>> {
        match &self.backend {
            Backend::Memory => None,
            Backend::Postgres(pg) => Some(&pg.api),
        }
    }

    /// Check the instance exists and a connection can be established.
    pub async fn validate(&self) -> Result<(), DbError> {
        let pg = match &self.backend {
            Backend::Memory => {
                tracing::info!("using in-memory database for local development");
                return Ok(());
            }
            Backend::Postgres(pg) => pg,
        };

        tracing::info!(instance = %pg.instance_name, "validating database connection");

        pg.api
            .get_database_instance(&pg.instance_name)
            .await
            .map_err(|err| backend::instance_error(&pg.instance_name, err))?;

        // A credential may have lapsed while the process sat idle.
        let token = pg.credentials.current().await?;
        pg.pool
            .set_connect_options(pg.target.connect_options().password(&token));

        sqlx::query("SELECT 1")
            .execute(&pg.pool)
            .await
            .map_err(|err| DbError::Connection(err.to_string()))?;

        tracing::info!(
            instance = %pg.instance_name,
            "database connection validated successfully"
        );
        Ok(())
    }

    /// A single-connection pool authenticated as the owner of `token`.
    ///
    /// Returns `None` on the in-memory backend. Callers should close the pool
    /// when the request is done.
    pub async fn user_pool(&self, token: &str) -> Result<Option<PgPool>, DbError> {
        let pg = match &self.backend {
            Backend::Memory => return Ok(None),
            Backend::Postgres(pg) => pg,
        };

        tracing::debug!("creating on-behalf-of database pool");

        let user_api = pg.api.on_behalf_of(token);
        let target =
            backend::resolve_target(user_api.as_ref(), &pg.instance_name, &self.settings).await?;
        let credential = user_api
            .generate_database_credential(std::slice::from_ref(&pg.instance_name))
            .await?;

        let pool = PgPoolOptions::new()
            .max_connections(1)
            .min_connections(0)
            .test_before_acquire(true)
            .acquire_timeout(Duration::from_secs(self.settings.connect_timeout_secs))
            .connect_lazy_with(target.connect_options().password(&credential.token));

        Ok(Some(pool))
    }

    /// Stop credential rotation and close every pooled connection.
    pub async fn close(&self) {
        if let Backend::Postgres(pg) = &self.backend {
            let rotation = pg
                .rotation
                .lock()
                .map(|mut guard| guard.take())
                .unwrap_or(None);
            if let Some(handle) = rotation {
                handle.abort();
            }
            pg.pool.close().await;
            tracing::info!(instance = %pg.instance_name, "database pool closed");
        }
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("engine_url", &self.engine_url())
            .finish()
    }
}
