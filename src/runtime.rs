//! Application bootstrap shared by the server binary and the admin CLI.

use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use lpt_db::{BackendKind, Database};
use lpt_kernel::{settings::Settings, InitCtx, ModuleRegistry};
use lpt_platform::{WorkspaceApi, WorkspaceClient};

use crate::modules;

pub struct Runtime {
    settings: Settings,
    database: Arc<Database>,
    registry: ModuleRegistry,
}

impl Runtime {
    /// Connect the configured database backend and register every module.
    ///
    /// A platform client is only built for the Postgres backend, so the
    /// in-memory backend needs no workspace credentials.
    pub async fn open(settings: Settings) -> anyhow::Result<Self> {
        let platform: Option<Arc<dyn WorkspaceApi>> = match BackendKind::from_settings(&settings.db)? {
            BackendKind::Memory => None,
            BackendKind::Postgres { .. } => {
                let client = WorkspaceClient::from_env()
                    .context("failed to configure the workspace client")?;
                Some(Arc::new(client))
            }
        };

        let database = Database::connect(&settings.db, platform)
            .await
            .context("failed to set up the database")?;

        Ok(Self::with_database(settings, Arc::new(database)))
    }

    pub fn with_database(settings: Settings, database: Arc<Database>) -> Self {
        let mut registry = ModuleRegistry::new();
        modules::register_all(&mut registry, database.clone());

        tracing::info!(
            core = registry.core_module_count(),
            custom = registry.custom_module_count(),
            "modules registered"
        );

        Self {
            settings,
            database,
            registry,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn database(&self) -> &Arc<Database> {
        &self.database
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    /// Validate the database, apply migrations, then start modules (which
    /// seeds demo data).
    pub async fn prepare(&self) -> anyhow::Result<()> {
        let ctx = InitCtx {
            settings: &self.settings,
        };

        self.registry.init_core_modules(&ctx).await?;
        self.registry.init_custom_modules(&ctx).await?;

        tracing::info!("initializing database models");
        let migrations = self.registry.collect_migrations();
        lpt_db::migrate::run(&self.database, &migrations)
            .await
            .context("failed to apply migrations")?;

        self.registry.start_core_modules(&ctx).await?;
        self.registry.start_custom_modules(&ctx).await?;
        tracing::info!("database models initialized successfully");
        Ok(())
    }

    pub fn router(&self) -> Router {
        lpt_http::build_router(&self.registry, &self.settings)
    }

    /// Serve HTTP until a shutdown signal, then stop every module.
    pub async fn serve(&self) -> anyhow::Result<()> {
        let served = lpt_http::start_server(self.router(), &self.settings).await;
        self.shutdown().await?;
        served
    }

    pub async fn shutdown(&self) -> anyhow::Result<()> {
        self.registry.stop_custom_modules().await?;
        self.registry.stop_core_modules().await?;
        Ok(())
    }
}
