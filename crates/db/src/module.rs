//! Registers the database with the module lifecycle.

use std::sync::Arc;

use async_trait::async_trait;
use lpt_kernel::{InitCtx, Module};

use crate::Database;

/// Core module that validates the connection at init and closes the pool at
/// stop. It contributes no routes.
pub struct DatabaseModule {
    database: Arc<Database>,
}

impl DatabaseModule {
    pub fn new(database: Arc<Database>) -> Self {
        Self { database }
    }
}

#[async_trait]
impl Module for DatabaseModule {
    fn name(&self) -> &'static str {
        "db"
    }

    async fn init(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        self.database.validate().await?;
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        self.database.close().await;
        Ok(())
    }
}
