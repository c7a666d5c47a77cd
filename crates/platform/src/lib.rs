//! Client for the workspace platform that hosts the managed Postgres instance.
//!
//! Covers what the service and its admin tooling need: instance lookup,
//! short-lived database credentials, the caller's identity and catalog grants.

use std::sync::Arc;

use async_trait::async_trait;

mod auth;
pub mod client;
pub mod config;
pub mod database;
pub mod error;
pub mod grants;
pub mod iam;

#[cfg(test)]
mod testing;

pub use client::WorkspaceClient;
pub use config::{AuthConfig, WorkspaceConfig};
pub use database::{DatabaseCredential, DatabaseInstance};
pub use error::PlatformError;
pub use grants::{PermissionsChange, Privilege};
pub use iam::{ComplexValue, User};

/// Platform operations the database layer depends on.
#[async_trait]
pub trait WorkspaceApi: Send + Sync {
    async fn get_database_instance(&self, name: &str) -> Result<DatabaseInstance, PlatformError>;

    async fn generate_database_credential(
        &self,
        instance_names: &[String],
    ) -> Result<DatabaseCredential, PlatformError>;

    async fn current_user(&self) -> Result<User, PlatformError>;

    /// Service principal id when authenticating as one.
    fn client_id(&self) -> Option<String>;

    /// A client acting on behalf of the user owning `token`.
    fn on_behalf_of(&self, token: &str) -> Arc<dyn WorkspaceApi>;
}

#[async_trait]
impl WorkspaceApi for WorkspaceClient {
    async fn get_database_instance(&self, name: &str) -> Result<DatabaseInstance, PlatformError> {
        WorkspaceClient::get_database_instance(self, name).await
    }

    async fn generate_database_credential(
        &self,
        instance_names: &[String],
    ) -> Result<DatabaseCredential, PlatformError> {
        WorkspaceClient::generate_database_credential(self, instance_names).await
    }

    async fn current_user(&self) -> Result<User, PlatformError> {
        WorkspaceClient::current_user(self).await
    }

    fn client_id(&self) -> Option<String> {
        self.config().client_id().map(str::to_string)
    }

    fn on_behalf_of(&self, token: &str) -> Arc<dyn WorkspaceApi> {
        Arc::new(self.for_token(token))
    }
}
