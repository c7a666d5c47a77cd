//! Platform stand-in for exercising the managed Postgres code paths.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use lpt_db::Database;
use lpt_kernel::settings::DatabaseSettings;
use lpt_platform::{DatabaseCredential, DatabaseInstance, PlatformError, User, WorkspaceApi};

/// Answers as service principal `sp-client-id`; clients created through
/// `on_behalf_of` answer as `jane@example.com`.
pub(crate) struct PlatformStub {
    client_id: Option<String>,
    forwarded: Arc<Mutex<Vec<String>>>,
}

impl PlatformStub {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            client_id: Some("sp-client-id".to_string()),
            forwarded: Arc::default(),
        })
    }

    pub(crate) fn forwarded_tokens(&self) -> Vec<String> {
        self.forwarded.lock().unwrap().clone()
    }
}

#[async_trait]
impl WorkspaceApi for PlatformStub {
    async fn get_database_instance(&self, name: &str) -> Result<DatabaseInstance, PlatformError> {
        Ok(DatabaseInstance {
            name: name.to_string(),
            uid: Some("uid-1".to_string()),
            read_write_dns: Some("lpt-lkb-2.database.example.com".to_string()),
            state: Some("AVAILABLE".to_string()),
        })
    }

    async fn generate_database_credential(
        &self,
        _instance_names: &[String],
    ) -> Result<DatabaseCredential, PlatformError> {
        Ok(DatabaseCredential {
            token: "db-token".to_string(),
            expiration_time: None,
        })
    }

    async fn current_user(&self) -> Result<User, PlatformError> {
        Ok(User {
            id: Some("u-42".to_string()),
            user_name: Some("jane@example.com".to_string()),
            display_name: Some("Jane Doe".to_string()),
            active: Some(true),
            ..User::default()
        })
    }

    fn client_id(&self) -> Option<String> {
        self.client_id.clone()
    }

    fn on_behalf_of(&self, token: &str) -> Arc<dyn WorkspaceApi> {
        self.forwarded.lock().unwrap().push(token.to_string());
        Arc::new(Self {
            client_id: None,
            forwarded: self.forwarded.clone(),
        })
    }
}

/// A Postgres-backed database whose pool is never actually connected.
pub(crate) async fn postgres_database(platform: &Arc<PlatformStub>) -> Arc<Database> {
    let settings = DatabaseSettings {
        instance_name: Some("LPT-LKB-2".to_string()),
        ..DatabaseSettings::default()
    };
    let api: Arc<dyn WorkspaceApi> = platform.clone();
    Arc::new(Database::connect(&settings, Some(api)).await.unwrap())
}
