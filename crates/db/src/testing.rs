//! In-process stand-in for the workspace platform.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use lpt_platform::{DatabaseCredential, DatabaseInstance, PlatformError, User, WorkspaceApi};

pub(crate) struct FakeWorkspace {
    client_id: Option<String>,
    instance_exists: bool,
    latency: Duration,
    fail_credentials: AtomicBool,
    credential_calls: AtomicUsize,
    user_calls: AtomicUsize,
    on_behalf_of: Mutex<Vec<String>>,
}

impl FakeWorkspace {
    pub(crate) fn new() -> Self {
        Self {
            client_id: None,
            instance_exists: true,
            latency: Duration::ZERO,
            fail_credentials: AtomicBool::new(false),
            credential_calls: AtomicUsize::new(0),
            user_calls: AtomicUsize::new(0),
            on_behalf_of: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn with_client_id(mut self, client_id: &str) -> Self {
        self.client_id = Some(client_id.to_string());
        self
    }

    pub(crate) fn without_instance(mut self) -> Self {
        self.instance_exists = false;
        self
    }

    pub(crate) fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub(crate) fn fail_credentials(&self, fail: bool) {
        self.fail_credentials.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn credential_calls(&self) -> usize {
        self.credential_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn user_lookups(&self) -> usize {
        self.user_calls.load(Ordering::SeqCst)
    }

    /// Tokens passed to `on_behalf_of`, in call order.
    pub(crate) fn on_behalf_of_tokens(&self) -> Vec<String> {
        self.on_behalf_of.lock().unwrap().clone()
    }
}

#[async_trait]
impl WorkspaceApi for FakeWorkspace {
    async fn get_database_instance(&self, name: &str) -> Result<DatabaseInstance, PlatformError> {
        if !self.instance_exists {
            return Err(PlatformError::NotFound(format!("database instance '{name}'")));
        }
        Ok(DatabaseInstance {
            name: name.to_string(),
            uid: Some("uid-1".to_string()),
            read_write_dns: Some(format!("{}.database.example.com", name.to_lowercase())),
            state: Some("AVAILABLE".to_string()),
        })
    }

    async fn generate_database_credential(
        &self,
        _instance_names: &[String],
    ) -> Result<DatabaseCredential, PlatformError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if self.fail_credentials.load(Ordering::SeqCst) {
            return Err(PlatformError::Api {
                status: 503,
                message: "temporarily unavailable".to_string(),
            });
        }
        let n = self.credential_calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(DatabaseCredential {
            token: format!("token-{n}"),
            expiration_time: None,
        })
    }

    async fn current_user(&self) -> Result<User, PlatformError> {
        self.user_calls.fetch_add(1, Ordering::SeqCst);
        Ok(User {
            user_name: Some("jane@example.com".to_string()),
            ..User::default()
        })
    }

    fn client_id(&self) -> Option<String> {
        self.client_id.clone()
    }

    fn on_behalf_of(&self, token: &str) -> Arc<dyn WorkspaceApi> {
        self.on_behalf_of.lock().unwrap().push(token.to_string());
        Arc::new(FakeWorkspace::new())
    }
}
