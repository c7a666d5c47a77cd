//! Managed database instances and short-lived database credentials.

use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::json;
use time::OffsetDateTime;

use crate::{PlatformError, WorkspaceClient};

/// A managed Postgres instance as reported by the workspace.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DatabaseInstance {
    pub name: String,
    #[serde(default)]
    pub uid: Option<String>,
    /// DNS name accepting read-write connections.
    #[serde(default)]
    pub read_write_dns: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
}

/// Token usable as a Postgres password until `expiration_time`.
#[derive(Clone, Serialize, Deserialize)]
pub struct DatabaseCredential {
    pub token: String,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub expiration_time: Option<OffsetDateTime>,
}

impl std::fmt::Debug for DatabaseCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseCredential")
            .field("token", &"***")
            .field("expiration_time", &self.expiration_time)
            .finish()
    }
}

#[derive(Debug, Serialize)]
struct GenerateCredentialRequest<'a> {
    instance_names: &'a [String],
    request_id: String,
}

impl WorkspaceClient {
    pub async fn get_database_instance(
        &self,
        name: &str,
    ) -> Result<DatabaseInstance, PlatformError> {
        self.get(&["api", "2.0", "database", "instances", name])
            .await
            .map_err(|err| match err {
                PlatformError::NotFound(_) => {
                    PlatformError::NotFound(format!("database instance '{name}'"))
                }
                other => other,
            })
    }

    pub async fn generate_database_credential(
        &self,
        instance_names: &[String],
    ) -> Result<DatabaseCredential, PlatformError> {
        let request = GenerateCredentialRequest {
            instance_names,
            request_id: uuid::Uuid::new_v4().to_string(),
        };

        self.send(
            Method::POST,
            &["api", "2.0", "database", "credentials"],
            Some(&request),
        )
        .await
    }

    /// Allow `principal` to connect to the instance identified by `uid`.
    ///
    /// The instance API has lived under two paths; the older one is tried
    /// when the first answers 404.
    pub async fn grant_instance_access(
        &self,
        uid: &str,
        principal: &str,
    ) -> Result<serde_json::Value, PlatformError> {
        let payload = json!({ "allowed_service_principals": [principal] });

        let primary = self
            .send(
                Method::PATCH,
                &["api", "2.0", "postgres-instances", uid],
                Some(&payload),
            )
            .await;

        match primary {
            Err(err) if err.is_not_found() => {
                tracing::warn!(uid, "instance endpoint not found, trying alternative path");
                self.send(
                    Method::PATCH,
                    &["api", "2.0", "database-instances", uid],
                    Some(&payload),
                )
                .await
            }
            other => other,
        }
    }
}
