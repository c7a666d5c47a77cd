//! Catalog permission changes.

use reqwest::Method;
use serde::{Deserialize, Serialize};

use crate::{PlatformError, WorkspaceClient};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Privilege {
    AllPrivileges,
    Create,
    CreateTable,
    Modify,
    Select,
    Usage,
    UseCatalog,
    UseSchema,
}

impl std::fmt::Display for Privilege {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Privilege::AllPrivileges => "ALL_PRIVILEGES",
            Privilege::Create => "CREATE",
            Privilege::CreateTable => "CREATE_TABLE",
            Privilege::Modify => "MODIFY",
            Privilege::Select => "SELECT",
            Privilege::Usage => "USAGE",
            Privilege::UseCatalog => "USE_CATALOG",
            Privilege::UseSchema => "USE_SCHEMA",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PermissionsChange {
    pub principal: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub add: Vec<Privilege>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub remove: Vec<Privilege>,
}

impl PermissionsChange {
    pub fn grant(principal: impl Into<String>, privileges: &[Privilege]) -> Self {
        Self {
            principal: principal.into(),
            add: privileges.to_vec(),
            remove: Vec::new(),
        }
    }
}

#[derive(Debug, Serialize)]
struct UpdatePermissions<'a> {
    changes: &'a [PermissionsChange],
}

impl WorkspaceClient {
    /// Apply `changes` to the securable `securable_type`/`full_name`.
    pub async fn update_grants(
        &self,
        securable_type: &str,
        full_name: &str,
        changes: &[PermissionsChange],
    ) -> Result<serde_json::Value, PlatformError> {
        self.send(
            Method::PATCH,
            &[
                "api",
                "2.1",
                "unity-catalog",
                "permissions",
                securable_type,
                full_name,
            ],
            Some(&UpdatePermissions { changes }),
        )
        .await
    }
}
