//! Identity of the caller as reported by the workspace SCIM API.

use serde::{Deserialize, Serialize};

use crate::{PlatformError, WorkspaceClient};

/// Multi-valued SCIM attribute (email, role, group, entitlement).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ComplexValue {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary: Option<bool>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

/// Workspace user. Accepts the SCIM camelCase wire names and serializes with
/// snake_case field names.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, alias = "userName")]
    pub user_name: Option<String>,
    #[serde(default, alias = "displayName")]
    pub display_name: Option<String>,
    #[serde(default)]
    pub active: Option<bool>,
    #[serde(default)]
    pub emails: Vec<ComplexValue>,
    #[serde(default)]
    pub roles: Vec<ComplexValue>,
    #[serde(default)]
    pub groups: Vec<ComplexValue>,
    #[serde(default)]
    pub entitlements: Vec<ComplexValue>,
}

impl WorkspaceClient {
    /// The user (or service principal) the client authenticates as.
    pub async fn current_user(&self) -> Result<User, PlatformError> {
        self.get(&["api", "2.0", "preview", "scim", "v2", "Me"]).await
    }
}
