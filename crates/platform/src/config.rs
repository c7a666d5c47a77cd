//! Workspace connection settings read from the standard `DATABRICKS_*` variables.

use url::Url;

use crate::PlatformError;

const HOST_VAR: &str = "DATABRICKS_HOST";
const TOKEN_VAR: &str = "DATABRICKS_TOKEN";
const CLIENT_ID_VAR: &str = "DATABRICKS_CLIENT_ID";
const CLIENT_SECRET_VAR: &str = "DATABRICKS_CLIENT_SECRET";

/// How requests to the workspace are authenticated.
#[derive(Clone)]
pub enum AuthConfig {
    /// Personal access token or a forwarded user token.
    Pat { token: String },
    /// OAuth machine-to-machine flow for a service principal.
    OAuth {
        client_id: String,
        client_secret: String,
    },
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthConfig::Pat { .. } => f.write_str("Pat { token: *** }"),
            AuthConfig::OAuth { client_id, .. } => f
                .debug_struct("OAuth")
                .field("client_id", client_id)
                .field("client_secret", &"***")
                .finish(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct WorkspaceConfig {
    pub host: Url,
    pub auth: AuthConfig,
}

impl WorkspaceConfig {
    pub fn from_env() -> Result<Self, PlatformError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve the configuration through an arbitrary variable lookup.
    ///
    /// A token takes precedence over client credentials.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, PlatformError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let present = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let host = present(HOST_VAR).ok_or(PlatformError::MissingHost)?;
        let host = normalize_host(&host)?;

        let auth = if let Some(token) = present(TOKEN_VAR) {
            AuthConfig::Pat { token }
        } else if let (Some(client_id), Some(client_secret)) =
            (present(CLIENT_ID_VAR), present(CLIENT_SECRET_VAR))
        {
            AuthConfig::OAuth {
                client_id,
                client_secret,
            }
        } else {
            return Err(PlatformError::MissingCredentials);
        };

        Ok(Self { host, auth })
    }

    /// Configuration acting with `token` against the same workspace.
    pub fn with_token(&self, token: impl Into<String>) -> Self {
        Self {
            host: self.host.clone(),
            auth: AuthConfig::Pat {
                token: token.into(),
            },
        }
    }

    /// The service principal's client id, when authenticating as one.
    pub fn client_id(&self) -> Option<&str> {
        match &self.auth {
            AuthConfig::OAuth { client_id, .. } => Some(client_id),
            AuthConfig::Pat { .. } => None,
        }
    }
}

/// Parse a workspace host, assuming `https://` when no scheme is given.
pub fn normalize_host(raw: &str) -> Result<Url, PlatformError> {
    let trimmed = raw.trim().trim_end_matches('/');
    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };

    let url = Url::parse(&with_scheme).map_err(|_| PlatformError::InvalidHost(raw.to_string()))?;
    if url.host_str().is_none() || url.cannot_be_a_base() {
        return Err(PlatformError::InvalidHost(raw.to_string()));
    }
    Ok(url)
}
