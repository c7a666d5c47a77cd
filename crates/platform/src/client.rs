//! Authenticated JSON client for the workspace REST API.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use crate::auth::Authenticator;
use crate::config::WorkspaceConfig;
use crate::error::{api_error, PlatformError};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct WorkspaceClient {
    config: WorkspaceConfig,
    http: reqwest::Client,
    auth: Arc<Authenticator>,
}

impl WorkspaceClient {
    pub fn new(config: WorkspaceConfig) -> Result<Self, PlatformError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("lpt-event/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self::with_http(config, http))
    }

    /// Client built from `DATABRICKS_*` environment variables.
    pub fn from_env() -> Result<Self, PlatformError> {
        Self::new(WorkspaceConfig::from_env()?)
    }

    fn with_http(config: WorkspaceConfig, http: reqwest::Client) -> Self {
        let auth = Arc::new(Authenticator::new(config.auth.clone()));
        Self { config, http, auth }
    }

    /// Client acting as the owner of `token`, sharing this client's connection pool.
    pub fn for_token(&self, token: &str) -> Self {
        Self::with_http(self.config.with_token(token), self.http.clone())
    }

    pub fn config(&self) -> &WorkspaceConfig {
        &self.config
    }

    pub fn host(&self) -> &Url {
        &self.config.host
    }

    /// Absolute URL for a path given as individually escaped segments.
    pub(crate) fn endpoint(&self, segments: &[&str]) -> Result<Url, PlatformError> {
        let mut url = self.config.host.clone();
        url.path_segments_mut()
            .map_err(|_| PlatformError::InvalidHost(self.config.host.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub(crate) async fn get<T>(&self, segments: &[&str]) -> Result<T, PlatformError>
    where
        T: DeserializeOwned,
    {
        self.send(Method::GET, segments, None::<&()>).await
    }

    pub(crate) async fn send<T, B>(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<&B>,
    ) -> Result<T, PlatformError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = self.endpoint(segments)?;
        let token = self.auth.bearer(&self.http, &self.config.host).await?;

        tracing::debug!(method = %method, url = %url, "workspace API request");

        let mut request = self.http.request(method, url).bearer_auth(token);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(api_error(status.as_u16(), &body));
        }

        let bytes = response.bytes().await?;
        let payload: &[u8] = if bytes.is_empty() { b"{}" } else { &bytes[..] };
        serde_json::from_slice(payload).map_err(|e| PlatformError::Api {
            status: status.as_u16(),
            message: format!("unexpected response body: {e}"),
        })
    }
}

impl std::fmt::Debug for WorkspaceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkspaceClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
