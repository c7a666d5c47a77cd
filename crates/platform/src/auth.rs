//! Bearer token acquisition for workspace requests.

use std::time::Duration;

use serde::Deserialize;
use tokio::sync::Mutex;
use tokio::time::Instant;
use url::Url;

use crate::config::AuthConfig;
use crate::error::{api_error, PlatformError};

/// Tokens are renewed this long before the platform says they expire.
const EXPIRY_SLACK: Duration = Duration::from_secs(60);
const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(3600);

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

struct AccessToken {
    value: String,
    renew_at: Instant,
}

pub(crate) struct Authenticator {
    config: AuthConfig,
    cached: Mutex<Option<AccessToken>>,
}

impl Authenticator {
    pub(crate) fn new(config: AuthConfig) -> Self {
        Self {
            config,
            cached: Mutex::new(None),
        }
    }

    /// Bearer token for the next request.
    pub(crate) async fn bearer(
        &self,
        http: &reqwest::Client,
        host: &Url,
    ) -> Result<String, PlatformError> {
        let (client_id, client_secret) = match &self.config {
            AuthConfig::Pat { token } => return Ok(token.clone()),
            AuthConfig::OAuth {
                client_id,
                client_secret,
            } => (client_id, client_secret),
        };

        // Held across the exchange so concurrent callers share one token request.
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.renew_at {
                return Ok(token.value.clone());
            }
        }

        let endpoint = host
            .join("oidc/v1/token")
            .map_err(|_| PlatformError::InvalidHost(host.to_string()))?;

        tracing::debug!(client_id = %client_id, "requesting workspace OAuth token");

        let response = http
            .post(endpoint)
            .basic_auth(client_id, Some(client_secret))
            .form(&[("grant_type", "client_credentials"), ("scope", "all-apis")])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(api_error(status.as_u16(), &body));
        }

        let token: TokenResponse = response.json().await?;
        let lifetime = token
            .expires_in
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TOKEN_LIFETIME);

        *cached = Some(AccessToken {
            value: token.access_token.clone(),
            renew_at: Instant::now() + lifetime.saturating_sub(EXPIRY_SLACK),
        });

        Ok(token.access_token)
    }
}
