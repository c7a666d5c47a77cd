//! Typed error type for the platform crate.

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("platform host is not configured; set DATABRICKS_HOST")]
    MissingHost,

    #[error(
        "no platform credentials configured; set DATABRICKS_TOKEN or \
         DATABRICKS_CLIENT_ID and DATABRICKS_CLIENT_SECRET"
    )]
    MissingCredentials,

    #[error("invalid platform host '{0}'")]
    InvalidHost(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("platform API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

impl PlatformError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, PlatformError::NotFound(_))
            || matches!(self, PlatformError::Api { status: 404, .. })
    }
}

/// Error envelope returned by the platform's REST API.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error_code: Option<String>,
    message: Option<String>,
}

/// Build an error from a non-success status and the raw response body.
pub(crate) fn api_error(status: u16, body: &str) -> PlatformError {
    let message = match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(ApiErrorBody {
            error_code: Some(code),
            message: Some(message),
        }) => format!("{code}: {message}"),
        Ok(ApiErrorBody {
            message: Some(message),
            ..
        }) => message,
        Ok(ApiErrorBody {
            error_code: Some(code),
            ..
        }) => code,
        _ if body.trim().is_empty() => "empty response body".to_string(),
        _ => body.trim().to_string(),
    };

    if status == 404 {
        PlatformError::NotFound(message)
    } else {
        PlatformError::Api { status, message }
    }
}
