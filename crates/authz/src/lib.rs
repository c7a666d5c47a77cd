//! Identity forwarded by the hosting platform's proxy.
//!
//! When the app runs behind the platform, the proxy adds the signed-in user's
//! access token to every request. Handlers use it to act on the user's behalf.

use std::convert::Infallible;

use axum::{extract::FromRequestParts, http::request::Parts};

/// Header carrying the caller's platform access token.
pub const FORWARDED_ACCESS_TOKEN: &str = "x-forwarded-access-token";

/// The caller's forwarded access token, if any. Never rejects.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ForwardedToken(pub Option<String>);

impl ForwardedToken {
    pub fn as_deref(&self) -> Option<&str> {
        self.0.as_deref()
    }

    pub fn from_parts(parts: &Parts) -> Self {
        let token = parts
            .headers
            .get(FORWARDED_ACCESS_TOKEN)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string);

        if token.is_some() {
            tracing::debug!("request carries a forwarded access token");
        }
        Self(token)
    }
}

impl<S> FromRequestParts<S> for ForwardedToken
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_parts(parts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(header: Option<&str>) -> ForwardedToken {
        let mut builder = Request::builder().uri("/api/events");
        if let Some(value) = header {
            builder = builder.header(FORWARDED_ACCESS_TOKEN, value);
        }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        ForwardedToken::from_request_parts(&mut parts, &()).await.unwrap()
    }

    #[tokio::test]
    async fn header_value_is_extracted() {
        assert_eq!(
            extract(Some("user-token")).await,
            ForwardedToken(Some("user-token".to_string()))
        );
    }

    #[tokio::test]
    async fn missing_or_blank_header_is_absent() {
        assert_eq!(extract(None).await, ForwardedToken(None));
        assert_eq!(extract(Some("")).await, ForwardedToken(None));
        assert_eq!(extract(Some("   ")).await, ForwardedToken(None));
    }
}
