//! Error handling for the lpt-event HTTP layer

use axum::{
    extract::{rejection::JsonRejection, FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use lpt_db::DbError;
use lpt_platform::PlatformError;
use serde_json::json;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

/// Application error types that map to HTTP responses
#[derive(Error, Debug)]
pub enum AppError {
    #[error("validation error: {message}")]
    Validation {
        details: Vec<serde_json::Value>,
        code: String,
        message: String,
    },

    #[error("not found: {message}")]
    NotFound { message: String, code: String },

    #[error("unauthorized: {message}")]
    Unauthorized { message: String, code: String },

    #[error("forbidden: {message}")]
    Forbidden { message: String, code: String },

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Create a validation error
    pub fn validation(details: Vec<serde_json::Value>, message: impl Into<String>) -> Self {
        Self::Validation {
            details,
            code: "validation_error".to_string(),
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
            code: "not_found".to_string(),
        }
    }

    /// Create an unauthorized error
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
            code: "unauthorized".to_string(),
        }
    }

    /// Create a forbidden error
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
            code: "forbidden".to_string(),
        }
    }
}

impl From<DbError> for AppError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound => AppError::not_found("Not found"),
            DbError::InstanceNotFound(name) => {
                AppError::not_found(format!("database instance {name} does not exist"))
            }
            DbError::Platform(platform) => platform.into(),
            other => AppError::Internal(other.into()),
        }
    }
}

impl From<PlatformError> for AppError {
    fn from(err: PlatformError) -> Self {
        match err {
            PlatformError::NotFound(message) => AppError::not_found(message),
            PlatformError::Api { status: 401, message } => AppError::unauthorized(message),
            PlatformError::Api { status: 403, message } => AppError::forbidden(message),
            other => AppError::Internal(other.into()),
        }
    }
}

/// JSON body extractor whose rejections use the standard error envelope.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiJson<T>(pub T);

impl<T, S> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(AppError::validation(
                vec![json!({ "field": "body", "error": rejection.body_text() })],
                "Request body is invalid",
            )),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let error_id = Uuid::new_v4();
        let timestamp = OffsetDateTime::now_utc().to_string();

        let (status, error_code, message, details) = match self {
            AppError::Validation {
                details,
                code,
                message,
            } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                code,
                message,
                Some(details),
            ),
            AppError::NotFound { message, code } => (StatusCode::NOT_FOUND, code, message, None),
            AppError::Unauthorized { message, code } => {
                (StatusCode::UNAUTHORIZED, code, message, None)
            }
            AppError::Forbidden { message, code } => (StatusCode::FORBIDDEN, code, message, None),
            AppError::Internal(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error".to_string(),
                e.to_string(),
                None,
            ),
        };

        tracing::error!(
            error_id = %error_id,
            error_code = %error_code,
            status_code = %status.as_u16(),
            "Request error"
        );

        // In production, we might want to hide internal error details
        let message = if cfg!(not(debug_assertions)) && status == StatusCode::INTERNAL_SERVER_ERROR
        {
            "An internal server error occurred".to_string()
        } else {
            message
        };

        let error_response = json!({
            "error": {
                "code": error_code,
                "message": message,
                "details": details.unwrap_or_default(),
                "trace_id": error_id.to_string(),
                "timestamp": timestamp
            }
        });

        (status, Json(error_response)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_validation_error() {
        let details = vec![serde_json::json!({"field": "slug", "error": "required"})];
        let error = AppError::validation(details.clone(), "Validation failed");

        match error {
            AppError::Validation {
                details: d,
                code,
                message,
            } => {
                assert_eq!(d, details);
                assert_eq!(code, "validation_error");
                assert_eq!(message, "Validation failed");
            }
            _ => panic!("Expected Validation error"),
        }
    }

    #[test]
    fn test_error_response_mapping() {
        let error = AppError::not_found("Resource not found");
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_internal_error_mapping() {
        let internal_error = anyhow::anyhow!("Database connection failed");
        let error = AppError::Internal(internal_error);
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_error_response_format() {
        let error = AppError::not_found("Event not found");
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["error"]["code"], "not_found");
        assert_eq!(body["error"]["message"], "Event not found");
        assert_eq!(body["error"]["details"], json!([]));
        assert!(Uuid::parse_str(body["error"]["trace_id"].as_str().unwrap()).is_ok());
        assert!(body["error"]["timestamp"].is_string());
    }

    #[test]
    fn test_db_error_mapping() {
        let status = |err: DbError| AppError::from(err).into_response().status();

        assert_eq!(status(DbError::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(
            status(DbError::InstanceNotFound("LPT-LKB-2".into())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status(DbError::Connection("refused".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_platform_error_mapping() {
        let status = |err: PlatformError| AppError::from(err).into_response().status();

        assert_eq!(
            status(PlatformError::Api {
                status: 401,
                message: "invalid token".into()
            }),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status(PlatformError::Api {
                status: 403,
                message: "no access".into()
            }),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status(PlatformError::Api {
                status: 500,
                message: "boom".into()
            }),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_api_json_rejection_is_validation_error() {
        #[derive(Debug, serde::Deserialize)]
        struct Payload {
            #[allow(dead_code)]
            title: String,
        }

        let request = Request::builder()
            .method("POST")
            .header("content-type", "application/json")
            .body(axum::body::Body::from("{\"title\": 42}"))
            .unwrap();

        let err = ApiJson::<Payload>::from_request(request, &())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
        assert_eq!(err.into_response().status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
