//! Static frontend serving with single-page-application fallback.
//!
//! Unmatched requests are resolved as:
//! 1. non-API `GET`/`HEAD`: the file from the asset directory, if present;
//! 2. otherwise, a page navigation (non-API `GET` accepting `text/html` whose
//!    last path segment has no dot) gets `index.html` so the client router
//!    can take over;
//! 3. anything else is a JSON 404.

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::Request,
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{any, MethodRouter},
};
use tower::ServiceExt;
use tower_http::services::ServeDir;

use crate::error::AppError;

struct SpaAssets {
    dir: PathBuf,
    api_prefix: String,
}

/// Fallback service serving `dir` for everything outside `api_prefix`.
pub fn fallback(dir: PathBuf, api_prefix: String) -> MethodRouter {
    let assets = Arc::new(SpaAssets { dir, api_prefix });
    any(move |request: Request| {
        let assets = assets.clone();
        async move { assets.respond(request).await }
    })
}

/// JSON 404 in the standard error envelope.
pub async fn not_found() -> Response {
    AppError::not_found("Not Found").into_response()
}

/// Whether `path` is served by the API rather than the frontend.
pub fn is_api_path(path: &str, api_prefix: &str) -> bool {
    !api_prefix.is_empty() && path.starts_with(api_prefix)
}

/// Whether a missed request should be answered with `index.html`.
pub fn serves_index(method: &Method, accept: &str, path: &str, api_prefix: &str) -> bool {
    let looks_like_asset = path.rsplit('/').next().is_some_and(|s| s.contains('.'));
    !is_api_path(path, api_prefix)
        && method == Method::GET
        && accept.contains("text/html")
        && !looks_like_asset
}

impl SpaAssets {
    async fn respond(&self, request: Request) -> Response {
        let method = request.method().clone();
        let path = request.uri().path().to_string();

        if is_api_path(&path, &self.api_prefix) || !(method == Method::GET || method == Method::HEAD)
        {
            return not_found().await;
        }

        let accept = request
            .headers()
            .get(header::ACCEPT)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        // Misses come back as 404 responses, never as errors.
        let response = match ServeDir::new(&self.dir).oneshot(request).await {
            Ok(response) => response,
            Err(never) => match never {},
        };
        if response.status() != StatusCode::NOT_FOUND {
            return response.map(Body::new);
        }

        if serves_index(&method, &accept, &path, &self.api_prefix) {
            tracing::debug!(path = %path, "serving index.html for client-side route");
            return self.index().await;
        }

        not_found().await
    }

    async fn index(&self) -> Response {
        match tokio::fs::read(self.dir.join("index.html")).await {
            Ok(bytes) => (
                [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
                bytes,
            )
                .into_response(),
            Err(err) => {
                tracing::warn!(dir = %self.dir.display(), error = %err, "index.html is missing");
                not_found().await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;

    fn assets() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<html>app</html>").unwrap();
        std::fs::create_dir(dir.path().join("assets")).unwrap();
        std::fs::write(dir.path().join("assets/app.js"), "console.log(1)").unwrap();
        dir
    }

    fn app(dir: &tempfile::TempDir) -> Router {
        Router::new().fallback_service(fallback(dir.path().to_path_buf(), "/api".to_string()))
    }

    async fn send(app: Router, method: Method, uri: &str, accept: &str) -> (StatusCode, String) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::ACCEPT, accept)
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8_lossy(&body).into_owned())
    }

    #[test]
    fn index_rule() {
        let html = "text/html,application/xhtml+xml";
        assert!(serves_index(&Method::GET, html, "/about", "/api"));
        assert!(serves_index(&Method::GET, html, "/events/12/edit", "/api"));
        assert!(!serves_index(&Method::GET, html, "/api/unknown", "/api"));
        assert!(!serves_index(&Method::GET, html, "/missing.js", "/api"));
        assert!(!serves_index(&Method::GET, html, "/img/logo.png", "/api"));
        assert!(!serves_index(&Method::GET, "application/json", "/about", "/api"));
        assert!(!serves_index(&Method::POST, html, "/about", "/api"));
        assert!(!serves_index(&Method::HEAD, html, "/about", "/api"));
    }

    #[tokio::test]
    async fn existing_files_are_served() {
        let dir = assets();
        let (status, body) = send(app(&dir), Method::GET, "/assets/app.js", "*/*").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "console.log(1)");

        let (status, body) = send(app(&dir), Method::GET, "/", "text/html").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "<html>app</html>");
    }

    #[tokio::test]
    async fn page_navigation_falls_back_to_index() {
        let dir = assets();
        let (status, body) = send(app(&dir), Method::GET, "/events/3", "text/html").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "<html>app</html>");
    }

    #[tokio::test]
    async fn missing_assets_and_api_paths_are_json_404() {
        let dir = assets();
        for (method, uri, accept) in [
            (Method::GET, "/missing.js", "text/html"),
            (Method::GET, "/api/nope", "text/html"),
            (Method::GET, "/about", "application/json"),
            (Method::POST, "/about", "text/html"),
        ] {
            let (status, body) = send(app(&dir), method, uri, accept).await;
            assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
            let body: serde_json::Value = serde_json::from_str(&body).unwrap();
            assert_eq!(body["error"]["code"], "not_found");
        }
    }
}
