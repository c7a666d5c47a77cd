//! Local HTTP stand-in for the workspace REST API.

use std::sync::{Arc, Mutex};

use axum::{
    extract::State,
    http::{header, HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json, Router,
};
use serde_json::json;

use crate::config::{normalize_host, AuthConfig, WorkspaceConfig};
use crate::WorkspaceClient;

#[derive(Clone, Default)]
struct Journal {
    hits: Arc<Mutex<Vec<String>>>,
    bearers: Arc<Mutex<Vec<String>>>,
}

/// Knows instance `LPT-LKB-2` (uid `uid-1`), issues `oauth-N` tokens and
/// only accepts instance patches on the `/database-instances` path.
pub(crate) struct MockWorkspace {
    host: String,
    journal: Journal,
}

impl MockWorkspace {
    pub(crate) async fn start() -> Self {
        let journal = Journal::default();
        let router = Router::new().fallback(respond).with_state(journal.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });

        Self {
            host: format!("http://{addr}"),
            journal,
        }
    }

    pub(crate) fn oauth_client(&self) -> WorkspaceClient {
        WorkspaceClient::new(WorkspaceConfig {
            host: normalize_host(&self.host).unwrap(),
            auth: AuthConfig::OAuth {
                client_id: "sp-1".to_string(),
                client_secret: "sp-secret".to_string(),
            },
        })
        .unwrap()
    }

    /// `token` for each OAuth exchange, `METHOD /path [body]` for API calls.
    pub(crate) fn hits(&self) -> Vec<String> {
        self.journal.hits.lock().unwrap().clone()
    }

    /// Authorization headers seen on API calls.
    pub(crate) fn bearers(&self) -> Vec<String> {
        self.journal.bearers.lock().unwrap().clone()
    }
}

async fn respond(
    State(journal): State<Journal>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> Response {
    let path = uri.path().to_string();

    if path == "/oidc/v1/token" {
        let mut hits = journal.hits.lock().unwrap();
        let issued = hits.iter().filter(|hit| hit.as_str() == "token").count() + 1;
        hits.push("token".to_string());
        return Json(json!({
            "access_token": format!("oauth-{issued}"),
            "token_type": "Bearer",
            "expires_in": 3600
        }))
        .into_response();
    }

    if let Some(bearer) = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
    {
        journal.bearers.lock().unwrap().push(bearer.to_string());
    }
    let hit = if body.is_empty() {
        format!("{method} {path}")
    } else {
        format!("{method} {path} {body}")
    };
    journal.hits.lock().unwrap().push(hit);

    match (method, path.as_str()) {
        (Method::GET, "/api/2.0/database/instances/LPT-LKB-2") => Json(json!({
            "name": "LPT-LKB-2",
            "uid": "uid-1",
            "read_write_dns": "lpt-lkb-2.database.example.com",
            "state": "AVAILABLE"
        }))
        .into_response(),
        (Method::PATCH, "/api/2.0/database-instances/uid-1") => {
            Json(json!({ "ok": true })).into_response()
        }
        _ => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error_code": "RESOURCE_DOES_NOT_EXIST", "message": "no such resource" })),
        )
            .into_response(),
    }
}
