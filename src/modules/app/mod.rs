//! Application-level endpoints mounted directly under the API prefix.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{extract::State, routing::get, Json, Router};
use lpt_authz::ForwardedToken;
use lpt_db::Database;
use lpt_http::AppError;
use lpt_kernel::Module;
use lpt_platform::User;
use serde::Serialize;
use serde_json::json;

#[derive(Debug, Clone, Serialize)]
pub struct VersionOut {
    pub version: &'static str,
}

pub struct AppModule {
    database: Arc<Database>,
}

impl AppModule {
    pub fn new(database: Arc<Database>) -> Self {
        Self { database }
    }
}

#[async_trait]
impl Module for AppModule {
    fn name(&self) -> &'static str {
        "app"
    }

    fn base_path(&self) -> String {
        String::new()
    }

    fn routes(&self) -> Router {
        Router::new()
            .route("/version", get(version))
            .route("/current-user", get(current_user))
            .with_state(self.database.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        let complex = json!({
            "type": "array",
            "items": {
                "type": "object",
                "properties": {
                    "value": { "type": "string" },
                    "display": { "type": "string" },
                    "primary": { "type": "boolean" },
                    "type": { "type": "string" }
                }
            }
        });

        Some(json!({
            "paths": {
                "/version": {
                    "get": {
                        "summary": "Application version",
                        "operationId": "version",
                        "tags": ["App"],
                        "responses": {
                            "200": {
                                "description": "Version of the running build",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/VersionOut" }
                                    }
                                }
                            }
                        }
                    }
                },
                "/current-user": {
                    "get": {
                        "summary": "The signed-in user",
                        "operationId": "currentUser",
                        "tags": ["App"],
                        "responses": {
                            "200": {
                                "description": "Current user",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/User" }
                                    }
                                }
                            },
                            "401": {
                                "description": "Forwarded token was rejected",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/ErrorResponse" }
                                    }
                                }
                            }
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "VersionOut": {
                        "type": "object",
                        "properties": { "version": { "type": "string" } },
                        "required": ["version"]
                    },
                    "User": {
                        "type": "object",
                        "properties": {
                            "id": { "type": "string" },
                            "user_name": { "type": "string" },
                            "display_name": { "type": "string" },
                            "active": { "type": "boolean" },
                            "emails": complex,
                            "roles": complex,
                            "groups": complex,
                            "entitlements": complex
                        }
                    }
                }
            }
        }))
    }
}

async fn version() -> Json<VersionOut> {
    Json(VersionOut {
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// The platform user behind the forwarded token; a fixed local user when
/// there is no token or no platform (in-memory development).
async fn current_user(
    State(database): State<Arc<Database>>,
    token: ForwardedToken,
) -> Result<Json<User>, AppError> {
    match (token.as_deref(), database.platform()) {
        (Some(token), Some(platform)) => {
            let user = platform.on_behalf_of(token).current_user().await?;
            Ok(Json(user))
        }
        _ => Ok(Json(local_user())),
    }
}

fn local_user() -> User {
    User {
        id: Some("local-user".to_string()),
        user_name: Some("local.user@example.com".to_string()),
        display_name: Some("Local User".to_string()),
        active: Some(true),
        ..User::default()
    }
}

pub fn create_module(database: Arc<Database>) -> Arc<AppModule> {
    Arc::new(AppModule::new(database))
}
