pub mod models;
pub mod routes;
pub mod seed;
pub mod store;

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use lpt_db::Database;
use lpt_kernel::{InitCtx, Migration, Module};
use serde_json::json;

use routes::EventsState;
use store::{EventStore, MemoryEventStore, PgEventStore};

/// Events catalog: CRUD routes, table migration and demo data.
pub struct EventsModule {
    state: EventsState,
}

impl EventsModule {
    pub fn new(database: Arc<Database>) -> Self {
        let store: Arc<dyn EventStore> = match database.pool() {
            Some(pool) => Arc::new(PgEventStore::new(pool.clone())),
            None => Arc::new(MemoryEventStore::new()),
        };
        Self {
            state: EventsState { database, store },
        }
    }

    /// The store shared by requests without a forwarded user token.
    pub fn store(&self) -> Arc<dyn EventStore> {
        self.state.store.clone()
    }
}

#[async_trait]
impl Module for EventsModule {
    fn name(&self) -> &'static str {
        "events"
    }

    fn routes(&self) -> Router {
        routes::router(self.state.clone())
    }

    fn migrations(&self) -> Vec<Migration> {
        vec![Migration {
            id: "001_create_event",
            up: r#"
                CREATE TABLE IF NOT EXISTS event (
                    id SERIAL PRIMARY KEY,
                    title VARCHAR NOT NULL,
                    short_description VARCHAR NOT NULL,
                    detailed_description VARCHAR NOT NULL,
                    city VARCHAR NOT NULL,
                    days_of_week JSON,
                    cost_usd DOUBLE PRECISION NOT NULL,
                    picture_url VARCHAR NOT NULL
                );
                CREATE INDEX IF NOT EXISTS ix_event_title ON event (title);
                CREATE INDEX IF NOT EXISTS ix_event_city ON event (city);
                "#,
        }]
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        let seeded = seed::seed_if_empty(self.state.store.as_ref()).await?;
        tracing::info!(module = self.name(), seeded, "events module started");
        Ok(())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        let error = |description: &str| {
            json!({
                "description": description,
                "content": {
                    "application/json": {
                        "schema": { "$ref": "#/components/schemas/ErrorResponse" }
                    }
                }
            })
        };
        let event = |description: &str| {
            json!({
                "description": description,
                "content": {
                    "application/json": {
                        "schema": { "$ref": "#/components/schemas/Event" }
                    }
                }
            })
        };
        let body = |schema: &str| {
            json!({
                "required": true,
                "content": {
                    "application/json": {
                        "schema": { "$ref": format!("#/components/schemas/{schema}") }
                    }
                }
            })
        };
        let event_id = json!([{
            "name": "event_id",
            "in": "path",
            "required": true,
            "schema": { "type": "integer", "format": "int32" }
        }]);
        let event_fields = json!({
            "title": { "type": "string", "description": "Short title of the event" },
            "short_description": { "type": "string", "description": "Short teaser description" },
            "detailed_description": { "type": "string", "description": "Full event description" },
            "city": { "type": "string", "description": "City where the event takes place" },
            "days_of_week": {
                "type": "array",
                "items": { "type": "string" },
                "description": "One or multiple days of the week"
            },
            "cost_usd": { "type": "number", "minimum": 0, "description": "Cost of the event in USD" },
            "picture_url": { "type": "string", "format": "uri", "description": "URL of the event picture" }
        });
        let required = json!([
            "title",
            "short_description",
            "detailed_description",
            "city",
            "days_of_week",
            "cost_usd",
            "picture_url"
        ]);

        let mut event_schema = event_fields.clone();
        event_schema["id"] = json!({ "type": "integer", "format": "int32" });
        let mut event_required = required.clone();
        if let Some(list) = event_required.as_array_mut() {
            list.insert(0, json!("id"));
        }

        Some(json!({
            "paths": {
                "/": {
                    "get": {
                        "summary": "List events",
                        "operationId": "listEvents",
                        "tags": ["Events"],
                        "responses": {
                            "200": {
                                "description": "All events",
                                "content": {
                                    "application/json": {
                                        "schema": {
                                            "type": "array",
                                            "items": { "$ref": "#/components/schemas/Event" }
                                        }
                                    }
                                }
                            },
                            "500": error("Internal server error")
                        }
                    },
                    "post": {
                        "summary": "Create an event",
                        "operationId": "createEvent",
                        "tags": ["Events"],
                        "requestBody": body("EventCreate"),
                        "responses": {
                            "200": event("Created event"),
                            "422": error("Validation error")
                        }
                    }
                },
                "/{event_id}": {
                    "get": {
                        "summary": "Get an event",
                        "operationId": "getEvent",
                        "tags": ["Events"],
                        "parameters": event_id,
                        "responses": {
                            "200": event("The event"),
                            "404": error("Event not found")
                        }
                    },
                    "put": {
                        "summary": "Update an event",
                        "operationId": "updateEvent",
                        "tags": ["Events"],
                        "parameters": event_id,
                        "requestBody": body("EventUpdate"),
                        "responses": {
                            "200": event("Updated event"),
                            "404": error("Event not found"),
                            "422": error("Validation error")
                        }
                    },
                    "delete": {
                        "summary": "Delete an event",
                        "operationId": "deleteEvent",
                        "tags": ["Events"],
                        "parameters": event_id,
                        "responses": {
                            "200": {
                                "description": "Deletion confirmation",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/DeleteResponse" }
                                    }
                                }
                            },
                            "404": error("Event not found")
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "Event": {
                        "type": "object",
                        "properties": event_schema,
                        "required": event_required
                    },
                    "EventCreate": {
                        "type": "object",
                        "properties": event_fields,
                        "required": required
                    },
                    "EventUpdate": {
                        "type": "object",
                        "properties": event_fields
                    },
                    "DeleteResponse": {
                        "type": "object",
                        "properties": {
                            "ok": { "type": "boolean" },
                            "message": { "type": "string" }
                        },
                        "required": ["ok", "message"]
                    }
                }
            }
        }))
    }
}

/// Create a new instance of the events module
pub fn create_module(database: Arc<Database>) -> Arc<EventsModule> {
    Arc::new(EventsModule::new(database))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use lpt_kernel::settings::{DatabaseSettings, Settings};
    use serde_json::Value;
    use tower::ServiceExt;

    fn module() -> EventsModule {
        EventsModule::new(Arc::new(Database::memory(DatabaseSettings::default())))
    }

    async fn call(
        router: &Router,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder()
            .method(method)
            .uri(uri)
            .header("x-forwarded-access-token", "user-token");
        let body = match body {
            Some(value) => {
                request = request.header("content-type", "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };
        let response = router
            .clone()
            .oneshot(request.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    fn payload() -> Value {
        json!({
            "title": "Rust Meetup",
            "short_description": "Monthly Rust talks",
            "detailed_description": "Two talks and a pub quiz.",
            "city": "Amsterdam",
            "days_of_week": ["Tuesday"],
            "cost_usd": 0,
            "picture_url": "https://example.com/rust.png"
        })
    }

    #[tokio::test]
    async fn start_seeds_demo_events() {
        let module = module();
        let settings = Settings::default();
        module.start(&InitCtx { settings: &settings }).await.unwrap();

        let (status, body) = call(&module.routes(), "GET", "/", None).await;
        assert_eq!(status, StatusCode::OK);
        let titles: Vec<_> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["title"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(
            titles,
            ["Data & AI Meetup", "Weekend Hackathon", "Analytics Workshop"]
        );
    }

    #[tokio::test]
    async fn crud_round_trip() {
        let router = module().routes();

        let (status, created) = call(&router, "POST", "/", Some(payload())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(created["id"], 1);
        assert_eq!(created["cost_usd"], 0.0);

        let (status, fetched) = call(&router, "GET", "/1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched, created);

        let (status, updated) =
            call(&router, "PUT", "/1", Some(json!({"city": "Utrecht"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["city"], "Utrecht");
        assert_eq!(updated["title"], "Rust Meetup");

        let (status, deleted) = call(&router, "DELETE", "/1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            deleted,
            json!({"ok": true, "message": "Event 1 deleted successfully"})
        );

        let (status, body) = call(&router, "GET", "/1", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["message"], "Event not found");
    }

    #[tokio::test]
    async fn missing_events_are_404() {
        let router = module().routes();
        for (method, body) in [("GET", None), ("PUT", Some(json!({}))), ("DELETE", None)] {
            let (status, body) = call(&router, method, "/42", body).await;
            assert_eq!(status, StatusCode::NOT_FOUND, "{method}");
            assert_eq!(body["error"]["code"], "not_found");
        }
    }

    #[tokio::test]
    async fn invalid_payloads_are_422() {
        let router = module().routes();

        let mut negative = payload();
        negative["cost_usd"] = json!(-5);
        let (status, body) = call(&router, "POST", "/", Some(negative)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["details"][0]["field"], "cost_usd");

        let mut missing = payload();
        missing.as_object_mut().unwrap().remove("title");
        let (status, body) = call(&router, "POST", "/", Some(missing)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["code"], "validation_error");

        let (status, _) = call(&router, "GET", "/not-a-number", None).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn openapi_names_every_operation() {
        let spec = module().openapi().unwrap();
        let ids: Vec<_> = ["get", "post"]
            .iter()
            .map(|m| spec["paths"]["/"][m]["operationId"].clone())
            .chain(
                ["get", "put", "delete"]
                    .iter()
                    .map(|m| spec["paths"]["/{event_id}"][m]["operationId"].clone()),
            )
            .collect();
        assert_eq!(
            ids,
            [
                "listEvents",
                "createEvent",
                "getEvent",
                "updateEvent",
                "deleteEvent"
            ]
        );
    }

    #[test]
    fn migration_creates_indexed_table() {
        let migrations = module().migrations();
        assert_eq!(migrations[0].id, "001_create_event");
        assert!(migrations[0].up.contains("ix_event_title"));
        assert!(migrations[0].up.contains("ix_event_city"));
    }
}
