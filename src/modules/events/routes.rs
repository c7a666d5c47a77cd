//! Event CRUD handlers.
//!
//! Each request runs against the shared store unless it carries a forwarded
//! user token on the Postgres backend; then it gets its own single-connection
//! pool, authenticated as that user and closed when the request ends.

use std::future::Future;
use std::sync::Arc;

use axum::{
    extract::{rejection::PathRejection, Path, State},
    routing::get,
    Json, Router,
};
use lpt_authz::ForwardedToken;
use lpt_db::Database;
use lpt_http::{ApiJson, AppError};
use serde_json::json;
use sqlx::PgPool;

use super::models::{DeleteResponse, Event, EventCreate, EventUpdate};
use super::store::{EventStore, PgEventStore};

const EVENT_NOT_FOUND: &str = "Event not found";

#[derive(Clone)]
pub struct EventsState {
    pub database: Arc<Database>,
    pub store: Arc<dyn EventStore>,
}

struct Session {
    store: Arc<dyn EventStore>,
    user_pool: Option<PgPool>,
}

impl EventsState {
    async fn session(&self, token: &ForwardedToken) -> Result<Session, AppError> {
        if let Some(token) = token.as_deref() {
            if let Some(pool) = self.database.user_pool(token).await? {
                return Ok(Session {
                    store: Arc::new(PgEventStore::new(pool.clone())),
                    user_pool: Some(pool),
                });
            }
        }
        Ok(Session {
            store: self.store.clone(),
            user_pool: None,
        })
    }

    /// Run `op` on the request's store and release any per-request pool.
    async fn with_store<T, F, Fut>(&self, token: &ForwardedToken, op: F) -> Result<T, AppError>
    where
        F: FnOnce(Arc<dyn EventStore>) -> Fut,
        Fut: Future<Output = Result<T, AppError>>,
    {
        let session = self.session(token).await?;
        let result = op(session.store).await;
        if let Some(pool) = session.user_pool {
            pool.close().await;
        }
        result
    }
}

pub fn router(state: EventsState) -> Router {
    Router::new()
        .route("/", get(list_events).post(create_event))
        .route(
            "/{event_id}",
            get(get_event).put(update_event).delete(delete_event),
        )
        .with_state(state)
}

fn event_id(path: Result<Path<i32>, PathRejection>) -> Result<i32, AppError> {
    match path {
        Ok(Path(id)) => Ok(id),
        Err(rejection) => Err(AppError::validation(
            vec![json!({ "field": "event_id", "error": rejection.body_text() })],
            "event_id must be an integer",
        )),
    }
}

fn invalid_event(details: Vec<serde_json::Value>) -> AppError {
    AppError::validation(details, "Event payload is invalid")
}

async fn list_events(
    State(state): State<EventsState>,
    token: ForwardedToken,
) -> Result<Json<Vec<Event>>, AppError> {
    state
        .with_store(&token, |store| async move { store.list().await.map_err(AppError::from) })
        .await
        .map(Json)
}

async fn create_event(
    State(state): State<EventsState>,
    token: ForwardedToken,
    ApiJson(payload): ApiJson<EventCreate>,
) -> Result<Json<Event>, AppError> {
    let event = payload.validate().map_err(invalid_event)?;
    let created = state
        .with_store(&token, |store| async move {
            store.create(event).await.map_err(AppError::from)
        })
        .await?;

    tracing::info!(event_id = created.id, "event created");
    Ok(Json(created))
}

async fn get_event(
    State(state): State<EventsState>,
    token: ForwardedToken,
    path: Result<Path<i32>, PathRejection>,
) -> Result<Json<Event>, AppError> {
    let id = event_id(path)?;
    state
        .with_store(&token, |store| async move {
            store
                .get(id)
                .await
                .map_err(AppError::from)?
                .ok_or_else(|| AppError::not_found(EVENT_NOT_FOUND))
        })
        .await
        .map(Json)
}

async fn update_event(
    State(state): State<EventsState>,
    token: ForwardedToken,
    path: Result<Path<i32>, PathRejection>,
    ApiJson(payload): ApiJson<EventUpdate>,
) -> Result<Json<Event>, AppError> {
    let id = event_id(path)?;
    let changes = payload.validate().map_err(invalid_event)?;
    let updated = state
        .with_store(&token, |store| async move {
            store
                .update(id, changes)
                .await
                .map_err(AppError::from)?
                .ok_or_else(|| AppError::not_found(EVENT_NOT_FOUND))
        })
        .await?;

    tracing::info!(event_id = id, "event updated");
    Ok(Json(updated))
}

async fn delete_event(
    State(state): State<EventsState>,
    token: ForwardedToken,
    path: Result<Path<i32>, PathRejection>,
) -> Result<Json<DeleteResponse>, AppError> {
    let id = event_id(path)?;
    let deleted = state
        .with_store(&token, |store| async move { store.delete(id).await.map_err(AppError::from) })
        .await?;

    if !deleted {
        return Err(AppError::not_found(EVENT_NOT_FOUND));
    }

    tracing::info!(event_id = id, "event deleted");
    Ok(Json(DeleteResponse {
        ok: true,
        message: format!("Event {id} deleted successfully"),
    }))
}
