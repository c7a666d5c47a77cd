//! Event persistence: Postgres for deployments, memory for local development.

use std::collections::BTreeMap;

use async_trait::async_trait;
use lpt_db::DbError;
use sqlx::{types::Json, PgPool};
use tokio::sync::RwLock;

use super::models::{Event, EventChanges, NewEvent};

#[async_trait]
pub trait EventStore: Send + Sync {
    async fn list(&self) -> Result<Vec<Event>, DbError>;

    async fn get(&self, id: i32) -> Result<Option<Event>, DbError>;

    /// Insert and return the event with its generated id.
    async fn create(&self, event: NewEvent) -> Result<Event, DbError>;

    /// Apply `changes`; `None` when no event has that id.
    async fn update(&self, id: i32, changes: EventChanges) -> Result<Option<Event>, DbError>;

    /// `false` when no event has that id.
    async fn delete(&self, id: i32) -> Result<bool, DbError>;

    async fn is_empty(&self) -> Result<bool, DbError>;
}

const COLUMNS: &str = "id, title, short_description, detailed_description, city, \
     COALESCE(days_of_week, '[]'::json) AS days_of_week, cost_usd, picture_url";

pub struct PgEventStore {
    pool: PgPool,
}

impl PgEventStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventStore for PgEventStore {
    async fn list(&self) -> Result<Vec<Event>, DbError> {
        let events = sqlx::query_as::<_, Event>(&format!("SELECT {COLUMNS} FROM event ORDER BY id"))
            .fetch_all(&self.pool)
            .await?;
        Ok(events)
    }

    async fn get(&self, id: i32) -> Result<Option<Event>, DbError> {
        let event = sqlx::query_as::<_, Event>(&format!("SELECT {COLUMNS} FROM event WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(event)
    }

    async fn create(&self, event: NewEvent) -> Result<Event, DbError> {
        let sql = format!(
            "INSERT INTO event \
                 (title, short_description, detailed_description, city, days_of_week, cost_usd, picture_url) \
             VALUES ($1, $2, $3, $4, $5::json, $6, $7) \
             RETURNING {COLUMNS}"
        );
        let created = sqlx::query_as::<_, Event>(&sql)
            .bind(event.title)
            .bind(event.short_description)
            .bind(event.detailed_description)
            .bind(event.city)
            .bind(Json(event.days_of_week))
            .bind(event.cost_usd)
            .bind(event.picture_url)
            .fetch_one(&self.pool)
            .await?;
        Ok(created)
    }

    async fn update(&self, id: i32, changes: EventChanges) -> Result<Option<Event>, DbError> {
        let sql = format!(
            "UPDATE event SET \
                 title = COALESCE($2, title), \
                 short_description = COALESCE($3, short_description), \
                 detailed_description = COALESCE($4, detailed_description), \
                 city = COALESCE($5, city), \
                 days_of_week = COALESCE($6::json, days_of_week), \
                 cost_usd = COALESCE($7, cost_usd), \
                 picture_url = COALESCE($8, picture_url) \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        let updated = sqlx::query_as::<_, Event>(&sql)
            .bind(id)
            .bind(changes.title)
            .bind(changes.short_description)
            .bind(changes.detailed_description)
            .bind(changes.city)
            .bind(changes.days_of_week.map(Json))
            .bind(changes.cost_usd)
            .bind(changes.picture_url)
            .fetch_optional(&self.pool)
            .await?;
        Ok(updated)
    }

    async fn delete(&self, id: i32) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM event WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn is_empty(&self) -> Result<bool, DbError> {
        let empty: bool = sqlx::query_scalar("SELECT NOT EXISTS (SELECT 1 FROM event)")
            .fetch_one(&self.pool)
            .await?;
        Ok(empty)
    }
}

#[derive(Default)]
struct MemoryState {
    last_id: i32,
    events: BTreeMap<i32, Event>,
}

/// Process-local store; contents are lost on restart.
#[derive(Default)]
pub struct MemoryEventStore {
    state: RwLock<MemoryState>,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn list(&self) -> Result<Vec<Event>, DbError> {
        Ok(self.state.read().await.events.values().cloned().collect())
    }

    async fn get(&self, id: i32) -> Result<Option<Event>, DbError> {
        Ok(self.state.read().await.events.get(&id).cloned())
    }

    async fn create(&self, event: NewEvent) -> Result<Event, DbError> {
        let mut state = self.state.write().await;
        state.last_id += 1;
        let created = Event {
            id: state.last_id,
            title: event.title,
            short_description: event.short_description,
            detailed_description: event.detailed_description,
            city: event.city,
            days_of_week: event.days_of_week,
            cost_usd: event.cost_usd,
            picture_url: event.picture_url,
        };
        state.events.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update(&self, id: i32, changes: EventChanges) -> Result<Option<Event>, DbError> {
        let mut state = self.state.write().await;
        Ok(state.events.get_mut(&id).map(|event| {
            changes.apply_to(event);
            event.clone()
        }))
    }

    async fn delete(&self, id: i32) -> Result<bool, DbError> {
        Ok(self.state.write().await.events.remove(&id).is_some())
    }

    async fn is_empty(&self) -> Result<bool, DbError> {
        Ok(self.state.read().await.events.is_empty())
    }
}
