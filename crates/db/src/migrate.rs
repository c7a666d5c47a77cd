//! Applies module migrations to the Postgres backend.
//!
//! Each migration runs once, in its own transaction, and is recorded in the
//! `_lpt_migrations` ledger keyed by `(module, id)`.

use lpt_kernel::Migration;
use sqlx::{Postgres, Transaction};

use crate::{Database, DbError};

const LEDGER_DDL: &str = "CREATE TABLE IF NOT EXISTS _lpt_migrations (
    module TEXT NOT NULL,
    id TEXT NOT NULL,
    applied_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    PRIMARY KEY (module, id)
)";

/// Serialises concurrent runners (several replicas starting at once).
const LOCK_KEY: i64 = 0x6c70_745f_6d69_67;

/// Apply every migration not yet in the ledger. Returns how many ran.
///
/// The in-memory backend has no schema; nothing is applied.
pub async fn run(database: &Database, migrations: &[(String, Migration)]) -> Result<usize, DbError> {
    let Some(pool) = database.pool() else {
        tracing::debug!(count = migrations.len(), "in-memory backend, skipping migrations");
        return Ok(0);
    };

    sqlx::query(LEDGER_DDL).execute(pool).await?;

    let mut applied = 0;
    for (module, migration) in migrations {
        let mut tx = pool.begin().await?;
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(LOCK_KEY)
            .execute(&mut *tx)
            .await?;

        if is_applied(&mut tx, module, migration.id).await? {
            tx.rollback().await?;
            continue;
        }

        tracing::info!(module = %module, id = migration.id, "applying migration");

        sqlx::raw_sql(migration.up)
            .execute(&mut *tx)
            .await
            .map_err(|source| DbError::Migration {
                module: module.clone(),
                id: migration.id.to_string(),
                source,
            })?;

        sqlx::query("INSERT INTO _lpt_migrations (module, id) VALUES ($1, $2)")
            .bind(module)
            .bind(migration.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        applied += 1;
    }

    tracing::info!(applied, total = migrations.len(), "migrations complete");
    Ok(applied)
}

async fn is_applied(
    tx: &mut Transaction<'_, Postgres>,
    module: &str,
    id: &str,
) -> Result<bool, DbError> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM _lpt_migrations WHERE module = $1 AND id = $2)",
    )
    .bind(module)
    .bind(id)
    .fetch_one(&mut **tx)
    .await?;
    Ok(exists)
}
