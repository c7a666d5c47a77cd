//! Read-only schema inspection for the administrative tooling.

use serde::Serialize;
use sqlx::PgPool;

use crate::DbError;

#[derive(Debug, Clone, Serialize)]
pub struct SchemaReport {
    /// Every non-system schema in the database.
    pub schemas: Vec<String>,
    /// The schema whose tables were inspected.
    pub schema: String,
    pub tables: Vec<TableReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TableReport {
    pub name: String,
    pub columns: Vec<ColumnInfo>,
    pub primary_key: Vec<String>,
    pub foreign_keys: Vec<ForeignKeyInfo>,
    pub indexes: Vec<IndexInfo>,
    pub row_count: i64,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
    pub default: Option<String>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ForeignKeyInfo {
    pub name: String,
    /// e.g. `FOREIGN KEY (owner_id) REFERENCES users(id)`
    pub definition: String,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct IndexInfo {
    pub name: String,
    pub columns: Vec<String>,
    pub unique: bool,
}

const SCHEMAS_SQL: &str = "SELECT nspname::text FROM pg_namespace \
     WHERE nspname NOT LIKE 'pg\\_%' AND nspname <> 'information_schema' \
     ORDER BY nspname";

const TABLES_SQL: &str = "SELECT table_name::text FROM information_schema.tables \
     WHERE table_schema = $1 AND table_type = 'BASE TABLE' \
     ORDER BY table_name";

const COLUMNS_SQL: &str = "SELECT column_name::text AS name, data_type::text AS data_type, \
            (is_nullable = 'YES') AS nullable, column_default::text AS default \
     FROM information_schema.columns \
     WHERE table_schema = $1 AND table_name = $2 \
     ORDER BY ordinal_position";

const PRIMARY_KEY_SQL: &str = "SELECT a.attname::text \
     FROM pg_index i \
     CROSS JOIN LATERAL unnest(i.indkey::int2[]) WITH ORDINALITY AS k(attnum, ord) \
     JOIN pg_attribute a ON a.attrelid = i.indrelid AND a.attnum = k.attnum \
     WHERE i.indrelid = $1::regclass AND i.indisprimary \
     ORDER BY k.ord";

const FOREIGN_KEYS_SQL: &str = "SELECT conname::text AS name, \
            pg_get_constraintdef(oid) AS definition \
     FROM pg_constraint \
     WHERE conrelid = $1::regclass AND contype = 'f' \
     ORDER BY conname";

const INDEXES_SQL: &str = "SELECT c.relname::text AS name, \
            ARRAY(SELECT a.attname::text \
                  FROM unnest(i.indkey::int2[]) WITH ORDINALITY AS k(attnum, ord) \
                  JOIN pg_attribute a ON a.attrelid = i.indrelid AND a.attnum = k.attnum \
                  ORDER BY k.ord) AS columns, \
            i.indisunique AS unique \
     FROM pg_index i \
     JOIN pg_class c ON c.oid = i.indexrelid \
     WHERE i.indrelid = $1::regclass AND NOT i.indisprimary \
     ORDER BY c.relname";

/// Describe every base table in `schema`.
pub async fn inspect_schema(pool: &PgPool, schema: &str) -> Result<SchemaReport, DbError> {
    let schemas: Vec<String> = sqlx::query_scalar(SCHEMAS_SQL).fetch_all(pool).await?;
    let names: Vec<String> = sqlx::query_scalar(TABLES_SQL)
        .bind(schema)
        .fetch_all(pool)
        .await?;

    let mut tables = Vec::with_capacity(names.len());
    for name in names {
        tables.push(inspect_table(pool, schema, name).await?);
    }

    Ok(SchemaReport {
        schemas,
        schema: schema.to_string(),
        tables,
    })
}

async fn inspect_table(pool: &PgPool, schema: &str, name: String) -> Result<TableReport, DbError> {
    let qualified = format!("{}.{}", quote_ident(schema), quote_ident(&name));

    let columns = sqlx::query_as::<_, ColumnInfo>(COLUMNS_SQL)
        .bind(schema)
        .bind(&name)
        .fetch_all(pool)
        .await?;

    let primary_key: Vec<String> = sqlx::query_scalar(PRIMARY_KEY_SQL)
        .bind(&qualified)
        .fetch_all(pool)
        .await?;

    let foreign_keys = sqlx::query_as::<_, ForeignKeyInfo>(FOREIGN_KEYS_SQL)
        .bind(&qualified)
        .fetch_all(pool)
        .await?;

    let indexes = sqlx::query_as::<_, IndexInfo>(INDEXES_SQL)
        .bind(&qualified)
        .fetch_all(pool)
        .await?;

    let row_count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {qualified}"))
        .fetch_one(pool)
        .await?;

    Ok(TableReport {
        name,
        columns,
        primary_key,
        foreign_keys,
        indexes,
        row_count,
    })
}

/// Quote a Postgres identifier, doubling embedded quotes.
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}
