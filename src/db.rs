//! Database module - PostgreSQL/PostGIS connection and schema bootstrap

use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::domain::geometry::DEFAULT_SRID;
use crate::domain::StoragePartition;

/// Create database connection pool
pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}

/// Apply the schema. Every statement is idempotent.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    let schema = schema_sql();
    sqlx::raw_sql(&schema).execute(pool).await?;

    tracing::info!(
        partitions = StoragePartition::ALL.len(),
        "Database schema applied successfully"
    );
    Ok(())
}

pub async fn ping(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Base tables followed by one table per storage partition.
fn schema_sql() -> String {
    let mut sql = String::from(BASE_SCHEMA_SQL);
    for partition in StoragePartition::ALL {
        sql.push_str(&partition_sql(partition));
    }
    sql
}

fn partition_sql(partition: StoragePartition) -> String {
    let table = partition.table_name();
    format!(
        r#"
CREATE TABLE IF NOT EXISTS {table} (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    version INT NOT NULL DEFAULT 1 CHECK (version >= 1),
    properties JSONB NOT NULL DEFAULT '{{}}'::jsonb,
    geom geometry({geom_type}, {srid}) NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX IF NOT EXISTS idx_{table}_geom ON {table} USING GIST (geom);
"#,
        geom_type = partition.geometry_type().as_str(),
        srid = DEFAULT_SRID,
    )
}

const BASE_SCHEMA_SQL: &str = r#"
CREATE EXTENSION IF NOT EXISTS postgis;
CREATE EXTENSION IF NOT EXISTS pgcrypto;

-- Users
CREATE TABLE IF NOT EXISTS users (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    email VARCHAR(255) NOT NULL UNIQUE,
    password_hash VARCHAR(255),
    role VARCHAR(20) NOT NULL DEFAULT 'viewer' CHECK (role IN ('viewer', 'editor')),
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

-- Layers
CREATE TABLE IF NOT EXISTS layers (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    name VARCHAR(255) NOT NULL UNIQUE,
    title VARCHAR(255) NOT NULL,
    geometry_type VARCHAR(32) NOT NULL,
    srid INT NOT NULL DEFAULT 4326,
    storage_table VARCHAR(63) NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
"#;
