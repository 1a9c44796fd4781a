//! PostgreSQL / PostGIS store

use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use super::{FeatureStore, LayerStore, Store, UserStore};
use crate::domain::geometry::StorageGeometry;
use crate::domain::{Bbox, FeatureResult, StoragePartition};
use crate::models::{FeatureRow, Layer, Properties, User, UserRole};

/// Projection shared by every statement that hands a row back.
const ROW_COLUMNS: &str = "id, version, properties, ST_AsGeoJSON(geom) AS geometry_json";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LayerStore for PgStore {
    async fn find_layer(&self, id: Uuid) -> FeatureResult<Option<Layer>> {
        Ok(Layer::find_by_id(&self.pool, id).await?)
    }

    async fn list_layers(&self) -> FeatureResult<Vec<Layer>> {
        Ok(Layer::list(&self.pool).await?)
    }
}

#[async_trait]
impl FeatureStore for PgStore {
    async fn list_by_bbox(
        &self,
        partition: StoragePartition,
        bbox: &Bbox,
        srid: i32,
        limit: i64,
    ) -> FeatureResult<Vec<FeatureRow>> {
        // `&&` is the GiST-backed envelope pre-filter; ST_Intersects decides
        let sql = format!(
            r#"
            SELECT {cols}
            FROM {table}
            WHERE geom && ST_MakeEnvelope($1, $2, $3, $4, $5)
              AND ST_Intersects(geom, ST_MakeEnvelope($1, $2, $3, $4, $5))
            LIMIT $6
            "#,
            cols = ROW_COLUMNS,
            table = partition.table_name(),
        );

        let rows = sqlx::query_as::<_, FeatureRow>(&sql)
            .bind(bbox.min_lon)
            .bind(bbox.min_lat)
            .bind(bbox.max_lon)
            .bind(bbox.max_lat)
            .bind(srid)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn get_by_id(&self, partition: StoragePartition, id: Uuid) -> FeatureResult<Option<FeatureRow>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE id = $1",
            ROW_COLUMNS,
            partition.table_name()
        );

        let row = sqlx::query_as::<_, FeatureRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn create(
        &self,
        partition: StoragePartition,
        geometry: &StorageGeometry,
        properties: &Properties,
    ) -> FeatureResult<FeatureRow> {
        let sql = format!(
            r#"
            INSERT INTO {table} (id, version, properties, geom)
            VALUES ($1, 1, $2, ST_SetSRID(ST_GeomFromGeoJSON($3), $4))
            RETURNING {cols}
            "#,
            table = partition.table_name(),
            cols = ROW_COLUMNS,
        );

        let row = sqlx::query_as::<_, FeatureRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(Json(properties))
            .bind(&geometry.geojson)
            .bind(geometry.srid)
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }

    async fn update_if_version_matches(
        &self,
        partition: StoragePartition,
        id: Uuid,
        geometry: Option<&StorageGeometry>,
        properties: Option<&Properties>,
        expected_version: i32,
    ) -> FeatureResult<Option<FeatureRow>> {
        // NULL geometry/properties keep the stored value
        let sql = format!(
            r#"
            UPDATE {table}
            SET geom = COALESCE(ST_SetSRID(ST_GeomFromGeoJSON($3), $4), geom),
                properties = COALESCE($5, properties),
                version = version + 1,
                updated_at = NOW()
            WHERE id = $1 AND version = $2
            RETURNING {cols}
            "#,
            table = partition.table_name(),
            cols = ROW_COLUMNS,
        );

        let row = sqlx::query_as::<_, FeatureRow>(&sql)
            .bind(id)
            .bind(expected_version)
            .bind(geometry.map(|g| g.geojson.as_str()))
            .bind(geometry.map(|g| g.srid))
            .bind(properties.map(Json))
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn delete_if_version_matches(
        &self,
        partition: StoragePartition,
        id: Uuid,
        expected_version: i32,
    ) -> FeatureResult<bool> {
        let sql = format!(
            "DELETE FROM {} WHERE id = $1 AND version = $2",
            partition.table_name()
        );

        let result = sqlx::query(&sql)
            .bind(id)
            .bind(expected_version)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn get_current_version(&self, partition: StoragePartition, id: Uuid) -> FeatureResult<Option<i32>> {
        let sql = format!("SELECT version FROM {} WHERE id = $1", partition.table_name());

        let version = sqlx::query_scalar::<_, i32>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(version)
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error> {
        User::find_by_email(&self.pool, email).await
    }

    async fn create_user(&self, email: &str, role: UserRole) -> Result<User, sqlx::Error> {
        User::create(&self.pool, email, role).await
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<(), sqlx::Error> {
        crate::db::ping(&self.pool).await
    }
}
