//! Storage ports
//!
//! Every feature operation takes an already-resolved [`StoragePartition`];
//! the store never decides which table a layer lives in.
//!
//! Mutations are single conditional statements. Whether the version check
//! and the write happen together is the adapter's responsibility, not the
//! caller's.

pub mod postgres;
#[cfg(test)]
pub mod memory;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::geometry::StorageGeometry;
use crate::domain::{Bbox, FeatureResult, StoragePartition};
use crate::models::{FeatureRow, Layer, Properties, User, UserRole};

pub use postgres::PgStore;

#[async_trait]
pub trait LayerStore: Send + Sync {
    async fn find_layer(&self, id: Uuid) -> FeatureResult<Option<Layer>>;

    async fn list_layers(&self) -> FeatureResult<Vec<Layer>>;
}

#[async_trait]
pub trait FeatureStore: Send + Sync {
    /// Features whose geometry intersects `bbox`, at most `limit` of them,
    /// in no particular order.
    async fn list_by_bbox(
        &self,
        partition: StoragePartition,
        bbox: &Bbox,
        srid: i32,
        limit: i64,
    ) -> FeatureResult<Vec<FeatureRow>>;

    async fn get_by_id(&self, partition: StoragePartition, id: Uuid) -> FeatureResult<Option<FeatureRow>>;

    /// Insert with a fresh id at version 1.
    async fn create(
        &self,
        partition: StoragePartition,
        geometry: &StorageGeometry,
        properties: &Properties,
    ) -> FeatureResult<FeatureRow>;

    /// Compare-and-swap update. `None` when no row has `id` at
    /// `expected_version`: either it is gone or it moved on.
    async fn update_if_version_matches(
        &self,
        partition: StoragePartition,
        id: Uuid,
        geometry: Option<&StorageGeometry>,
        properties: Option<&Properties>,
        expected_version: i32,
    ) -> FeatureResult<Option<FeatureRow>>;

    /// Compare-and-delete. `false` under the same conditions as above.
    async fn delete_if_version_matches(
        &self,
        partition: StoragePartition,
        id: Uuid,
        expected_version: i32,
    ) -> FeatureResult<bool>;

    async fn get_current_version(&self, partition: StoragePartition, id: Uuid) -> FeatureResult<Option<i32>>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error>;

    async fn create_user(&self, email: &str, role: UserRole) -> Result<User, sqlx::Error>;
}

/// Everything the HTTP layer needs from persistence.
#[async_trait]
pub trait Store: LayerStore + FeatureStore + UserStore {
    /// Round-trip to the backend; used by the db health check.
    async fn ping(&self) -> Result<(), sqlx::Error>;
}
