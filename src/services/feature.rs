//! Feature service
//!
//! Orchestrates one request: layer lookup, partition dispatch, geometry
//! checks, the store call and projection. Holds no state between requests;
//! concurrent writers are arbitrated entirely by the store's
//! compare-and-swap.
//!
//! # Conflict disambiguation
//!
//! A failed compare-and-swap cannot tell "gone" from "stale", so the service
//! re-reads the current version afterwards. The re-read is a separate
//! statement: a delete landing between the two can turn a conflict into a
//! not-found (or the reverse). This race is accepted; either answer tells the
//! client to re-fetch.

use std::sync::Arc;

use uuid::Uuid;

use crate::domain::geometry::{self, GeometryType, StorageGeometry};
use crate::domain::projection::{to_feature_collection_out, to_feature_out};
use crate::domain::registry::resolve_for_layer;
use crate::domain::{Bbox, FeatureError, FeatureResult, StoragePartition};
use crate::models::{
    CreateFeature, DeleteFeatureOut, FeatureCollectionOut, FeatureOut, Layer, UpdateFeature,
};
use crate::store::Store;

pub const DEFAULT_LIMIT: i64 = 500;
pub const MIN_LIMIT: i64 = 1;
pub const MAX_LIMIT: i64 = 5000;

/// `None` -> 500, otherwise clamped into [1, 5000]. Never rejects.
pub fn normalize_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(DEFAULT_LIMIT).clamp(MIN_LIMIT, MAX_LIMIT)
}

#[derive(Clone)]
pub struct FeatureService {
    store: Arc<dyn Store>,
}

impl FeatureService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn list_features(
        &self,
        layer_id: Uuid,
        raw_bbox: Option<&str>,
        raw_limit: Option<i64>,
    ) -> FeatureResult<FeatureCollectionOut> {
        let (layer, partition) = self.resolve_layer(layer_id).await?;
        let raw_bbox =
            raw_bbox.ok_or_else(|| FeatureError::MalformedBbox("bbox is required".to_string()))?;
        let bbox = Bbox::parse(raw_bbox)?;
        let limit = normalize_limit(raw_limit);

        let rows = self
            .store
            .list_by_bbox(partition, &bbox, layer.srid, limit)
            .await?;
        tracing::debug!(%layer_id, %bbox, limit, count = rows.len(), "listed features");

        to_feature_collection_out(rows)
    }

    pub async fn get_feature(&self, layer_id: Uuid, feature_id: Uuid) -> FeatureResult<FeatureOut> {
        let (_, partition) = self.resolve_layer(layer_id).await?;

        let row = self
            .store
            .get_by_id(partition, feature_id)
            .await?
            .ok_or(FeatureError::FeatureNotFound(feature_id))?;

        to_feature_out(row)
    }

    pub async fn create_feature(&self, layer_id: Uuid, req: CreateFeature) -> FeatureResult<FeatureOut> {
        let (layer, partition) = self.resolve_layer(layer_id).await?;
        let encoded = encode_for_layer(&layer, partition, &req.geometry)?;

        let row = self.store.create(partition, &encoded, &req.properties).await?;
        tracing::debug!(%layer_id, feature_id = %row.id, "created feature");

        to_feature_out(row)
    }

    pub async fn update_feature(
        &self,
        layer_id: Uuid,
        feature_id: Uuid,
        req: UpdateFeature,
    ) -> FeatureResult<FeatureOut> {
        if !req.has_changes() {
            return Err(FeatureError::NoChangesSupplied);
        }

        let (layer, partition) = self.resolve_layer(layer_id).await?;
        let encoded = req
            .geometry
            .as_ref()
            .map(|g| encode_for_layer(&layer, partition, g))
            .transpose()?;

        let updated = self
            .store
            .update_if_version_matches(
                partition,
                feature_id,
                encoded.as_ref(),
                req.properties.as_ref(),
                req.version,
            )
            .await?;

        match updated {
            Some(row) => {
                tracing::debug!(%layer_id, %feature_id, version = row.version, "updated feature");
                to_feature_out(row)
            }
            None => Err(self.disambiguate(partition, feature_id, req.version).await),
        }
    }

    pub async fn delete_feature(
        &self,
        layer_id: Uuid,
        feature_id: Uuid,
        expected_version: i32,
    ) -> FeatureResult<DeleteFeatureOut> {
        let (_, partition) = self.resolve_layer(layer_id).await?;

        if self
            .store
            .delete_if_version_matches(partition, feature_id, expected_version)
            .await?
        {
            tracing::debug!(%layer_id, %feature_id, "deleted feature");
            Ok(DeleteFeatureOut::deleted(feature_id))
        } else {
            Err(self.disambiguate(partition, feature_id, expected_version).await)
        }
    }

    async fn resolve_layer(&self, layer_id: Uuid) -> FeatureResult<(Layer, StoragePartition)> {
        let layer = self
            .store
            .find_layer(layer_id)
            .await?
            .ok_or(FeatureError::LayerNotFound(layer_id))?;
        let partition = resolve_for_layer(&layer)?;
        Ok((layer, partition))
    }

    /// Turn a failed compare-and-swap into not-found or a version conflict.
    async fn disambiguate(
        &self,
        partition: StoragePartition,
        feature_id: Uuid,
        request_version: i32,
    ) -> FeatureError {
        match self.store.get_current_version(partition, feature_id).await {
            Ok(None) => FeatureError::FeatureNotFound(feature_id),
            Ok(Some(current_version)) => {
                tracing::info!(
                    %feature_id,
                    request_version,
                    current_version,
                    "version conflict"
                );
                FeatureError::VersionMismatch {
                    feature_id,
                    request_version,
                    current_version,
                }
            }
            Err(e) => e,
        }
    }
}

/// Check the payload's declared type against the layer, then validate and encode.
fn encode_for_layer(
    layer: &Layer,
    partition: StoragePartition,
    payload: &serde_json::Value,
) -> FeatureResult<StorageGeometry> {
    let expected = partition.geometry_type();
    let declared = geometry::declared_type(payload)
        .ok_or_else(|| FeatureError::InvalidGeometry("geometry must have a string 'type'".to_string()))?;

    if GeometryType::from_geojson(declared) != Some(expected) {
        return Err(FeatureError::GeometryTypeMismatch {
            expected: expected.to_string(),
            actual: declared.to_string(),
        });
    }

    let parsed = geometry::parse_payload(payload)?;
    geometry::encode(&parsed, layer.srid)
}
