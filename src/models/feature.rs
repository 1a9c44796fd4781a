//! Feature rows and request/response shapes

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::domain::geometry::Geometry;

/// Arbitrary JSON property bag attached to a feature.
pub type Properties = Map<String, Value>;

/// Canonical projection of a partition row, geometry still as `ST_AsGeoJSON` text.
#[derive(Debug, Clone, FromRow)]
pub struct FeatureRow {
    pub id: Uuid,
    pub version: i32,
    pub properties: Json<Properties>,
    pub geometry_json: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureOut {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub version: i32,
    pub geometry: Geometry,
    pub properties: Properties,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureCollectionOut {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub features: Vec<FeatureOut>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PatchFeatureOut {
    pub feature: FeatureOut,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteFeatureOut {
    pub status: &'static str,
    pub feature_id: Uuid,
}

impl DeleteFeatureOut {
    pub fn deleted(feature_id: Uuid) -> Self {
        Self { status: "deleted", feature_id }
    }
}

/// `POST /layers/:id/features` body. Geometry stays raw until the
/// service has compared its declared type with the layer's.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateFeature {
    pub geometry: Value,
    #[serde(default)]
    pub properties: Properties,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct UpdateFeature {
    #[validate(range(min = 1, message = "version must be >= 1"))]
    pub version: i32,
    #[serde(default)]
    pub geometry: Option<Value>,
    #[serde(default)]
    pub properties: Option<Properties>,
}

impl UpdateFeature {
    pub fn has_changes(&self) -> bool {
        self.geometry.is_some() || self.properties.is_some()
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct DeleteFeature {
    #[validate(range(min = 1, message = "version must be >= 1"))]
    pub version: i32,
}

#[derive(Debug, Deserialize)]
pub struct ListFeaturesQuery {
    pub bbox: Option<String>,
    /// Raw text; the handler saturates out-of-range integers
    pub limit: Option<String>,
}
