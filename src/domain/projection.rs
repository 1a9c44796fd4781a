//! Row -> Feature / FeatureCollection projection

use super::error::{FeatureError, FeatureResult};
use super::geometry;
use crate::models::{FeatureCollectionOut, FeatureOut, FeatureRow};

pub fn to_feature_out(row: FeatureRow) -> FeatureResult<FeatureOut> {
    let geometry = geometry::decode(&row.geometry_json).map_err(|e| match e {
        FeatureError::CorruptStoredGeometry(reason) => {
            FeatureError::CorruptStoredGeometry(format!("feature {}: {}", row.id, reason))
        }
        other => other,
    })?;

    Ok(FeatureOut {
        id: row.id,
        kind: "Feature",
        version: row.version,
        geometry,
        properties: row.properties.0,
    })
}

/// Fails on the first corrupt row rather than silently dropping it.
pub fn to_feature_collection_out(rows: Vec<FeatureRow>) -> FeatureResult<FeatureCollectionOut> {
    let features = rows
        .into_iter()
        .map(to_feature_out)
        .collect::<FeatureResult<Vec<_>>>()?;

    Ok(FeatureCollectionOut {
        kind: "FeatureCollection",
        features,
    })
}
