//! Layer registry: layer storage table -> storage partition
//!
//! The set of partitions is closed. Adding a geometry type means adding a
//! variant here, and the compiler points at every match that must learn it.

use std::fmt;

use super::error::{FeatureError, FeatureResult};
use super::geometry::GeometryType;
use crate::models::Layer;

/// One PostGIS table per geometry type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoragePartition {
    Points,
    Lines,
    Polygons,
    MultiPoints,
    MultiLines,
    MultiPolygons,
}

impl StoragePartition {
    pub const ALL: [StoragePartition; 6] = [
        StoragePartition::Points,
        StoragePartition::Lines,
        StoragePartition::Polygons,
        StoragePartition::MultiPoints,
        StoragePartition::MultiLines,
        StoragePartition::MultiPolygons,
    ];

    /// SQL identifier of the backing table. Only these strings are ever
    /// interpolated into statements.
    pub fn table_name(&self) -> &'static str {
        match self {
            Self::Points => "feature_points",
            Self::Lines => "feature_lines",
            Self::Polygons => "feature_polygons",
            Self::MultiPoints => "feature_multipoints",
            Self::MultiLines => "feature_multilines",
            Self::MultiPolygons => "feature_multipolygons",
        }
    }

    pub fn geometry_type(&self) -> GeometryType {
        match self {
            Self::Points => GeometryType::Point,
            Self::Lines => GeometryType::LineString,
            Self::Polygons => GeometryType::Polygon,
            Self::MultiPoints => GeometryType::MultiPoint,
            Self::MultiLines => GeometryType::MultiLineString,
            Self::MultiPolygons => GeometryType::MultiPolygon,
        }
    }
}

impl fmt::Display for StoragePartition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table_name())
    }
}

/// Look up a partition by table name. Pure; no I/O.
pub fn resolve(storage_table: &str) -> FeatureResult<StoragePartition> {
    StoragePartition::ALL
        .into_iter()
        .find(|p| p.table_name() == storage_table)
        .ok_or_else(|| {
            FeatureError::UnknownStorageMapping(format!("unknown storage table '{}'", storage_table))
        })
}

/// Resolve a layer's partition and check it holds the layer's geometry type.
pub fn resolve_for_layer(layer: &Layer) -> FeatureResult<StoragePartition> {
    let partition = resolve(&layer.storage_table)?;
    let declared: GeometryType = layer.geometry_type.parse()?;

    if partition.geometry_type() != declared {
        return Err(FeatureError::UnknownStorageMapping(format!(
            "layer {} declares {} but table {} stores {}",
            layer.id,
            declared,
            partition,
            partition.geometry_type()
        )));
    }

    Ok(partition)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_every_partition() {
        for partition in StoragePartition::ALL {
            assert_eq!(resolve(partition.table_name()).unwrap(), partition);
        }
    }

    #[test]
    fn test_one_partition_per_geometry_type() {
        for t in GeometryType::ALL {
            let matching = StoragePartition::ALL
                .iter()
                .filter(|p| p.geometry_type() == t)
                .count();
            assert_eq!(matching, 1, "{} should map to exactly one partition", t);
        }
    }

    #[test]
    fn test_resolve_unknown_table() {
        for name in ["feature_circles", "", "FEATURE_POINTS", "layers", "feature_points; DROP TABLE layers"] {
            assert!(matches!(resolve(name), Err(FeatureError::UnknownStorageMapping(_))));
        }
    }

    #[test]
    fn test_resolve_for_layer() {
        let layer = Layer::new("cities", GeometryType::Point, "feature_points");
        assert_eq!(resolve_for_layer(&layer).unwrap(), StoragePartition::Points);

        let mut upper = layer.clone();
        upper.geometry_type = "POINT".to_string();
        assert_eq!(resolve_for_layer(&upper).unwrap(), StoragePartition::Points);
    }

    #[test]
    fn test_resolve_for_layer_type_disagreement() {
        let layer = Layer::new("parcels", GeometryType::Polygon, "feature_points");
        assert!(matches!(
            resolve_for_layer(&layer),
            Err(FeatureError::UnknownStorageMapping(_))
        ));

        let mut bogus = Layer::new("x", GeometryType::Point, "feature_points");
        bogus.geometry_type = "Circle".to_string();
        assert!(matches!(
            resolve_for_layer(&bogus),
            Err(FeatureError::UnknownStorageMapping(_))
        ));
    }
}
