//! In-memory store (for testing)
//!
//! HashMap-backed implementation of every storage port. Each compare-and-swap
//! runs under a single lock acquisition, mirroring the single-statement
//! conditional write of the PostgreSQL adapter. NOT for production use.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use geo::{BoundingRect, Intersects};
use sqlx::types::Json;
use uuid::Uuid;

use super::{FeatureStore, LayerStore, Store, UserStore};
use crate::domain::geometry::{self, Geometry, Position, StorageGeometry};
use crate::domain::{Bbox, FeatureResult, StoragePartition};
use crate::models::{FeatureRow, Layer, Properties, User, UserRole};

#[derive(Debug, Clone)]
struct StoredFeature {
    version: i32,
    properties: Properties,
    geometry_json: String,
    updated_at: DateTime<Utc>,
}

impl StoredFeature {
    fn to_row(&self, id: Uuid) -> FeatureRow {
        FeatureRow {
            id,
            version: self.version,
            properties: Json(self.properties.clone()),
            geometry_json: self.geometry_json.clone(),
        }
    }
}

#[derive(Default)]
pub struct MemoryStore {
    layers: RwLock<HashMap<Uuid, Layer>>,
    features: Mutex<HashMap<(StoragePartition, Uuid), StoredFeature>>,
    users: Mutex<HashMap<String, User>>,
    feature_calls: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_layer(&self, layer: Layer) -> Layer {
        self.layers.write().unwrap().insert(layer.id, layer.clone());
        layer
    }

    /// Insert a row verbatim, bypassing the codec.
    pub fn insert_raw(&self, partition: StoragePartition, version: i32, geometry_json: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.features.lock().unwrap().insert(
            (partition, id),
            StoredFeature {
                version,
                properties: Properties::new(),
                geometry_json: geometry_json.to_string(),
                updated_at: Utc::now(),
            },
        );
        id
    }

    /// Number of feature-store calls made so far.
    pub fn feature_calls(&self) -> usize {
        self.feature_calls.load(Ordering::SeqCst)
    }

    pub fn feature_count(&self, partition: StoragePartition) -> usize {
        self.features
            .lock()
            .unwrap()
            .keys()
            .filter(|(p, _)| *p == partition)
            .count()
    }

    pub fn updated_at(&self, partition: StoragePartition, id: Uuid) -> Option<DateTime<Utc>> {
        self.features
            .lock()
            .unwrap()
            .get(&(partition, id))
            .map(|f| f.updated_at)
    }

    fn touch(&self) {
        self.feature_calls.fetch_add(1, Ordering::SeqCst);
    }
}

fn to_geo(g: &Geometry) -> geo::Geometry<f64> {
    fn line(ps: &[Position]) -> geo::LineString<f64> {
        ps.iter().map(|p| (p.lon(), p.lat())).collect()
    }
    fn polygon(rings: &[Vec<Position>]) -> geo::Polygon<f64> {
        let exterior = rings.first().map(|r| line(r)).unwrap_or_else(|| geo::LineString::new(vec![]));
        let interiors = rings.iter().skip(1).map(|r| line(r)).collect();
        geo::Polygon::new(exterior, interiors)
    }

    match g {
        Geometry::Point(p) => geo::Point::new(p.lon(), p.lat()).into(),
        Geometry::LineString(ps) => line(ps).into(),
        Geometry::Polygon(rings) => polygon(rings).into(),
        Geometry::MultiPoint(ps) => {
            geo::MultiPoint::new(ps.iter().map(|p| geo::Point::new(p.lon(), p.lat())).collect()).into()
        }
        Geometry::MultiLineString(ls) => geo::MultiLineString::new(ls.iter().map(|l| line(l)).collect()).into(),
        Geometry::MultiPolygon(ps) => geo::MultiPolygon::new(ps.iter().map(|p| polygon(p)).collect()).into(),
    }
}

/// Envelope pre-filter followed by the exact predicate, like `&&` + `ST_Intersects`.
/// Undecodable rows are kept so the projector reports them.
fn intersects(geometry_json: &str, bbox: &Bbox) -> bool {
    let Ok(decoded) = geometry::decode(geometry_json) else {
        return true;
    };
    let shape = to_geo(&decoded);
    let query = geo::Rect::new(
        geo::coord! { x: bbox.min_lon, y: bbox.min_lat },
        geo::coord! { x: bbox.max_lon, y: bbox.max_lat },
    );

    if let Some(envelope) = shape.bounding_rect() {
        if !envelope.intersects(&query) {
            return false;
        }
    }

    shape.intersects(&geo::Geometry::Rect(query))
}

#[async_trait]
impl LayerStore for MemoryStore {
    async fn find_layer(&self, id: Uuid) -> FeatureResult<Option<Layer>> {
        Ok(self.layers.read().unwrap().get(&id).cloned())
    }

    async fn list_layers(&self) -> FeatureResult<Vec<Layer>> {
        let mut layers: Vec<Layer> = self.layers.read().unwrap().values().cloned().collect();
        layers.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(layers)
    }
}

#[async_trait]
impl FeatureStore for MemoryStore {
    async fn list_by_bbox(
        &self,
        partition: StoragePartition,
        bbox: &Bbox,
        _srid: i32,
        limit: i64,
    ) -> FeatureResult<Vec<FeatureRow>> {
        self.touch();
        let features = self.features.lock().unwrap();
        Ok(features
            .iter()
            .filter(|((p, _), f)| *p == partition && intersects(&f.geometry_json, bbox))
            .take(usize::try_from(limit).unwrap_or(0))
            .map(|((_, id), f)| f.to_row(*id))
            .collect())
    }

    async fn get_by_id(&self, partition: StoragePartition, id: Uuid) -> FeatureResult<Option<FeatureRow>> {
        self.touch();
        Ok(self
            .features
            .lock()
            .unwrap()
            .get(&(partition, id))
            .map(|f| f.to_row(id)))
    }

    async fn create(
        &self,
        partition: StoragePartition,
        geometry: &StorageGeometry,
        properties: &Properties,
    ) -> FeatureResult<FeatureRow> {
        self.touch();
        let id = Uuid::new_v4();
        let stored = StoredFeature {
            version: 1,
            properties: properties.clone(),
            geometry_json: geometry.geojson.clone(),
            updated_at: Utc::now(),
        };
        let row = stored.to_row(id);
        self.features.lock().unwrap().insert((partition, id), stored);
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
        self.touch();
        let mut features = self.features.lock().unwrap();
        let Some(stored) = features.get_mut(&(partition, id)) else {
            return Ok(None);
        };
        if stored.version != expected_version {
            return Ok(None);
        }

        if let Some(g) = geometry {
            stored.geometry_json = g.geojson.clone();
        }
        if let Some(p) = properties {
            stored.properties = p.clone();
        }
        stored.version += 1;
        stored.updated_at = Utc::now();
        Ok(Some(stored.to_row(id)))
    }

    async fn delete_if_version_matches(
        &self,
        partition: StoragePartition,
        id: Uuid,
        expected_version: i32,
    ) -> FeatureResult<bool> {
        self.touch();
        let mut features = self.features.lock().unwrap();
        match features.get(&(partition, id)) {
            Some(stored) if stored.version == expected_version => {
                features.remove(&(partition, id));
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn get_current_version(&self, partition: StoragePartition, id: Uuid) -> FeatureResult<Option<i32>> {
        self.touch();
        Ok(self
            .features
            .lock()
            .unwrap()
            .get(&(partition, id))
            .map(|f| f.version))
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error> {
        Ok(self.users.lock().unwrap().get(email).cloned())
    }

    async fn create_user(&self, email: &str, role: UserRole) -> Result<User, sqlx::Error> {
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: None,
            role: role.as_str().to_string(),
            created_at: Utc::now(),
        };
        self.users.lock().unwrap().insert(email.to_string(), user.clone());
        Ok(user)
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), sqlx::Error> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::geometry::{encode, DEFAULT_SRID};

    fn polygon_store(store: &MemoryStore, ring: Vec<(f64, f64)>) -> Uuid {
        let g = Geometry::Polygon(vec![ring.into_iter().map(|(x, y)| Position(x, y)).collect()]);
        let encoded = encode(&g, DEFAULT_SRID).unwrap();
        store.insert_raw(StoragePartition::Polygons, 1, &encoded.geojson)
    }

    #[tokio::test]
    async fn test_bbox_uses_exact_predicate() {
        let store = MemoryStore::new();
        // Thin diagonal triangle: its envelope overlaps the query box, the shape does not
        let diagonal = polygon_store(
            &store,
            vec![(0.0, 0.0), (10.0, 10.0), (10.0, 9.5), (0.0, 0.0)],
        );
        let inside = polygon_store(
            &store,
            vec![(1.0, 7.0), (2.0, 7.0), (2.0, 8.0), (1.0, 7.0)],
        );

        let bbox = Bbox::parse("0.5,6,3,9").unwrap();
        let rows = store
            .list_by_bbox(StoragePartition::Polygons, &bbox, DEFAULT_SRID, 100)
            .await
            .unwrap();
        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        assert!(ids.contains(&inside));
        assert!(!ids.contains(&diagonal));
    }

    #[tokio::test]
    async fn test_bbox_respects_limit_and_partition() {
        let store = MemoryStore::new();
        for _ in 0..5 {
            store.insert_raw(StoragePartition::Points, 1, r#"{"type":"Point","coordinates":[1,1]}"#);
        }
        store.insert_raw(StoragePartition::MultiPoints, 1, r#"{"type":"MultiPoint","coordinates":[[1,1]]}"#);

        let bbox = Bbox::parse("0,0,2,2").unwrap();
        let rows = store
            .list_by_bbox(StoragePartition::Points, &bbox, DEFAULT_SRID, 3)
            .await
            .unwrap();
        assert_eq!(rows.len(), 3);

        let rows = store
            .list_by_bbox(StoragePartition::MultiPoints, &bbox, DEFAULT_SRID, 10)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn test_cas_update_and_delete() {
        let store = MemoryStore::new();
        let id = store.insert_raw(StoragePartition::Points, 1, r#"{"type":"Point","coordinates":[1,1]}"#);
        let mut props = Properties::new();
        props.insert("k".into(), serde_json::json!("v"));

        let stale = store
            .update_if_version_matches(StoragePartition::Points, id, None, Some(&props), 2)
            .await
            .unwrap();
        assert!(stale.is_none());

        let row = store
            .update_if_version_matches(StoragePartition::Points, id, None, Some(&props), 1)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.version, 2);
        assert_eq!(row.properties.0, props);

        assert!(!store.delete_if_version_matches(StoragePartition::Points, id, 1).await.unwrap());
        assert!(store.delete_if_version_matches(StoragePartition::Points, id, 2).await.unwrap());
        assert_eq!(store.get_current_version(StoragePartition::Points, id).await.unwrap(), None);
    }
}
