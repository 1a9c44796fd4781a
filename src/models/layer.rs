//! Layer model

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

/// Layers are seeded out of band; the server only reads them.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Layer {
    pub id: Uuid,
    pub name: String,
    pub title: String,
    pub geometry_type: String,
    pub srid: i32,
    pub storage_table: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerOut {
    pub id: Uuid,
    pub name: String,
    pub title: String,
    pub geometry_type: String,
    pub srid: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct LayerListOut {
    pub layers: Vec<LayerOut>,
}

impl Layer {
    #[cfg(test)]
    pub fn new(
        name: &str,
        geometry_type: crate::domain::geometry::GeometryType,
        storage_table: &str,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            title: name.to_string(),
            geometry_type: geometry_type.as_str().to_string(),
            srid: crate::domain::geometry::DEFAULT_SRID,
            storage_table: storage_table.to_string(),
        }
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Layer>(
            "SELECT id, name, title, geometry_type, srid, storage_table FROM layers WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn list(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Layer>(
            "SELECT id, name, title, geometry_type, srid, storage_table FROM layers ORDER BY name",
        )
        .fetch_all(pool)
        .await
    }

    pub fn to_out(&self) -> LayerOut {
        LayerOut {
            id: self.id,
            name: self.name.clone(),
            title: self.title.clone(),
            geometry_type: self.geometry_type.clone(),
            srid: self.srid,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::geometry::GeometryType;

    #[test]
    fn test_layer_out_is_camel_case() {
        let layer = Layer::new("roads", GeometryType::LineString, "feature_lines");
        let json = serde_json::to_value(layer.to_out()).unwrap();
        assert_eq!(json["geometryType"], "LineString");
        assert_eq!(json["srid"], 4326);
        assert!(json.get("storage_table").is_none());
    }
}
