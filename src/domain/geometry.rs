//! Geometry codec
//!
//! Converts between GeoJSON-shaped geometry values and the form handed to
//! PostGIS (`ST_SetSRID(ST_GeomFromGeoJSON(..), srid)`), and back from
//! `ST_AsGeoJSON` output.
//!
//! Only the six simple geometry types are supported; `GeometryCollection`
//! has no storage partition and is rejected.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::{FeatureError, FeatureResult};

/// Default spatial reference: WGS 84 lon/lat.
pub const DEFAULT_SRID: i32 = 4326;

/// Geometry type discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GeometryType {
    Point,
    LineString,
    Polygon,
    MultiPoint,
    MultiLineString,
    MultiPolygon,
}

impl GeometryType {
    pub const ALL: [GeometryType; 6] = [
        GeometryType::Point,
        GeometryType::LineString,
        GeometryType::Polygon,
        GeometryType::MultiPoint,
        GeometryType::MultiLineString,
        GeometryType::MultiPolygon,
    ];

    /// GeoJSON spelling, also used as the PostGIS column type name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Point => "Point",
            Self::LineString => "LineString",
            Self::Polygon => "Polygon",
            Self::MultiPoint => "MultiPoint",
            Self::MultiLineString => "MultiLineString",
            Self::MultiPolygon => "MultiPolygon",
        }
    }

    /// Exact GeoJSON member name, as sent by clients (case-sensitive).
    pub fn from_geojson(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == name)
    }
}

impl fmt::Display for GeometryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Layer metadata may carry the PostGIS upper-case spelling (`POINT`),
/// so this parse is case-insensitive.
impl FromStr for GeometryType {
    type Err = FeatureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| FeatureError::UnknownStorageMapping(format!("unknown geometry type '{}'", s)))
    }
}

/// A `[lon, lat]` pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position(pub f64, pub f64);

impl Position {
    pub fn lon(&self) -> f64 {
        self.0
    }

    pub fn lat(&self) -> f64 {
        self.1
    }
}

/// Typed geometry, serialized as `{"type": ..., "coordinates": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    Point(Position),
    LineString(Vec<Position>),
    Polygon(Vec<Vec<Position>>),
    MultiPoint(Vec<Position>),
    MultiLineString(Vec<Vec<Position>>),
    MultiPolygon(Vec<Vec<Vec<Position>>>),
}

impl Geometry {
    pub fn geometry_type(&self) -> GeometryType {
        match self {
            Geometry::Point(_) => GeometryType::Point,
            Geometry::LineString(_) => GeometryType::LineString,
            Geometry::Polygon(_) => GeometryType::Polygon,
            Geometry::MultiPoint(_) => GeometryType::MultiPoint,
            Geometry::MultiLineString(_) => GeometryType::MultiLineString,
            Geometry::MultiPolygon(_) => GeometryType::MultiPolygon,
        }
    }

    /// Coordinate range and minimal shape checks. No topology validation.
    pub fn validate(&self) -> FeatureResult<()> {
        match self {
            Geometry::Point(p) => validate_position(p),
            Geometry::MultiPoint(points) => {
                if points.is_empty() {
                    return Err(invalid("MultiPoint must contain at least one position"));
                }
                points.iter().try_for_each(validate_position)
            }
            Geometry::LineString(line) => validate_line(line),
            Geometry::MultiLineString(lines) => {
                if lines.is_empty() {
                    return Err(invalid("MultiLineString must contain at least one line"));
                }
                lines.iter().try_for_each(|l| validate_line(l))
            }
            Geometry::Polygon(rings) => validate_polygon(rings),
            Geometry::MultiPolygon(polygons) => {
                if polygons.is_empty() {
                    return Err(invalid("MultiPolygon must contain at least one polygon"));
                }
                polygons.iter().try_for_each(|p| validate_polygon(p))
            }
        }
    }
}

/// Geometry ready to be bound into an insert/update statement.
#[derive(Debug, Clone, PartialEq)]
pub struct StorageGeometry {
    pub geojson: String,
    pub srid: i32,
}

/// Serialize a validated geometry and stamp it with `srid`.
pub fn encode(geometry: &Geometry, srid: i32) -> FeatureResult<StorageGeometry> {
    let geojson = serde_json::to_string(geometry)
        .map_err(|e| FeatureError::InvalidGeometry(e.to_string()))?;
    Ok(StorageGeometry { geojson, srid })
}

/// Parse `ST_AsGeoJSON` output back into a typed geometry.
pub fn decode(stored: &str) -> FeatureResult<Geometry> {
    serde_json::from_str(stored).map_err(|e| FeatureError::CorruptStoredGeometry(e.to_string()))
}

/// The `"type"` member of a raw payload, if it is a string.
pub fn declared_type(payload: &Value) -> Option<&str> {
    payload.get("type").and_then(Value::as_str)
}

/// Turn a request payload into a validated geometry.
pub fn parse_payload(payload: &Value) -> FeatureResult<Geometry> {
    let geometry: Geometry = serde_json::from_value(payload.clone())
        .map_err(|e| FeatureError::InvalidGeometry(e.to_string()))?;
    geometry.validate()?;
    Ok(geometry)
}

fn validate_position(p: &Position) -> FeatureResult<()> {
    if !(p.lon().is_finite() && (-180.0..=180.0).contains(&p.lon())) {
        return Err(invalid("longitude must be between -180 and 180"));
    }
    if !(p.lat().is_finite() && (-90.0..=90.0).contains(&p.lat())) {
        return Err(invalid("latitude must be between -90 and 90"));
    }
    Ok(())
}

fn validate_line(line: &[Position]) -> FeatureResult<()> {
    if line.len() < 2 {
        return Err(invalid("LineString must contain at least 2 positions"));
    }
    line.iter().try_for_each(validate_position)
}

fn validate_polygon(rings: &[Vec<Position>]) -> FeatureResult<()> {
    let Some(outer) = rings.first() else {
        return Err(invalid("Polygon must have at least one (outer) ring"));
    };
    if outer.len() < 4 {
        return Err(invalid("outer ring must contain at least 4 positions"));
    }
    rings.iter().flatten().try_for_each(validate_position)
}

fn invalid(msg: &str) -> FeatureError {
    FeatureError::InvalidGeometry(msg.to_string())
}
