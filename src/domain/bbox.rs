//! Bounding box query parameter

use std::fmt;

use super::error::{FeatureError, FeatureResult};

const MIN_LON: f64 = -180.0;
const MAX_LON: f64 = 180.0;
const MIN_LAT: f64 = -90.0;
const MAX_LAT: f64 = 90.0;

/// Axis-aligned lon/lat rectangle with strictly positive extent on both axes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bbox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl Bbox {
    /// Parse `"minLon,minLat,maxLon,maxLat"`.
    pub fn parse(raw: &str) -> FeatureResult<Self> {
        let tokens: Vec<&str> = raw.split(',').collect();
        if tokens.len() != 4 {
            return Err(malformed("bbox must contain exactly 4 numbers"));
        }

        let mut values = [0.0_f64; 4];
        for (slot, token) in values.iter_mut().zip(&tokens) {
            *slot = token
                .trim()
                .parse::<f64>()
                .map_err(|_| malformed("bbox must contain exactly 4 numbers"))?;
        }
        let [min_lon, min_lat, max_lon, max_lat] = values;

        // NaN fails every range comparison below
        if !in_range(min_lon, MIN_LON, MAX_LON) || !in_range(max_lon, MIN_LON, MAX_LON) {
            return Err(malformed("longitude must be between -180 and 180"));
        }
        if !in_range(min_lat, MIN_LAT, MAX_LAT) || !in_range(max_lat, MIN_LAT, MAX_LAT) {
            return Err(malformed("latitude must be between -90 and 90"));
        }
        if min_lat >= max_lat {
            return Err(malformed("minimum latitude must be less than maximum latitude"));
        }
        if min_lon >= max_lon {
            return Err(malformed("minimum longitude must be less than maximum longitude"));
        }

        Ok(Self { min_lon, min_lat, max_lon, max_lat })
    }
}

impl fmt::Display for Bbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{},{}", self.min_lon, self.min_lat, self.max_lon, self.max_lat)
    }
}

fn in_range(value: f64, min: f64, max: f64) -> bool {
    min <= value && value <= max
}

fn malformed(msg: &str) -> FeatureError {
    FeatureError::MalformedBbox(msg.to_string())
}
