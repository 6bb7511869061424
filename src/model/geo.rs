//! Minimal GeoJSON shapes for the two geo endpoints.
//!
//! Only point features are expected; anything else deserializes but is
//! skipped by the callers.

use serde::{Deserialize, Serialize};

/// A geographic position. GeoJSON coordinates arrive as `[lon, lat]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl LatLon {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// A geographic bounding box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl BBox {
    /// Query-parameter form, `minLon,minLat,maxLon,maxLat` — the envelope
    /// order the backend expects.
    pub fn to_query(&self) -> String {
        format!(
            "{},{},{},{}",
            self.min_lon, self.min_lat, self.max_lon, self.max_lat
        )
    }

    pub fn contains(&self, pos: LatLon) -> bool {
        pos.lon >= self.min_lon
            && pos.lon <= self.max_lon
            && pos.lat >= self.min_lat
            && pos.lat <= self.max_lat
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct FeatureCollection {
    #[serde(default)]
    pub features: Vec<Feature>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Feature {
    pub geometry: Option<Geometry>,
    #[serde(default)]
    pub properties: serde_json::Value,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    Point {
        /// `[lon, lat]` per the GeoJSON spec.
        coordinates: Vec<f64>,
    },
    #[serde(other)]
    Other,
}

impl Feature {
    /// Extracts the point position, if the feature carries a well-formed one.
    pub fn position(&self) -> Option<LatLon> {
        match &self.geometry {
            Some(Geometry::Point { coordinates }) if coordinates.len() >= 2 => {
                Some(LatLon::new(coordinates[1], coordinates[0]))
            }
            _ => None,
        }
    }

    /// String property lookup that tolerates missing or non-string values.
    pub fn prop_str(&self, key: &str) -> Option<String> {
        let v = self.properties.get(key)?;
        match v {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}
