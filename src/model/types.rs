//! Domain types shared by the gateway, the engine and the UI.

use serde::{Deserialize, Deserializer, Serialize};

use crate::model::geo::LatLon;

/// A customer-facing network termination unit (ONT).
///
/// Created and updated exclusively by the backend; the client only requests
/// position or association changes and re-queries for the authoritative
/// state.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Ont {
    #[serde(alias = "ont_id", deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub vendor_ont_id: String,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub cto_uuid: Option<String>,
    #[serde(default, deserialize_with = "string_or_number_opt")]
    pub olt_id: Option<String>,
    #[serde(default)]
    pub olt_name: Option<String>,
    #[serde(default, deserialize_with = "string_or_number_opt")]
    pub pon_id: Option<String>,
    #[serde(default)]
    pub pon_name: Option<String>,
    pub serial: Option<String>,
    pub description: Option<String>,
}

impl Ont {
    /// A position exists only when both coordinates do. A record carrying
    /// exactly one of them is treated as unplaced.
    pub fn position(&self) -> Option<LatLon> {
        match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => Some(LatLon::new(lat, lon)),
            _ => None,
        }
    }

    /// Derived, never stored: recomputed from whatever the last fetch said.
    pub fn is_unplaced(&self) -> bool {
        self.position().is_none()
    }

    /// Label shown in lists: vendor id, falling back to serial, then id.
    pub fn display_label(&self) -> &str {
        if !self.vendor_ont_id.is_empty() {
            &self.vendor_ont_id
        } else if let Some(serial) = self.serial.as_deref() {
            serial
        } else {
            &self.id
        }
    }
}

/// A fixed fiber distribution point (CTO). Read-only on this side.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Cto {
    pub uuid: String,
    pub name: String,
    pub position: LatLon,
}

/// An access node (OLT).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Olt {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub name: String,
}

/// A port (PON) under an access node.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Pon {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub name: String,
}

/// One access node in the unplaced-endpoint backlog, with server-computed
/// counts per port.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct BacklogGroup {
    #[serde(deserialize_with = "string_or_number")]
    pub olt_id: String,
    pub olt_name: String,
    pub count: u64,
    #[serde(default)]
    pub pons: Vec<BacklogPon>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct BacklogPon {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub name: String,
    pub count: u64,
}

/// Result of a bulk CSV import.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ImportSummary {
    pub processed: u64,
    pub inserted: u64,
    pub updated: u64,
    pub skipped: u64,
    #[serde(default)]
    pub errors: Vec<serde_json::Value>,
}

impl ImportSummary {
    pub fn summary_line(&self) -> String {
        format!(
            "import: processed {} / inserted {} / updated {} / skipped {} / errors {}",
            self.processed,
            self.inserted,
            self.updated,
            self.skipped,
            self.errors.len()
        )
    }
}

/// The backend is inconsistent about id types (numeric in the database,
/// string in query params); accept either and keep a string client-side.
fn string_or_number<'de, D>(de: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        S(String),
        N(i64),
    }
    Ok(match Raw::deserialize(de)? {
        Raw::S(s) => s,
        Raw::N(n) => n.to_string(),
    })
}

fn string_or_number_opt<'de, D>(de: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        S(String),
        N(i64),
    }
    Ok(match Option::<Raw>::deserialize(de)? {
        Some(Raw::S(s)) => Some(s),
        Some(Raw::N(n)) => Some(n.to_string()),
        None => None,
    })
}
