//! Typed adapter over the backend HTTP surface.
//!
//! The trait exists so the engine can be driven by a scripted in-memory
//! gateway in tests; [`http::HttpGateway`] is the real implementation.
//! No retry or caching logic lives here.

pub mod http;

use async_trait::async_trait;
use thiserror::Error;

use crate::model::{BBox, BacklogGroup, Cto, ImportSummary, Olt, Ont, Pon};

/// Failure taxonomy for a single backend call. Transport failures and
/// non-2xx statuses are distinct; unexpected body shapes get their own
/// variant so the caller can log what actually arrived.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("request to {path} failed: {detail}")]
    Transport { path: String, detail: String },
    #[error("{path} returned {status} {status_text}")]
    Status {
        path: String,
        status: u16,
        status_text: String,
    },
    #[error("unexpected response from {path}: {detail}")]
    Shape { path: String, detail: String },
}

pub type GatewayResult<T> = Result<T, GatewayError>;

/// Parameters for the paged endpoint searches. `only_unlocated` narrows to
/// endpoints without a stored position.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SearchParams {
    pub query: String,
    pub olt_id: Option<String>,
    pub pon_id: Option<String>,
    pub only_unlocated: bool,
    pub limit: usize,
    pub offset: usize,
}

/// A position-or-association change request. Only the populated parts are
/// sent; `cto_uuid: Some(None)` serializes an explicit JSON `null`, which
/// the backend reads as "disassociate".
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OntPatch {
    pub position: Option<(f64, f64)>,
    pub cto_uuid: Option<Option<String>>,
}

impl OntPatch {
    pub fn position(lat: f64, lon: f64) -> Self {
        Self {
            position: Some((lat, lon)),
            cto_uuid: None,
        }
    }

    pub fn associate(uuid: &str) -> Self {
        Self {
            position: None,
            cto_uuid: Some(Some(uuid.to_string())),
        }
    }

    pub fn disassociate() -> Self {
        Self {
            position: None,
            cto_uuid: Some(None),
        }
    }

    pub fn to_body(&self) -> serde_json::Value {
        let mut body = serde_json::Map::new();
        if let Some((lat, lon)) = self.position {
            body.insert("lat".into(), lat.into());
            body.insert("lon".into(), lon.into());
        }
        if let Some(cto) = &self.cto_uuid {
            body.insert(
                "cto_uuid".into(),
                match cto {
                    Some(uuid) => serde_json::Value::String(uuid.clone()),
                    None => serde_json::Value::Null,
                },
            );
        }
        serde_json::Value::Object(body)
    }
}

/// The fixed backend endpoint set. All list results treat a missing or
/// null `items` array as empty, never as an error.
#[async_trait(?Send)]
pub trait Gateway {
    /// `GET /ctos/geojson` — the full aggregation-point set.
    async fn cto_layer(&self) -> GatewayResult<Vec<Cto>>;

    /// `GET /ui/olts`
    async fn list_olts(&self) -> GatewayResult<Vec<Olt>>;

    /// `GET /ui/olts/{olt_id}/pons`
    async fn list_pons(&self, olt_id: &str) -> GatewayResult<Vec<Pon>>;

    /// `GET /ui/onts/geo` — geo-tagged endpoints inside a viewport,
    /// constrained to one (OLT, PON) pair.
    async fn onts_in_viewport(
        &self,
        bbox: &BBox,
        olt_id: &str,
        pon_id: &str,
    ) -> GatewayResult<Vec<Ont>>;

    /// `GET /ui/onts` — one page of unplaced endpoints for a group.
    async fn unplaced_page(
        &self,
        olt_id: &str,
        pon_id: &str,
        limit: usize,
        offset: usize,
    ) -> GatewayResult<Vec<Ont>>;

    /// `GET /ui/unlocated/groups` — backlog tree with counts.
    async fn backlog_groups(&self) -> GatewayResult<Vec<BacklogGroup>>;

    /// `GET /ui/onts/search` — free-text endpoint search.
    async fn search_onts(&self, params: &SearchParams) -> GatewayResult<Vec<Ont>>;

    /// `PATCH /onts/{id}`. The updated-endpoint response body is ignored;
    /// callers re-query rather than trust an optimistic echo.
    async fn patch_ont(&self, id: &str, patch: &OntPatch) -> GatewayResult<()>;

    /// `GET /onts/csv`
    async fn export_csv(&self) -> GatewayResult<Vec<u8>>;

    /// `POST /onts/csv/import`
    async fn import_csv(&self, filename: &str, bytes: Vec<u8>) -> GatewayResult<ImportSummary>;
}
