//! Scripted in-memory gateway for driving the engine in tests.
//!
//! Every call is recorded as a compact log line so tests can assert on
//! exactly which requests a flow produced, in order. Any operation can be
//! made to fail with a scripted 500.

// Not every test binary uses every helper.
#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use async_trait::async_trait;

use ont_console::gateway::{Gateway, GatewayError, GatewayResult, OntPatch, SearchParams};
use ont_console::model::{BBox, BacklogGroup, BacklogPon, Cto, ImportSummary, LatLon, Olt, Ont, Pon};

#[derive(Default)]
pub struct GatewayScript {
    pub ctos: Vec<Cto>,
    pub olts: Vec<Olt>,
    pub pons: Vec<Pon>,
    pub groups: Vec<BacklogGroup>,
    /// Endpoints returned for any viewport query.
    pub geo: Vec<Ont>,
    /// Full unplaced listing per (olt, pon); pages are sliced from it.
    pub unplaced: HashMap<(String, String), Vec<Ont>>,
    pub search_hits: Vec<Ont>,
    pub import_summary: ImportSummary,
    /// Operation names that should fail: "ctos", "olts", "pons", "geo",
    /// "page", "groups", "search", "patch", "export", "import".
    pub fail: HashSet<&'static str>,
    pub log: Vec<String>,
}

impl GatewayScript {
    pub fn calls_matching(&self, needle: &str) -> usize {
        self.log.iter().filter(|l| l.contains(needle)).count()
    }
}

pub struct ScriptedGateway {
    script: Rc<RefCell<GatewayScript>>,
}

impl ScriptedGateway {
    pub fn new(script: GatewayScript) -> (Self, Rc<RefCell<GatewayScript>>) {
        let shared = Rc::new(RefCell::new(script));
        (
            Self {
                script: Rc::clone(&shared),
            },
            shared,
        )
    }

    fn check(&self, op: &'static str, path: &str) -> GatewayResult<()> {
        if self.script.borrow().fail.contains(op) {
            return Err(GatewayError::Status {
                path: path.to_string(),
                status: 500,
                status_text: "Internal Server Error".to_string(),
            });
        }
        Ok(())
    }

    fn record(&self, line: String) {
        self.script.borrow_mut().log.push(line);
    }
}

#[async_trait(?Send)]
impl Gateway for ScriptedGateway {
    async fn cto_layer(&self) -> GatewayResult<Vec<Cto>> {
        self.record("GET /ctos/geojson".into());
        self.check("ctos", "/ctos/geojson")?;
        Ok(self.script.borrow().ctos.clone())
    }

    async fn list_olts(&self) -> GatewayResult<Vec<Olt>> {
        self.record("GET /ui/olts".into());
        self.check("olts", "/ui/olts")?;
        Ok(self.script.borrow().olts.clone())
    }

    async fn list_pons(&self, olt_id: &str) -> GatewayResult<Vec<Pon>> {
        self.record(format!("GET /ui/olts/{olt_id}/pons"));
        self.check("pons", "/ui/olts/pons")?;
        Ok(self.script.borrow().pons.clone())
    }

    async fn onts_in_viewport(
        &self,
        bbox: &BBox,
        olt_id: &str,
        pon_id: &str,
    ) -> GatewayResult<Vec<Ont>> {
        self.record(format!(
            "GET /ui/onts/geo bbox={} olt={olt_id} pon={pon_id}",
            bbox.to_query()
        ));
        self.check("geo", "/ui/onts/geo")?;
        Ok(self.script.borrow().geo.clone())
    }

    async fn unplaced_page(
        &self,
        olt_id: &str,
        pon_id: &str,
        limit: usize,
        offset: usize,
    ) -> GatewayResult<Vec<Ont>> {
        self.record(format!(
            "GET /ui/onts olt={olt_id} pon={pon_id} limit={limit} offset={offset}"
        ));
        self.check("page", "/ui/onts")?;
        let script = self.script.borrow();
        let all = script
            .unplaced
            .get(&(olt_id.to_string(), pon_id.to_string()))
            .cloned()
            .unwrap_or_default();
        Ok(all.into_iter().skip(offset).take(limit).collect())
    }

    async fn backlog_groups(&self) -> GatewayResult<Vec<BacklogGroup>> {
        self.record("GET /ui/unlocated/groups".into());
        self.check("groups", "/ui/unlocated/groups")?;
        Ok(self.script.borrow().groups.clone())
    }

    async fn search_onts(&self, params: &SearchParams) -> GatewayResult<Vec<Ont>> {
        self.record(format!("GET /ui/onts/search q={}", params.query));
        self.check("search", "/ui/onts/search")?;
        Ok(self.script.borrow().search_hits.clone())
    }

    async fn patch_ont(&self, id: &str, patch: &OntPatch) -> GatewayResult<()> {
        self.record(format!("PATCH /onts/{id} {}", patch.to_body()));
        self.check("patch", "/onts")?;
        Ok(())
    }

    async fn export_csv(&self) -> GatewayResult<Vec<u8>> {
        self.record("GET /onts/csv".into());
        self.check("export", "/onts/csv")?;
        Ok(b"id,lat,lon\n".to_vec())
    }

    async fn import_csv(&self, filename: &str, _bytes: Vec<u8>) -> GatewayResult<ImportSummary> {
        self.record(format!("POST /onts/csv/import {filename}"));
        self.check("import", "/onts/csv/import")?;
        Ok(self.script.borrow().import_summary.clone())
    }
}

// ── fixture helpers ─────────────────────────────────────────────────────

pub fn unplaced_ont(id: &str, olt: &str, pon: &str) -> Ont {
    Ont {
        id: id.to_string(),
        vendor_ont_id: format!("V-{id}"),
        olt_id: Some(olt.to_string()),
        pon_id: Some(pon.to_string()),
        ..Ont::default()
    }
}

pub fn placed_ont(id: &str, olt: &str, pon: &str, lat: f64, lon: f64) -> Ont {
    Ont {
        lat: Some(lat),
        lon: Some(lon),
        ..unplaced_ont(id, olt, pon)
    }
}

pub fn cto(uuid: &str, name: &str, lat: f64, lon: f64) -> Cto {
    Cto {
        uuid: uuid.to_string(),
        name: name.to_string(),
        position: LatLon::new(lat, lon),
    }
}

pub fn group(olt_id: &str, olt_name: &str, pons: &[(&str, &str, u64)]) -> BacklogGroup {
    BacklogGroup {
        olt_id: olt_id.to_string(),
        olt_name: olt_name.to_string(),
        count: pons.iter().map(|(_, _, c)| c).sum(),
        pons: pons
            .iter()
            .map(|(id, name, count)| BacklogPon {
                id: id.to_string(),
                name: name.to_string(),
                count: *count,
            })
            .collect(),
    }
}
