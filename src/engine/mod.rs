//! The client-side reconciliation engine.
//!
//! One mutable view-state, owned here, kept consistent across four
//! independently refreshed surfaces: the endpoint marker layer, the
//! aggregation-point marker layer, the paginated backlog tree and the
//! free-text search results. All mutations go through the gateway and are
//! followed by re-fetches; nothing is ever patched optimistically.
//!
//! Every handler runs on the single event-loop thread; suspension points
//! are exactly the awaited gateway calls. Superseded in-flight requests are
//! not cancelled — a stale clear-and-rebuild can win a race, which is
//! accepted because a rebuild is never a partial merge.

pub mod backlog;
pub mod debounce;
pub mod layers;
pub mod selection;

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::engine::backlog::{BacklogTree, PAGE_SIZE};
use crate::engine::layers::{Callout, Surfaces, Viewport};
use crate::engine::selection::{Selection, SelectionEvent};
use crate::gateway::{Gateway, GatewayError, OntPatch, SearchParams};
use crate::model::{ImportSummary, LatLon, Olt, Ont, Pon};
use crate::search::CtoHit;

/// Quiet period for keystroke-driven endpoint searches.
pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(250);

/// Page size for remote endpoint search results.
pub const SEARCH_LIMIT: usize = 50;

/// Notices kept for the status line; oldest are dropped past this.
const NOTICE_CAP: usize = 64;

/// The explicit (access node, port) pair that scopes every map load.
/// Both-or-neither by construction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MapFilter {
    pub olt_id: String,
    pub pon_id: String,
}

/// Process-wide view state. Single instance, owned by [`Engine`], reset
/// only by restarting the console.
#[derive(Debug, Default)]
pub struct ViewState {
    pub selection: Selection,
    pub filter: Option<MapFilter>,
    pub viewport: Viewport,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

#[derive(Clone, Debug)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

pub struct Engine {
    gateway: Box<dyn Gateway>,
    pub state: ViewState,
    pub surfaces: Surfaces,
    pub backlog: BacklogTree,
    /// Access nodes for the filter picker.
    pub olts: Vec<Olt>,
    /// Ports of the access node currently picked in the filter UI.
    pub pons: Vec<Pon>,
    /// Last successful remote endpoint search.
    pub search_results: Vec<Ont>,
    notices: VecDeque<Notice>,
}

impl Engine {
    pub fn new(gateway: Box<dyn Gateway>) -> Self {
        Self {
            gateway,
            state: ViewState::default(),
            surfaces: Surfaces::default(),
            backlog: BacklogTree::default(),
            olts: Vec::new(),
            pons: Vec::new(),
            search_results: Vec::new(),
            notices: VecDeque::new(),
        }
    }

    // ── notices ─────────────────────────────────────────────────────────

    pub fn notice(&mut self, level: NoticeLevel, text: impl Into<String>) {
        let text = text.into();
        match level {
            NoticeLevel::Info => tracing::info!(notice = %text),
            NoticeLevel::Error => tracing::error!(notice = %text),
        }
        self.notices.push_back(Notice { level, text });
        while self.notices.len() > NOTICE_CAP {
            self.notices.pop_front();
        }
    }

    /// Failure policy: log, surface one notice, carry on. Nothing here
    /// retries or propagates.
    fn surface_failure(&mut self, what: &str, err: GatewayError) {
        self.notice(NoticeLevel::Error, format!("{what}: {err}"));
    }

    pub fn last_notice(&self) -> Option<&Notice> {
        self.notices.back()
    }

    pub fn notices(&self) -> impl Iterator<Item = &Notice> {
        self.notices.iter()
    }

    // ── session refresh ─────────────────────────────────────────────────

    /// Bulk loads done once per session refresh: the CTO layer, the access
    /// node list and the backlog counts. Each step fails independently.
    pub async fn refresh_session(&mut self) {
        match self.gateway.cto_layer().await {
            Ok(ctos) => {
                tracing::info!(count = ctos.len(), "cto layer loaded");
                self.surfaces.rebuild_cto_layer(ctos);
            }
            Err(e) => self.surface_failure("load aggregation points", e),
        }
        match self.gateway.list_olts().await {
            Ok(olts) => self.olts = olts,
            Err(e) => self.surface_failure("load access nodes", e),
        }
        self.reload_backlog_groups().await;
    }

    /// Loads the port list for the access node picked in the filter UI.
    pub async fn pick_olt(&mut self, olt_id: &str) {
        match self.gateway.list_pons(olt_id).await {
            Ok(pons) => self.pons = pons,
            Err(e) => self.surface_failure("load ports", e),
        }
    }

    // ── map filter and viewport loading ─────────────────────────────────

    /// Sets the (OLT, PON) filter pair. Rendered layers are cleared
    /// immediately so a slow or failed load can never leave stale-filter
    /// data on screen.
    pub fn set_filter(&mut self, olt_id: &str, pon_id: &str) {
        self.state.filter = Some(MapFilter {
            olt_id: olt_id.to_string(),
            pon_id: pon_id.to_string(),
        });
        self.surfaces.clear_viewport_layers();
    }

    pub fn clear_filter(&mut self) {
        self.state.filter = None;
        self.surfaces.clear_viewport_layers();
    }

    /// Viewport-scoped load. Deliberately a no-op without a complete
    /// filter pair: never ask the backend for an unbounded result set.
    pub async fn reload_map_layer(&mut self) {
        let Some(filter) = self.state.filter.clone() else {
            return;
        };
        let bbox = self.state.viewport.bbox();
        match self
            .gateway
            .onts_in_viewport(&bbox, &filter.olt_id, &filter.pon_id)
            .await
        {
            Ok(onts) => {
                tracing::debug!(count = onts.len(), "map layer rebuilt");
                self.surfaces.rebuild_viewport_layers(onts);
            }
            // The view keeps whatever the last successful fetch produced.
            Err(e) => self.surface_failure("load map layer", e),
        }
    }

    pub async fn reload_backlog_groups(&mut self) {
        match self.gateway.backlog_groups().await {
            Ok(groups) => self.backlog.set_groups(groups),
            Err(e) => self.surface_failure("load backlog", e),
        }
    }

    /// Fixed post-mutation order: backlog counts first (cheap, globally
    /// meaningful), then the filter-gated map reload. A failed step
    /// surfaces a notice but never stops the sibling step.
    pub async fn reconcile_after_mutation(&mut self) {
        self.reload_backlog_groups().await;
        if self.state.filter.is_some() {
            self.reload_map_layer().await;
        }
    }

    // ── selection and modes ─────────────────────────────────────────────

    /// Guarantees at-most-one active selection before entering a mode.
    pub fn reset_selection(&mut self) {
        self.state.selection = std::mem::take(&mut self.state.selection)
            .transition(SelectionEvent::Settle);
    }

    pub fn select_for_placement(&mut self, ont_id: &str) {
        self.reset_selection();
        self.state.selection = std::mem::take(&mut self.state.selection)
            .transition(SelectionEvent::SelectForPlacement(ont_id.to_string()));
    }

    pub fn select_for_association(&mut self, ont_id: &str) {
        self.reset_selection();
        self.state.selection = std::mem::take(&mut self.state.selection)
            .transition(SelectionEvent::SelectForAssociation(ont_id.to_string()));
    }

    /// Backlog selection: enter placement mode and synchronize the map
    /// filter to the endpoint's own group before prompting for a click.
    pub fn select_from_backlog(&mut self, ont_id: &str, olt_id: &str, pon_id: &str) {
        self.select_for_placement(ont_id);
        self.set_filter(olt_id, pon_id);
    }

    /// Map click handler. Only meaningful while placing; the machine
    /// settles back to idle whatever the request outcome, and a full
    /// reconciliation runs either way.
    pub async fn map_clicked(&mut self, lat: f64, lon: f64) {
        let Selection::Placing { ont_id } = self.state.selection.clone() else {
            return;
        };
        if let Err(e) = self
            .gateway
            .patch_ont(&ont_id, &OntPatch::position(lat, lon))
            .await
        {
            self.surface_failure("place endpoint", e);
        } else {
            self.notice(NoticeLevel::Info, format!("placed {ont_id} at {lat:.5},{lon:.5}"));
        }
        self.reset_selection();
        self.reconcile_after_mutation().await;
    }

    /// Aggregation-point click handler; the association twin of
    /// [`Engine::map_clicked`].
    pub async fn cto_clicked(&mut self, uuid: &str) {
        let Selection::Associating { ont_id } = self.state.selection.clone() else {
            return;
        };
        if let Err(e) = self
            .gateway
            .patch_ont(&ont_id, &OntPatch::associate(uuid))
            .await
        {
            self.surface_failure("associate endpoint", e);
        } else {
            self.notice(NoticeLevel::Info, format!("associated {ont_id} with {uuid}"));
        }
        self.reset_selection();
        self.reconcile_after_mutation().await;
    }

    /// Explicit `cto_uuid: null`, no mode involved.
    pub async fn disassociate(&mut self, ont_id: &str) {
        if let Err(e) = self
            .gateway
            .patch_ont(ont_id, &OntPatch::disassociate())
            .await
        {
            self.surface_failure("disassociate endpoint", e);
        } else {
            self.notice(NoticeLevel::Info, format!("disassociated {ont_id}"));
        }
        self.reconcile_after_mutation().await;
    }

    /// Drag-end on a rendered marker. Reloads the map layer only — the
    /// cheap way to converge on the authoritative server position whether
    /// or not the update stuck.
    pub async fn marker_dragged(&mut self, ont_id: &str, lat: f64, lon: f64) {
        if let Err(e) = self
            .gateway
            .patch_ont(ont_id, &OntPatch::position(lat, lon))
            .await
        {
            self.surface_failure("move endpoint", e);
        }
        self.reload_map_layer().await;
    }

    // ── backlog tree ────────────────────────────────────────────────────

    /// First expand fetches page zero; a re-expand of an already loaded
    /// group renders from cache and issues no request.
    pub async fn expand_group(&mut self, olt_id: &str, pon_id: &str) {
        if self.backlog.is_loaded(olt_id, pon_id) {
            return;
        }
        self.fetch_group_page(olt_id, pon_id).await;
    }

    pub async fn load_more(&mut self, olt_id: &str, pon_id: &str) {
        self.fetch_group_page(olt_id, pon_id).await;
    }

    pub async fn reset_group(&mut self, olt_id: &str, pon_id: &str) {
        self.backlog.reset_group(olt_id, pon_id);
        self.fetch_group_page(olt_id, pon_id).await;
    }

    async fn fetch_group_page(&mut self, olt_id: &str, pon_id: &str) {
        let Some(offset) = self.backlog.next_offset(olt_id, pon_id) else {
            return;
        };
        match self
            .gateway
            .unplaced_page(olt_id, pon_id, PAGE_SIZE, offset)
            .await
        {
            Ok(items) => self.backlog.absorb_page(olt_id, pon_id, items, PAGE_SIZE),
            Err(e) => self.surface_failure("load backlog page", e),
        }
    }

    // ── search ──────────────────────────────────────────────────────────

    /// Synchronous scoring over the loaded CTO layer.
    pub fn search_ctos_local(&self, query: &str) -> Vec<CtoHit> {
        crate::search::search_ctos(self.surfaces.ctos.values(), query)
    }

    /// Picking a CTO search result: center, open the callout and start the
    /// self-expiring highlight.
    pub fn focus_cto(&mut self, uuid: &str, now: Instant) {
        if let Some(cto) = self.surfaces.ctos.get(uuid) {
            self.state.viewport.center_on(cto.position);
        }
        self.surfaces.callout = Some(Callout::Cto(uuid.to_string()));
        self.surfaces.highlight_cto(uuid, now);
    }

    /// Debounced upstream; this is the round-trip itself. Results replace
    /// the previous set only on success.
    pub async fn run_endpoint_search(&mut self, query: &str) {
        let params = SearchParams {
            query: query.to_string(),
            olt_id: None,
            pon_id: None,
            only_unlocated: false,
            limit: SEARCH_LIMIT,
            offset: 0,
        };
        match self.gateway.search_onts(&params).await {
            Ok(items) => self.search_results = items,
            Err(e) => self.surface_failure("endpoint search", e),
        }
    }

    /// Routes a picked endpoint search result: unplaced endpoints go into
    /// placement mode; placed ones get located and called out. Both reuse
    /// the filter-setting path of the viewport loader.
    pub async fn open_search_result(&mut self, ont: &Ont) {
        let (Some(olt_id), Some(pon_id)) = (ont.olt_id.clone(), ont.pon_id.clone()) else {
            self.notice(
                NoticeLevel::Error,
                format!("{} has no access-node/port attribution", ont.display_label()),
            );
            return;
        };
        if let Some(pos) = ont.position() {
            self.set_filter(&olt_id, &pon_id);
            self.state.viewport.center_on(pos);
            self.reload_map_layer().await;
            self.surfaces.callout = Some(Callout::Ont(ont.id.clone()));
        } else {
            self.select_from_backlog(&ont.id, &olt_id, &pon_id);
            self.reload_map_layer().await;
        }
    }

    // ── bulk import ─────────────────────────────────────────────────────

    /// Uploads a CSV, surfaces the summary and reconciles, since an import
    /// can change any number of placements.
    pub async fn import_csv(&mut self, filename: &str, bytes: Vec<u8>) -> Option<ImportSummary> {
        match self.gateway.import_csv(filename, bytes).await {
            Ok(summary) => {
                self.notice(NoticeLevel::Info, summary.summary_line());
                self.reconcile_after_mutation().await;
                Some(summary)
            }
            Err(e) => {
                self.surface_failure("csv import", e);
                None
            }
        }
    }

    // ── housekeeping ────────────────────────────────────────────────────

    /// Per-frame tick: currently just the highlight lifetime.
    pub fn tick(&mut self, now: Instant) {
        self.surfaces.expire_highlight(now);
    }

    /// Center used when the operator asks to jump to an endpoint marker.
    pub fn marker_position(&self, ont_id: &str) -> Option<LatLon> {
        self.surfaces.onts.get(ont_id).map(|m| m.position)
    }
}
