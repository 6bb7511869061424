//! Rendering surfaces and the spatial index cache.
//!
//! Every surface is an idempotent set-replace container keyed by entity id.
//! Reloads clear and rebuild; nothing is ever patched in place, so the last
//! fetch is always the sole source of truth for what is on screen.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use crate::model::{BBox, Cto, LatLon, Ont};

/// How long the transient search highlight stays on a CTO marker.
pub const HIGHLIGHT_DURATION: Duration = Duration::from_millis(1800);

/// Id-keyed marker container. `BTreeMap` keeps iteration order stable for
/// rendering.
#[derive(Clone, Debug)]
pub struct MarkerLayer<T> {
    markers: BTreeMap<String, T>,
}

impl<T> Default for MarkerLayer<T> {
    fn default() -> Self {
        Self {
            markers: BTreeMap::new(),
        }
    }
}

impl<T> MarkerLayer<T> {
    pub fn clear(&mut self) {
        self.markers.clear();
    }

    /// Replaces the whole layer in one step.
    pub fn replace_all(&mut self, entries: impl IntoIterator<Item = (String, T)>) {
        self.markers = entries.into_iter().collect();
    }

    pub fn get(&self, id: &str) -> Option<&T> {
        self.markers.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.markers.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &T)> {
        self.markers.iter()
    }

    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.markers.values()
    }
}

/// A rendered, drag-enabled endpoint marker.
#[derive(Clone, Debug)]
pub struct OntMarker {
    pub ont: Ont,
    pub position: LatLon,
}

/// A line between a placed endpoint and its associated aggregation point.
/// Keyed by the endpoint id in the link layer.
#[derive(Clone, Debug)]
pub struct CtoLink {
    pub ont_id: String,
    pub cto_uuid: String,
    pub from: LatLon,
    pub to: LatLon,
}

/// Transient UI affordance after picking a CTO search result. Expires on
/// its own and takes no part in reconciliation.
#[derive(Clone, Debug)]
pub struct Highlight {
    pub cto_uuid: String,
    pub until: Instant,
}

/// What the detail callout is showing, if open.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Callout {
    Ont(String),
    Cto(String),
}

/// The currently visible region of the map.
#[derive(Clone, Copy, Debug)]
pub struct Viewport {
    pub center: LatLon,
    pub lat_span: f64,
    pub lon_span: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        // Madrid metro, same neighbourhood the seed data lives in.
        Self {
            center: LatLon::new(40.42, -3.70),
            lat_span: 0.12,
            lon_span: 0.20,
        }
    }
}

impl Viewport {
    pub fn bbox(&self) -> BBox {
        BBox {
            min_lon: self.center.lon - self.lon_span / 2.0,
            min_lat: self.center.lat - self.lat_span / 2.0,
            max_lon: self.center.lon + self.lon_span / 2.0,
            max_lat: self.center.lat + self.lat_span / 2.0,
        }
    }

    pub fn center_on(&mut self, pos: LatLon) {
        self.center = pos;
    }

    pub fn pan(&mut self, dlat: f64, dlon: f64) {
        self.center.lat += dlat * self.lat_span;
        self.center.lon += dlon * self.lon_span;
    }

    pub fn zoom(&mut self, factor: f64) {
        self.lat_span = (self.lat_span * factor).clamp(0.002, 20.0);
        self.lon_span = (self.lon_span * factor).clamp(0.002, 40.0);
    }
}

/// All rendering surfaces plus the spatial index cache (the id → marker
/// maps inside each layer).
#[derive(Debug, Default)]
pub struct Surfaces {
    pub onts: MarkerLayer<OntMarker>,
    pub ctos: MarkerLayer<Cto>,
    pub links: MarkerLayer<CtoLink>,
    pub highlight: Option<Highlight>,
    pub callout: Option<Callout>,
}

impl Surfaces {
    /// Fail-safe used on every filter change: never show stale-filter data,
    /// even for the instant before the next load lands.
    pub fn clear_viewport_layers(&mut self) {
        self.onts.clear();
        self.links.clear();
    }

    /// Clear-and-rebuild of the endpoint and link layers from one fetch.
    /// Endpoints without a position are skipped; links are drawn only when
    /// the referenced CTO is in the loaded CTO layer.
    pub fn rebuild_viewport_layers(&mut self, onts: Vec<Ont>) {
        let mut markers = Vec::new();
        let mut links = Vec::new();
        for ont in onts {
            let Some(position) = ont.position() else {
                continue;
            };
            if let Some(cto) = ont.cto_uuid.as_deref().and_then(|u| self.ctos.get(u)) {
                links.push((
                    ont.id.clone(),
                    CtoLink {
                        ont_id: ont.id.clone(),
                        cto_uuid: cto.uuid.clone(),
                        from: position,
                        to: cto.position,
                    },
                ));
            }
            markers.push((ont.id.clone(), OntMarker { ont, position }));
        }
        self.onts.replace_all(markers);
        self.links.replace_all(links);
    }

    /// Replaces the aggregation-point layer; done in bulk once per session
    /// refresh.
    pub fn rebuild_cto_layer(&mut self, ctos: Vec<Cto>) {
        self.ctos
            .replace_all(ctos.into_iter().map(|c| (c.uuid.clone(), c)));
    }

    pub fn highlight_cto(&mut self, uuid: &str, now: Instant) {
        self.highlight = Some(Highlight {
            cto_uuid: uuid.to_string(),
            until: now + HIGHLIGHT_DURATION,
        });
    }

    /// Drops the highlight once its lifetime has passed, regardless of any
    /// interaction since.
    pub fn expire_highlight(&mut self, now: Instant) {
        if let Some(h) = &self.highlight {
            if now >= h.until {
                self.highlight = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn placed_ont(id: &str, lat: f64, lon: f64, cto: Option<&str>) -> Ont {
        Ont {
            id: id.into(),
            lat: Some(lat),
            lon: Some(lon),
            cto_uuid: cto.map(|s| s.to_string()),
            ..Ont::default()
        }
    }

    #[test]
    fn rebuild_replaces_rather_than_merges() {
        let mut surfaces = Surfaces::default();
        surfaces.rebuild_viewport_layers(vec![placed_ont("a", 1.0, 1.0, None)]);
        assert!(surfaces.onts.contains("a"));

        surfaces.rebuild_viewport_layers(vec![placed_ont("b", 2.0, 2.0, None)]);
        assert!(!surfaces.onts.contains("a"), "old markers must be dropped");
        assert!(surfaces.onts.contains("b"));
    }

    #[test]
    fn links_require_a_loaded_cto() {
        let mut surfaces = Surfaces::default();
        surfaces.rebuild_cto_layer(vec![Cto {
            uuid: "c1".into(),
            name: "CTO 1".into(),
            position: LatLon::new(0.0, 0.0),
        }]);
        surfaces.rebuild_viewport_layers(vec![
            placed_ont("a", 1.0, 1.0, Some("c1")),
            placed_ont("b", 2.0, 2.0, Some("missing")),
        ]);
        assert!(surfaces.links.contains("a"));
        assert!(!surfaces.links.contains("b"));
    }

    #[test]
    fn unplaced_onts_never_render() {
        let mut surfaces = Surfaces::default();
        let mut ont = placed_ont("a", 1.0, 1.0, None);
        ont.lon = None;
        surfaces.rebuild_viewport_layers(vec![ont]);
        assert!(surfaces.onts.is_empty());
    }

    #[test]
    fn highlight_expires_on_its_own() {
        let mut surfaces = Surfaces::default();
        let t0 = Instant::now();
        surfaces.highlight_cto("c1", t0);
        surfaces.expire_highlight(t0 + HIGHLIGHT_DURATION - Duration::from_millis(1));
        assert!(surfaces.highlight.is_some());
        surfaces.expire_highlight(t0 + HIGHLIGHT_DURATION);
        assert!(surfaces.highlight.is_none());
    }

    #[test]
    fn viewport_bbox_is_centered() {
        let vp = Viewport {
            center: LatLon::new(40.0, -3.0),
            lat_span: 0.2,
            lon_span: 0.4,
        };
        let bbox = vp.bbox();
        assert!((bbox.min_lat - 39.9).abs() < 1e-9);
        assert!((bbox.max_lat - 40.1).abs() < 1e-9);
        assert_eq!(bbox.to_query(), "-3.2,39.9,-2.8,40.1");
    }
}
