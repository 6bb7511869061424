//! Pure view helpers: backlog tree flattening and map-grid projection.
//!
//! Kept free of ratatui types so they can be unit-tested without a
//! terminal.

use std::collections::HashSet;

use crate::engine::backlog::BacklogTree;
use crate::engine::MapFilter;
use crate::model::{BBox, LatLon, Ont};

/// Which pane owns the keyboard.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Focus {
    Backlog,
    Map,
    Search,
}

/// Which corpus the search bar queries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SearchCorpus {
    /// Remote, debounced round-trip per query.
    Endpoints,
    /// Local scoring over the loaded CTO layer.
    Ctos,
}

impl SearchCorpus {
    pub fn toggled(self) -> Self {
        match self {
            SearchCorpus::Endpoints => SearchCorpus::Ctos,
            SearchCorpus::Ctos => SearchCorpus::Endpoints,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SearchCorpus::Endpoints => "endpoints",
            SearchCorpus::Ctos => "aggregation points",
        }
    }
}

/// One visible row of the backlog tree, in render order.
#[derive(Clone, Debug, PartialEq)]
pub enum BacklogRow {
    Olt {
        olt_id: String,
        name: String,
        count: u64,
        expanded: bool,
    },
    Pon {
        olt_id: String,
        pon_id: String,
        name: String,
        count: u64,
        loaded: bool,
    },
    Ont {
        olt_id: String,
        pon_id: String,
        ont: Ont,
    },
    /// Pseudo-row shown while a loaded group still has pages left.
    LoadMore { olt_id: String, pon_id: String },
}

/// Flattens the tree for a list widget. Expansion is pure UI state — it
/// never triggers fetching by itself; the caller decides that on Enter.
pub fn flatten_backlog(
    tree: &BacklogTree,
    expanded_olts: &HashSet<String>,
    expanded_pons: &HashSet<(String, String)>,
) -> Vec<BacklogRow> {
    let mut rows = Vec::new();
    for group in &tree.groups {
        let olt_open = expanded_olts.contains(&group.olt_id);
        rows.push(BacklogRow::Olt {
            olt_id: group.olt_id.clone(),
            name: group.olt_name.clone(),
            count: group.count,
            expanded: olt_open,
        });
        if !olt_open {
            continue;
        }
        for pon in &group.pons {
            let key = (group.olt_id.clone(), pon.id.clone());
            let loaded = tree.is_loaded(&group.olt_id, &pon.id);
            rows.push(BacklogRow::Pon {
                olt_id: group.olt_id.clone(),
                pon_id: pon.id.clone(),
                name: pon.name.clone(),
                count: pon.count,
                loaded,
            });
            if !expanded_pons.contains(&key) {
                continue;
            }
            for ont in tree.items(&group.olt_id, &pon.id) {
                rows.push(BacklogRow::Ont {
                    olt_id: group.olt_id.clone(),
                    pon_id: pon.id.clone(),
                    ont: ont.clone(),
                });
            }
            if loaded && tree.next_offset(&group.olt_id, &pon.id).is_some() {
                rows.push(BacklogRow::LoadMore {
                    olt_id: group.olt_id.clone(),
                    pon_id: pon.id.clone(),
                });
            }
        }
    }
    rows
}

/// Projects a geographic position into a character cell of a `cols`×`rows`
/// grid. Row zero is the north edge. Returns `None` outside the bbox.
pub fn grid_cell(bbox: &BBox, pos: LatLon, cols: u16, rows: u16) -> Option<(u16, u16)> {
    if cols == 0 || rows == 0 || !bbox.contains(pos) {
        return None;
    }
    let width = bbox.max_lon - bbox.min_lon;
    let height = bbox.max_lat - bbox.min_lat;
    if width <= 0.0 || height <= 0.0 {
        return None;
    }
    let x = ((pos.lon - bbox.min_lon) / width * f64::from(cols)).floor();
    let y = ((bbox.max_lat - pos.lat) / height * f64::from(rows)).floor();
    let x = (x as u16).min(cols - 1);
    let y = (y as u16).min(rows - 1);
    Some((x, y))
}

pub fn filter_label(filter: Option<&MapFilter>) -> String {
    match filter {
        Some(f) => format!("{}/{}", f.olt_id, f.pon_id),
        None => "no filter".to_string(),
    }
}

/// Glyph shown next to endpoint search results.
pub fn placement_glyph(ont: &Ont) -> &'static str {
    if ont.is_unplaced() {
        "○"
    } else {
        "●"
    }
}
