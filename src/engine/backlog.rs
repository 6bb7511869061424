//! Hierarchical backlog of unplaced endpoints with per-group pagination.
//!
//! The tree is two levels: access node → port → one growing page of
//! endpoints. Each (OLT, PON) pair owns an independent cursor so that
//! collapsing and re-expanding a node re-renders from cache instead of
//! hitting the backend again.

use std::collections::HashMap;

use crate::model::{BacklogGroup, Ont};

/// Fixed page size for backlog pagination. Exhaustion is inferred strictly
/// from a short page; there is no server-side "has next" flag.
pub const PAGE_SIZE: usize = 50;

type GroupKey = (String, String);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GroupCursor {
    pub offset: usize,
    pub exhausted: bool,
}

#[derive(Debug, Default)]
pub struct BacklogTree {
    pub groups: Vec<BacklogGroup>,
    cursors: HashMap<GroupKey, GroupCursor>,
    pages: HashMap<GroupKey, Vec<Ont>>,
}

impl BacklogTree {
    /// Replaces the top level with freshly fetched counts. Cached pages and
    /// cursors are dropped: new counts mean the old pages can no longer be
    /// trusted, so the next expand re-fetches.
    pub fn set_groups(&mut self, groups: Vec<BacklogGroup>) {
        self.groups = groups;
        self.cursors.clear();
        self.pages.clear();
    }

    pub fn cursor(&self, olt_id: &str, pon_id: &str) -> Option<GroupCursor> {
        self.cursors
            .get(&(olt_id.to_string(), pon_id.to_string()))
            .copied()
    }

    /// Whether this group has been fetched at least once (and not reset).
    pub fn is_loaded(&self, olt_id: &str, pon_id: &str) -> bool {
        self.cursor(olt_id, pon_id).is_some()
    }

    pub fn items(&self, olt_id: &str, pon_id: &str) -> &[Ont] {
        self.pages
            .get(&(olt_id.to_string(), pon_id.to_string()))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Offset the next fetch should use, or `None` when the group is
    /// exhausted.
    pub fn next_offset(&self, olt_id: &str, pon_id: &str) -> Option<usize> {
        match self.cursor(olt_id, pon_id) {
            Some(c) if c.exhausted => None,
            Some(c) => Some(c.offset),
            None => Some(0),
        }
    }

    /// Records one fetched page: advances the offset by the count actually
    /// returned and marks the group exhausted when the page came up short.
    pub fn absorb_page(&mut self, olt_id: &str, pon_id: &str, items: Vec<Ont>, page_size: usize) {
        let key = (olt_id.to_string(), pon_id.to_string());
        let cursor = self.cursors.entry(key.clone()).or_insert(GroupCursor {
            offset: 0,
            exhausted: false,
        });
        cursor.offset += items.len();
        cursor.exhausted = items.len() < page_size;
        self.pages.entry(key).or_default().extend(items);
    }

    /// Forces the next expand of this group to start from offset zero.
    pub fn reset_group(&mut self, olt_id: &str, pon_id: &str) {
        let key = (olt_id.to_string(), pon_id.to_string());
        self.cursors.remove(&key);
        self.pages.remove(&key);
    }

    pub fn total_unplaced(&self) -> u64 {
        self.groups.iter().map(|g| g.count).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn onts(n: usize, start: usize) -> Vec<Ont> {
        (start..start + n)
            .map(|i| Ont {
                id: format!("E{i}"),
                ..Ont::default()
            })
            .collect()
    }

    #[test]
    fn offset_advances_by_items_returned() {
        let mut tree = BacklogTree::default();
        assert_eq!(tree.next_offset("O1", "P1"), Some(0));

        tree.absorb_page("O1", "P1", onts(PAGE_SIZE, 0), PAGE_SIZE);
        let c = tree.cursor("O1", "P1").unwrap();
        assert_eq!(c.offset, PAGE_SIZE);
        assert!(!c.exhausted);
        assert_eq!(tree.next_offset("O1", "P1"), Some(PAGE_SIZE));

        // Short page terminates the cursor.
        tree.absorb_page("O1", "P1", onts(7, PAGE_SIZE), PAGE_SIZE);
        let c = tree.cursor("O1", "P1").unwrap();
        assert_eq!(c.offset, PAGE_SIZE + 7);
        assert!(c.exhausted);
        assert_eq!(tree.next_offset("O1", "P1"), None);
        assert_eq!(tree.items("O1", "P1").len(), PAGE_SIZE + 7);
    }

    #[test]
    fn empty_first_page_is_immediately_exhausted() {
        let mut tree = BacklogTree::default();
        tree.absorb_page("O1", "P1", Vec::new(), PAGE_SIZE);
        let c = tree.cursor("O1", "P1").unwrap();
        assert_eq!(c.offset, 0);
        assert!(c.exhausted);
    }

    #[test]
    fn cursors_are_independent_per_group() {
        let mut tree = BacklogTree::default();
        tree.absorb_page("O1", "P1", onts(PAGE_SIZE, 0), PAGE_SIZE);
        tree.absorb_page("O1", "P2", onts(3, 0), PAGE_SIZE);
        assert_eq!(tree.next_offset("O1", "P1"), Some(PAGE_SIZE));
        assert_eq!(tree.next_offset("O1", "P2"), None);
        assert_eq!(tree.next_offset("O2", "P1"), Some(0));
    }

    #[test]
    fn group_reload_drops_cached_pages() {
        let mut tree = BacklogTree::default();
        tree.absorb_page("O1", "P1", onts(5, 0), PAGE_SIZE);
        tree.set_groups(Vec::new());
        assert!(!tree.is_loaded("O1", "P1"));
        assert!(tree.items("O1", "P1").is_empty());
    }

    #[test]
    fn reset_group_only_touches_its_key() {
        let mut tree = BacklogTree::default();
        tree.absorb_page("O1", "P1", onts(5, 0), PAGE_SIZE);
        tree.absorb_page("O1", "P2", onts(5, 0), PAGE_SIZE);
        tree.reset_group("O1", "P1");
        assert!(!tree.is_loaded("O1", "P1"));
        assert!(tree.is_loaded("O1", "P2"));
    }
}
