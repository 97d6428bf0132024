//! Visited-page snapshots and the back/forward cursor.
//!
//! Slot indices are absolute and never reused: bookmarks published in the URL
//! fragment carry them. Trimming pops the oldest snapshot and advances
//! `first`, so evicted slots simply become unreachable.

use std::collections::VecDeque;

use serde::Serialize;

use crate::cache::menu_cache::MenuCache;
use crate::{NavError, Relation, RouteParams, ScriptDescriptor};

/// One visited page's reconstructable state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageSnapshot {
    pub bookmark_key: String,
    pub content_html: String,
    pub script_files: Vec<ScriptDescriptor>,
    pub selflink_html: String,
    /// Reference into the menu cache.
    pub menu_key: String,
    pub route_params: RouteParams,
}

/// What the server said about a freshly rendered page.
#[derive(Debug, Clone)]
pub struct PageRecord {
    pub bookmark_key: String,
    pub script_files: Vec<ScriptDescriptor>,
    pub menu_key: String,
    pub route_params: RouteParams,
    pub relation: Option<Relation>,
}

/// Live markup captured from the surface after the swap.
#[derive(Debug, Clone, Default)]
pub struct Captured {
    pub content_html: String,
    pub selflink_html: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// A new entry went into slot `index`; publish a bookmark for it.
    Appended { index: usize },
    /// The response is the page already on screen; slot `index` was refreshed.
    Refreshed { index: usize },
    /// Forced same-page with nothing on screen to refresh.
    Unchanged,
}

/// `current` is one past the live slot: `0` means nothing recorded yet.
#[derive(Debug, Clone)]
pub struct PageHistory {
    pages: VecDeque<PageSnapshot>,
    /// Absolute index of `pages[0]`.
    first: usize,
    current: usize,
    capacity: usize,
}

impl PageHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            pages: VecDeque::with_capacity(capacity + 1),
            first: 0,
            current: 0,
            capacity,
        }
    }

    /// Record a rendered page.
    ///
    /// Forward history (slots at or after the cursor) is discarded first.
    /// Same page when the hint says so, or with no hint when the previous
    /// entry has the same bookmark key; only the adjacent entry is compared.
    pub fn add<F>(&mut self, record: PageRecord, capture: F) -> AddOutcome
    where
        F: FnOnce() -> Captured,
    {
        let keep = self.current.saturating_sub(self.first);
        if keep < self.pages.len() {
            tracing::debug!(dropped = self.pages.len() - keep, "discarding forward history");
            self.pages.truncate(keep);
        }

        let previous = self.current_slot();
        let same_page = match record.relation {
            Some(Relation::SamePage) => true,
            Some(Relation::NewPage) => false,
            None => previous
                .and_then(|index| self.get(index))
                .is_some_and(|page| page.bookmark_key == record.bookmark_key),
        };

        if same_page {
            let Some(index) = previous else {
                return AddOutcome::Unchanged;
            };
            let Some(page) = self.get_mut(index) else {
                return AddOutcome::Unchanged;
            };
            let captured = capture();
            page.content_html = captured.content_html;
            page.selflink_html = captured.selflink_html;
            page.script_files = record.script_files;
            page.menu_key = record.menu_key;
            page.route_params = record.route_params;
            return AddOutcome::Refreshed { index };
        }

        let captured = capture();
        let index = self.len();
        self.pages.push_back(PageSnapshot {
            bookmark_key: record.bookmark_key,
            content_html: captured.content_html,
            script_files: record.script_files,
            selflink_html: captured.selflink_html,
            menu_key: record.menu_key,
            route_params: record.route_params,
        });
        self.current = index + 1;
        self.trim();
        AddOutcome::Appended { index }
    }

    /// Resync the live page's content before navigating away.
    pub fn update(&mut self, content_html: String) {
        if let Some(page) = self.current_slot().and_then(|index| self.get_mut(index)) {
            page.content_html = content_html;
        }
    }

    /// The snapshot at `index`, if it can be rendered: present, with a menu
    /// key that still resolves in `menus`.
    pub fn replayable(&self, index: usize, menus: &MenuCache) -> Result<&PageSnapshot, NavError> {
        self.get(index)
            .filter(|page| !page.menu_key.is_empty() && menus.contains(&page.menu_key))
            .ok_or(NavError::InvalidPage { index })
    }

    /// Move the cursor so that slot `index` is the live page.
    pub fn set_current(&mut self, index: usize) -> Result<(), NavError> {
        if self.get(index).is_none() {
            return Err(NavError::InvalidPage { index });
        }
        self.current = index + 1;
        Ok(())
    }

    pub fn get(&self, index: usize) -> Option<&PageSnapshot> {
        index.checked_sub(self.first).and_then(|offset| self.pages.get(offset))
    }

    fn get_mut(&mut self, index: usize) -> Option<&mut PageSnapshot> {
        index.checked_sub(self.first).and_then(|offset| self.pages.get_mut(offset))
    }

    /// Whether any held snapshot renders with `menu_key`.
    pub fn references_menu(&self, menu_key: &str) -> bool {
        self.pages.iter().any(|page| page.menu_key == menu_key)
    }

    /// One past the live slot.
    pub fn current_index(&self) -> usize {
        self.current
    }

    /// Number of slots ever assigned, evicted ones included.
    pub fn len(&self) -> usize {
        self.first + self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of snapshots still held.
    pub fn live_len(&self) -> usize {
        self.pages.len()
    }

    /// Absolute index of the oldest snapshot still held.
    pub fn first_index(&self) -> usize {
        self.first
    }

    /// Held snapshots with their slot indices, oldest first.
    pub fn entries(&self) -> impl Iterator<Item = (usize, &PageSnapshot)> {
        self.pages.iter().enumerate().map(|(offset, page)| (self.first + offset, page))
    }

    fn current_slot(&self) -> Option<usize> {
        self.current
            .checked_sub(1)
            .filter(|&index| self.get(index).is_some())
    }

    /// Drop the oldest snapshots until at most `capacity` remain.
    fn trim(&mut self) {
        while self.pages.len() > self.capacity {
            self.pages.pop_front();
            self.first += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(key: &str, relation: Option<Relation>) -> PageRecord {
        PageRecord {
            bookmark_key: key.to_string(),
            script_files: vec![ScriptDescriptor::new("x.js", true)],
            menu_key: "m1".to_string(),
            route_params: RouteParams::new(),
            relation,
        }
    }

    fn captured(content: &str) -> impl FnOnce() -> Captured + '_ {
        move || Captured {
            content_html: content.to_string(),
            selflink_html: String::new(),
        }
    }

    #[test]
    fn appends_new_pages() {
        let mut history = PageHistory::new(6);
        assert_eq!(history.add(record("/db/1", None), captured("A")), AddOutcome::Appended { index: 0 });
        assert_eq!(history.add(record("/db/2", None), captured("B")), AddOutcome::Appended { index: 1 });
        assert_eq!(history.len(), 2);
        assert_eq!(history.current_index(), 2);
    }

    #[test]
    fn adjacent_duplicate_is_same_page() {
        let mut history = PageHistory::new(6);
        history.add(record("/db/1", None), captured("A"));
        let outcome = history.add(record("/db/1", None), captured("A2"));
        assert_eq!(outcome, AddOutcome::Refreshed { index: 0 });
        assert_eq!(history.len(), 1);
        assert_eq!(history.get(0).map(|p| p.content_html.as_str()), Some("A2"));
    }

    #[test]
    fn non_adjacent_repeat_is_new_page() {
        let mut history = PageHistory::new(6);
        history.add(record("/db/1", None), captured("A"));
        history.add(record("/db/2", None), captured("B"));
        assert_eq!(history.add(record("/db/1", None), captured("A")), AddOutcome::Appended { index: 2 });
    }

    #[test]
    fn newpage_hint_overrides_equal_keys() {
        let mut history = PageHistory::new(6);
        history.add(record("/db/1", None), captured("A"));
        let outcome = history.add(record("/db/1", Some(Relation::NewPage)), captured("A"));
        assert_eq!(outcome, AddOutcome::Appended { index: 1 });
    }

    #[test]
    fn samepage_hint_on_empty_history_is_ignored() {
        let mut history = PageHistory::new(6);
        let outcome = history.add(record("/db/1", Some(Relation::SamePage)), captured("A"));
        assert_eq!(outcome, AddOutcome::Unchanged);
        assert!(history.is_empty());
    }

    #[test]
    fn trims_oldest_to_capacity_without_shifting_slots() {
        let mut history = PageHistory::new(2);
        for key in ["/a", "/b", "/c"] {
            history.add(record(key, None), captured(key));
        }
        assert_eq!(history.len(), 3);
        assert_eq!(history.live_len(), 2);
        assert_eq!(history.first_index(), 1);
        assert!(history.get(0).is_none());
        assert_eq!(history.get(2).map(|p| p.bookmark_key.as_str()), Some("/c"));
        assert!(history.set_current(0).is_err());
    }

    #[test]
    fn storage_stays_bounded_over_a_long_session() {
        let mut history = PageHistory::new(3);
        for i in 0..500 {
            history.add(record(&format!("/p{i}"), None), captured("x"));
            assert!(history.live_len() <= 3);
        }
        assert_eq!(history.len(), 500);
        assert_eq!(history.first_index(), 497);
        let indices: Vec<usize> = history.entries().map(|(index, _)| index).collect();
        assert_eq!(indices, vec![497, 498, 499]);
        assert_eq!(history.get(499).map(|p| p.bookmark_key.as_str()), Some("/p499"));
    }

    #[test]
    fn back_then_new_page_after_trimming() {
        let mut history = PageHistory::new(2);
        for key in ["/a", "/b", "/c"] {
            history.add(record(key, None), captured(key));
        }
        history.set_current(1).unwrap();
        assert_eq!(history.add(record("/d", None), captured("D")), AddOutcome::Appended { index: 2 });
        let keys: Vec<&str> = history.entries().map(|(_, p)| p.bookmark_key.as_str()).collect();
        assert_eq!(keys, vec!["/b", "/d"]);
        assert_eq!(history.current_index(), 3);
    }

    #[test]
    fn update_rewrites_live_entry() {
        let mut history = PageHistory::new(6);
        history.update("ignored".into());
        history.add(record("/a", None), captured("A"));
        history.update("A expanded".into());
        assert_eq!(history.get(0).map(|p| p.content_html.as_str()), Some("A expanded"));
    }

    #[test]
    fn replayable_requires_resolvable_menu() {
        let mut history = PageHistory::new(6);
        history.add(record("/a", None), captured("A"));
        let mut menus = MenuCache::new(6);
        assert!(matches!(history.replayable(0, &menus), Err(NavError::InvalidPage { index: 0 })));
        menus.add("m1", "<ul/>");
        assert!(history.replayable(0, &menus).is_ok());
        assert!(history.replayable(5, &menus).is_err());
    }
}
