//! Bounded store of navigation-menu fragments.
//!
//! The server sends a menu's markup only when the client does not already
//! hold it; otherwise just the key. Outgoing requests therefore advertise the
//! cached keys (see [`MenuCache::request_param`]).

use std::collections::HashMap;
use std::time::SystemTime;

use serde::Serialize;

use crate::viewport::ViewPort;

/// Name of the request parameter listing cached menu keys.
pub const MENU_HASHES_PARAM: &str = "menuHashes";

/// A cached menu fragment.
#[derive(Debug, Clone, Serialize)]
pub struct MenuEntry {
    pub menu_key: String,
    pub content_html: String,
    pub captured_at: SystemTime,
    /// Monotonic capture order; wall-clock stamps can tie.
    #[serde(skip)]
    seq: u64,
}

/// Menu fragments keyed by content hash, evicted oldest-capture-first.
#[derive(Debug, Clone)]
pub struct MenuCache {
    entries: HashMap<String, MenuEntry>,
    capacity: usize,
    clock: u64,
}

impl MenuCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            capacity,
            clock: 0,
        }
    }

    /// Insert or overwrite a menu, stamping it as the newest entry.
    ///
    /// Returns the key evicted to stay within capacity, if any.
    pub fn add(&mut self, menu_key: &str, content_html: &str) -> Option<String> {
        self.add_retaining(menu_key, content_html, |_| false)
    }

    /// Like [`MenuCache::add`], but eviction passes over keys for which
    /// `in_use` holds while any other candidate remains.
    pub fn add_retaining<F>(&mut self, menu_key: &str, content_html: &str, in_use: F) -> Option<String>
    where
        F: Fn(&str) -> bool,
    {
        self.clock += 1;
        self.entries.insert(
            menu_key.to_string(),
            MenuEntry {
                menu_key: menu_key.to_string(),
                content_html: content_html.to_string(),
                captured_at: SystemTime::now(),
                seq: self.clock,
            },
        );

        if self.entries.len() <= self.capacity {
            return None;
        }
        // Unused entries sort first, then by capture order.
        let oldest = self
            .entries
            .values()
            .filter(|entry| entry.menu_key != menu_key)
            .min_by_key(|entry| (in_use(entry.menu_key.as_str()), entry.seq))
            .map(|entry| entry.menu_key.clone())?;
        self.entries.remove(&oldest);
        tracing::debug!(evicted = %oldest, "menu cache over capacity");
        Some(oldest)
    }

    /// Restamp `menu_key` as the newest entry. Returns whether it was cached.
    pub fn touch(&mut self, menu_key: &str) -> bool {
        let Some(entry) = self.entries.get_mut(menu_key) else {
            return false;
        };
        self.clock += 1;
        entry.seq = self.clock;
        true
    }

    /// Markup for `menu_key`.
    ///
    /// `None` means the entry is unexpectedly missing: every real page has a
    /// non-empty menu, so an empty stored fragment is reported the same way.
    pub fn get(&self, menu_key: &str) -> Option<&str> {
        self.entries
            .get(menu_key)
            .map(|entry| entry.content_html.as_str())
            .filter(|html| !html.is_empty())
    }

    pub fn contains(&self, menu_key: &str) -> bool {
        self.get(menu_key).is_some()
    }

    pub fn entry(&self, menu_key: &str) -> Option<&MenuEntry> {
        self.entries.get(menu_key)
    }

    /// Cached keys, oldest capture first.
    pub fn keys(&self) -> Vec<&str> {
        let mut entries: Vec<&MenuEntry> = self.entries.values().collect();
        entries.sort_by_key(|entry| entry.seq);
        entries.iter().map(|entry| entry.menu_key.as_str()).collect()
    }

    /// `menuHashes=<key>-<key>-...` for outgoing requests, or `None` when the
    /// cache is empty.
    pub fn request_param(&self) -> Option<(&'static str, String)> {
        if self.entries.is_empty() {
            return None;
        }
        Some((MENU_HASHES_PARAM, self.keys().join("-")))
    }

    /// Swap the rendered menu region. Does not touch the cache.
    pub fn replace(&self, view: &mut dyn ViewPort, content_html: &str) {
        view.replace_menu(content_html);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
