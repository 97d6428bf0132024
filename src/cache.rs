//! Client-side page cache.
//!
//! Two stores back the microhistory:
//! - [`menu_cache::MenuCache`]: menu fragments keyed by their content hash,
//!   evicted oldest-first by capture time.
//! - [`page_history::PageHistory`]: visited page snapshots plus the cursor
//!   used by back/forward, trimmed first-in first-out.
//!
//! Snapshots only reference menus by key, so the menu cache must be at least
//! as large as the history for every live snapshot to stay replayable.

pub mod menu_cache;
pub mod page_history;
