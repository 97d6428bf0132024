//! # Zenith Navigator
//!
//! Client-side page navigation for the server-rendered admin shell.
//!
//! Link clicks and form submissions are turned into asynchronous fragment
//! requests; the server answers with a JSON envelope whose markup replaces the
//! single content region and the single menu region. Visited pages are kept in
//! a small history cache so back/forward ("microhistory") replays them without
//! going back to the server.
//!
//! The navigator never touches a rendering surface directly. Everything that
//! would be DOM work goes through [`ViewPort`], network I/O through
//! [`Transport`], and script installation through [`ModuleRegistry`]. The
//! host feeds results back in (`on_response`, `scripts_loaded`, ...) on the
//! same event loop that produced the request.

pub mod cache;
pub mod config;
pub mod driver;
pub mod envelope;
pub mod events;
pub mod lock;
pub mod memory;
pub mod navigator;
pub mod scripts;
pub mod transport;
pub mod url_hash;
pub mod utils;
pub mod viewport;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use cache::menu_cache::MenuCache;
pub use cache::page_history::{AddOutcome, PageHistory, PageSnapshot};
pub use config::{Messages, NavigatorConfig};
pub use envelope::{Method, PageRequest, ResponseEnvelope};
pub use events::EventRegistry;
pub use lock::LockGuard;
pub use memory::MemoryViewPort;
pub use navigator::{Applied, Bypass, Dispatch, FormSubmission, LinkClick, NavState, Navigator, Primer, Trigger};
pub use scripts::{ModuleRegistry, ScriptBatch, ScriptLoader};
pub use transport::{CancelHandle, NetEvent, RequestId, Transport, TransportFailure};
pub use url_hash::UrlHashSync;
pub use viewport::ViewPort;

/// Default capacity shared by the page history and the menu cache.
pub const MAX_CACHE_SIZE: usize = 6;

// ---------------------------------------------------------------------------
// Script descriptors
// ---------------------------------------------------------------------------

/// A script a page depends on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptDescriptor {
    /// File identifier, e.g. `db_structure.js`.
    pub name: String,
    /// Whether the file registers onload/teardown handlers.
    #[serde(default, deserialize_with = "utils::de_flag")]
    pub fire: bool,
}

impl ScriptDescriptor {
    pub fn new(name: impl Into<String>, fire: bool) -> Self {
        Self {
            name: name.into(),
            fire,
        }
    }
}

// ---------------------------------------------------------------------------
// Relation hint
// ---------------------------------------------------------------------------

/// How a response relates to the page currently on screen.
///
/// Carried by the element that started the navigation (`rel` attribute).
/// Without a hint the history compares bookmark keys with the previous entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Relation {
    SamePage,
    NewPage,
}

impl Relation {
    /// Parse a `rel` attribute value. Anything but the two known hints is `None`.
    pub fn from_rel(rel: &str) -> Option<Self> {
        match rel {
            "samepage" => Some(Relation::SamePage),
            "newpage" => Some(Relation::NewPage),
            _ => None,
        }
    }
}

/// Shared client route/application parameters (`db`, `table`, `server`, ...).
pub type RouteParams = BTreeMap<String, serde_json::Value>;

// ---------------------------------------------------------------------------
// Notices
// ---------------------------------------------------------------------------

/// A user-visible message box.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub html: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    /// Shown while a request is outstanding; dismissed on success.
    Loading,
    Info,
    Error,
}

impl Notice {
    pub fn loading(html: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Loading,
            html: html.into(),
        }
    }

    pub fn info(html: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            html: html.into(),
        }
    }

    pub fn error(html: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            html: html.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// NavError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum NavError {
    #[error("History entry {index} is missing or no longer replayable")]
    InvalidPage { index: usize },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Malformed config file: {0}")]
    ConfigSyntax(#[from] toml::de::Error),

    #[error("Malformed response envelope: {0}")]
    Envelope(#[from] serde_json::Error),

    #[error("Malformed bookmark `{0}`")]
    Bookmark(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
