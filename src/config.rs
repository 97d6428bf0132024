//! Navigator configuration and the translated-message table.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::url_hash::DEFAULT_BOOKMARK_PREFIX;
use crate::{NavError, MAX_CACHE_SIZE};

/// Top-level regions that survive a content swap.
pub const DEFAULT_PRESERVED_REGIONS: &[&str] = &[
    "pma_navigation",
    "floating_menubar",
    "goto_pagetop",
    "lock_page_icon",
    "page_content",
    "selflink",
    "session_debug",
    "pma_header",
    "pma_footer",
    "pma_demo",
    "pma_console_container",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigatorConfig {
    /// Snapshots kept in the page history.
    pub page_capacity: usize,
    /// Menu fragments kept in the menu cache. Must be >= `page_capacity`.
    pub menu_capacity: usize,
    /// Routes a startup deep link may redirect to.
    pub redirect_allowlist: Vec<String>,
    /// Legacy self-link routes and their replacements.
    pub selflink_aliases: BTreeMap<String, String>,
    pub preserved_regions: Vec<String>,
    /// Endpoint serving batched scripts.
    pub script_endpoint: String,
    pub bookmark_prefix: String,
    pub messages: Messages,
}

impl Default for NavigatorConfig {
    fn default() -> Self {
        let mut selflink_aliases = BTreeMap::new();
        selflink_aliases.insert("import.php".to_string(), "tbl_sql.php".to_string());
        Self {
            page_capacity: MAX_CACHE_SIZE,
            menu_capacity: MAX_CACHE_SIZE,
            redirect_allowlist: Vec::new(),
            selflink_aliases,
            preserved_regions: DEFAULT_PRESERVED_REGIONS.iter().map(|r| r.to_string()).collect(),
            script_endpoint: "js/get_scripts.js.php".to_string(),
            bookmark_prefix: DEFAULT_BOOKMARK_PREFIX.to_string(),
            messages: Messages::default(),
        }
    }
}

impl NavigatorConfig {
    /// Parse and validate a TOML config. Missing keys take defaults.
    pub fn from_toml_str(source: &str) -> Result<Self, NavError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, NavError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    pub fn validate(&self) -> Result<(), NavError> {
        if self.page_capacity == 0 || self.menu_capacity == 0 {
            return Err(NavError::Config("cache capacities must be at least 1".into()));
        }
        if self.menu_capacity < self.page_capacity {
            return Err(NavError::Config(format!(
                "menu_capacity ({}) must be >= page_capacity ({}) so every cached page keeps its menu",
                self.menu_capacity, self.page_capacity
            )));
        }
        if self.bookmark_prefix.is_empty() || self.bookmark_prefix.contains(':') {
            return Err(NavError::Config(format!(
                "invalid bookmark_prefix `{}`",
                self.bookmark_prefix
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// User-facing strings. `%s` marks a substitution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Messages {
    pub loading: String,
    pub aborted_request: String,
    pub invalid_page: String,
    pub confirm_navigation: String,
    pub lock_tooltip: String,
    pub error_processing_request: String,
    pub error_code: String,
    pub error_text: String,
    pub errors_found: String,
    pub errors_being_submitted: String,
}

impl Default for Messages {
    fn default() -> Self {
        Self {
            loading: "Loading…".into(),
            aborted_request: "Request aborted!!".into(),
            invalid_page: "The requested page was not found in the history, it may have expired.".into(),
            confirm_navigation: "You have unsaved changes; are you sure you want to leave this page?".into(),
            lock_tooltip: "There are unsaved changes on this page.".into(),
            error_processing_request: "Error in processing request".into(),
            error_code: "Error code: %s".into(),
            error_text: "Error text: %s".into(),
            errors_found: "<div class=\"error\">Some errors have been detected on the server!</div>".into(),
            errors_being_submitted: "<div class=\"error\">Some errors have been detected on the server! They are being submitted.</div>".into(),
        }
    }
}
