//! Headless host: an in-memory rendering surface plus recording transport and
//! module registry. Used by the replay tool and the test suites.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use serde::Serialize;

use crate::envelope::PageRequest;
use crate::scripts::{ModuleRegistry, ScriptBatch};
use crate::transport::{CancelHandle, RequestId, Transport};
use crate::viewport::ViewPort;
use crate::{Notice, NoticeLevel};

// ---------------------------------------------------------------------------
// MemoryViewPort
// ---------------------------------------------------------------------------

/// A rendering surface that just stores what it is told.
#[derive(Debug, Clone, Serialize)]
pub struct MemoryViewPort {
    pub content: String,
    pub selflink_html: String,
    pub selflink_href: Option<String>,
    pub title: Option<String>,
    pub menu: Option<String>,
    pub menu_layouts: usize,
    pub debug_panel: Option<String>,
    pub errors_panel: Option<String>,
    pub error_reports_submitted: usize,
    pub navigation_reloads: usize,
    /// Identifiers of top-level regions currently on the page.
    pub regions: Vec<String>,
    pub field_errors: BTreeSet<String>,
    pub lock_indicator: Option<String>,
    pub notices: Vec<Notice>,
    pub loading: bool,
    /// Answer given to every confirmation prompt.
    pub confirm_answer: bool,
    pub prompts: Vec<String>,
    pub interception_binds: usize,
    pub href: String,
    pub fragment_writes: Vec<String>,
    pub documents_loaded: Vec<String>,
}

impl Default for MemoryViewPort {
    fn default() -> Self {
        Self {
            content: String::new(),
            selflink_html: String::new(),
            selflink_href: None,
            title: None,
            menu: None,
            menu_layouts: 0,
            debug_panel: None,
            errors_panel: None,
            error_reports_submitted: 0,
            navigation_reloads: 0,
            regions: vec!["page_content".into(), "selflink".into()],
            field_errors: BTreeSet::new(),
            lock_indicator: None,
            notices: Vec::new(),
            loading: false,
            confirm_answer: true,
            prompts: Vec::new(),
            interception_binds: 0,
            href: "index.php".into(),
            fragment_writes: Vec::new(),
            documents_loaded: Vec::new(),
        }
    }
}

impl MemoryViewPort {
    pub fn at(href: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            ..Self::default()
        }
    }

    pub fn with_content(mut self, html: impl Into<String>) -> Self {
        self.content = html.into();
        self
    }

    /// Current fragment (without `#`), if any.
    pub fn fragment(&self) -> Option<&str> {
        self.href.split_once('#').map(|(_, fragment)| fragment)
    }

    pub fn last_notice(&self) -> Option<&Notice> {
        self.notices.iter().rev().find(|n| n.level != NoticeLevel::Loading)
    }
}

impl ViewPort for MemoryViewPort {
    fn content_html(&self) -> String {
        self.content.clone()
    }

    fn replace_content(&mut self, html: &str) {
        self.content = html.to_string();
    }

    fn prepend_content(&mut self, html: &str) {
        self.content.insert_str(0, html);
    }

    fn selflink_html(&self) -> String {
        self.selflink_html.clone()
    }

    fn replace_selflink(&mut self, html: &str) {
        self.selflink_html = html.to_string();
    }

    fn set_selflink_href(&mut self, href: &str) {
        self.selflink_href = Some(href.to_string());
        self.selflink_html = format!("<a href=\"{href}\"></a>");
    }

    fn replace_title(&mut self, html: &str) {
        self.title = Some(html.to_string());
    }

    fn replace_menu(&mut self, html: &str) {
        self.menu = Some(html.to_string());
        self.menu_layouts += 1;
    }

    fn replace_debug_panel(&mut self, html: &str) {
        self.debug_panel = Some(html.to_string());
    }

    fn set_errors_panel(&mut self, html: Option<&str>) {
        self.errors_panel = html.map(str::to_string);
    }

    fn submit_error_report(&mut self) {
        self.error_reports_submitted += 1;
    }

    fn reload_navigation(&mut self) {
        self.navigation_reloads += 1;
    }

    fn remove_stray_regions(&mut self, preserved: &[String]) {
        self.regions.retain(|region| preserved.contains(region));
    }

    fn set_field_error(&mut self, field_id: &str) {
        self.field_errors.clear();
        self.field_errors.insert(field_id.to_string());
    }

    fn set_lock_indicator(&mut self, tooltip: Option<&str>) {
        self.lock_indicator = tooltip.map(str::to_string);
    }

    fn show_notice(&mut self, notice: Notice) {
        if notice.level == NoticeLevel::Loading {
            self.loading = true;
        }
        self.notices.push(notice);
    }

    fn dismiss_loading(&mut self) {
        self.loading = false;
    }

    fn confirm(&mut self, message: &str) -> bool {
        self.prompts.push(message.to_string());
        self.confirm_answer
    }

    fn bind_interception(&mut self) {
        self.interception_binds += 1;
    }

    fn location_href(&self) -> String {
        self.href.clone()
    }

    fn set_fragment(&mut self, fragment: &str) {
        let base = self.href.split('#').next().unwrap_or_default().to_string();
        self.href = format!("{base}#{fragment}");
        self.fragment_writes.push(fragment.to_string());
    }

    fn load_document(&mut self, url: &str) {
        self.href = url.to_string();
        self.documents_loaded.push(url.to_string());
    }
}

// ---------------------------------------------------------------------------
// RecordingTransport
// ---------------------------------------------------------------------------

/// Keeps every dispatched request; responses are fed in by the caller.
#[derive(Debug, Clone, Default)]
pub struct RecordingTransport {
    pub sent: Vec<(RequestId, PageRequest)>,
    /// Whether handles created from now on can still be aborted.
    pub abortable: bool,
    aborted: Arc<Mutex<Vec<RequestId>>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self {
            abortable: true,
            ..Self::default()
        }
    }

    pub fn last_id(&self) -> Option<RequestId> {
        self.sent.last().map(|(id, _)| *id)
    }

    pub fn last_request(&self) -> Option<&PageRequest> {
        self.sent.last().map(|(_, request)| request)
    }

    pub fn aborted(&self) -> Vec<RequestId> {
        self.aborted.lock().map(|ids| ids.clone()).unwrap_or_default()
    }
}

struct RecordedCancel {
    id: RequestId,
    abortable: bool,
    aborted: Arc<Mutex<Vec<RequestId>>>,
}

impl CancelHandle for RecordedCancel {
    fn abort(&mut self) -> bool {
        if !self.abortable {
            return false;
        }
        if let Ok(mut ids) = self.aborted.lock() {
            ids.push(self.id);
        }
        true
    }
}

impl Transport for RecordingTransport {
    fn send(&mut self, id: RequestId, request: &PageRequest) -> Box<dyn CancelHandle> {
        self.sent.push((id, request.clone()));
        Box::new(RecordedCancel {
            id,
            abortable: self.abortable,
            aborted: Arc::clone(&self.aborted),
        })
    }
}

// ---------------------------------------------------------------------------
// RecordingRegistry
// ---------------------------------------------------------------------------

/// Keeps every requested script batch; completion is reported by the caller.
#[derive(Debug, Clone, Default)]
pub struct RecordingRegistry {
    pub batches: Vec<ScriptBatch>,
}

impl ModuleRegistry for RecordingRegistry {
    fn fetch(&mut self, batch: &ScriptBatch) {
        self.batches.push(batch.clone());
    }
}
