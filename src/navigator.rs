//! Request orchestration.
//!
//! [`Navigator`] owns every piece of navigation state: the single in-flight
//! request, the page history, the menu cache, the script loader, the event
//! registry and the lock guard. It is driven entirely by the host calling in
//! (`request`, `on_response`, `scripts_loaded`, `fragment_changed`, ...) and
//! only reaches out through its [`ViewPort`], [`Transport`] and
//! [`ModuleRegistry`].
//!
//! ```text
//!   Idle ──request──▶ Requesting ──success──▶ Applying ──scripts done──▶ Idle
//!    ▲                    │
//!    └──failure/redirect──┘
//! ```

use serde::{Deserialize, Serialize};

use crate::cache::page_history::{Captured, PageRecord};
use crate::config::NavigatorConfig;
use crate::envelope::{PageRequest, ResponseEnvelope};
use crate::events::EventRegistry;
use crate::lock::LockGuard;
use crate::scripts::{BatchId, LoadStatus, ModuleRegistry, ScriptLoader};
use crate::transport::{CancelHandle, NetEvent, RequestId, Transport, TransportFailure};
use crate::url_hash::{Bookmark, Startup, UrlHashSync};
use crate::utils;
use crate::viewport::ViewPort;
use crate::{AddOutcome, MenuCache, NavError, Notice, PageHistory, Relation, RouteParams, ScriptDescriptor};

// ---------------------------------------------------------------------------
// Triggers
// ---------------------------------------------------------------------------

/// A click on a link.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkClick {
    pub href: String,
    /// Explicit `target` attribute, e.g. `_blank`.
    pub target: Option<String>,
    pub shift_key: bool,
    pub ctrl_key: bool,
    /// Element carries the ajax-exempt marker.
    pub exempt: bool,
    /// Previous/next control of a calendar widget.
    pub datepicker_control: bool,
    /// `rel` attribute (`samepage` / `newpage`).
    pub rel: Option<String>,
    /// Click synthesized by a script rather than the user.
    pub scripted: bool,
}

impl LinkClick {
    pub fn new(href: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            ..Self::default()
        }
    }
}

/// A submitted form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormSubmission {
    pub action: String,
    /// Serialized fields in document order.
    pub fields: Vec<(String, String)>,
    pub target: Option<String>,
    pub exempt: bool,
    pub rel: Option<String>,
    /// The form's own inline submit handler returned false.
    pub inline_veto: bool,
}

impl FormSubmission {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            ..Self::default()
        }
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }
}

/// What started a navigation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Trigger {
    Link(LinkClick),
    Submit(FormSubmission),
}

impl Trigger {
    fn relation(&self) -> Option<Relation> {
        let rel = match self {
            Trigger::Link(link) => link.rel.as_deref(),
            Trigger::Submit(form) => form.rel.as_deref(),
        };
        rel.and_then(Relation::from_rel)
    }
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Why a trigger was left to the native handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Bypass {
    ModifierKey,
    ExplicitTarget,
    Exempt,
    FragmentLink,
    Mailto,
    CalendarControl,
    /// Anchor without an `href`.
    NoHref,
}

/// Result of [`Navigator::request`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Dispatch {
    /// Not ours; let the native handler run.
    Native(Bypass),
    /// The user kept their unsaved edits.
    Declined,
    /// The form's inline submit handler rejected the submission.
    Vetoed,
    /// Busy with a request or apply that cannot be cancelled.
    Dropped,
    Sent(RequestId),
}

/// Result of feeding a response or failure back in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Applied {
    /// Not the request in flight.
    Ignored,
    /// Request ended without a response (abort); busy cleared.
    Cancelled,
    /// Message-only redirect; nothing rendered.
    Redirected,
    Rendered,
    /// Server-reported or transport failure.
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavState {
    Idle,
    Requesting,
    Applying,
}

/// Initial page rendered by the server with the full document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Primer {
    /// Canonical route of the initial page.
    pub url: String,
    pub scripts: Vec<ScriptDescriptor>,
    pub menu_key: String,
    pub menu_html: String,
}

type AfterApply = Box<dyn FnOnce(&mut dyn ViewPort)>;

struct InFlight {
    id: RequestId,
    /// `None` for form submissions, which are never aborted.
    cancel: Option<Box<dyn CancelHandle>>,
    relation: Option<Relation>,
}

// ---------------------------------------------------------------------------
// Navigator
// ---------------------------------------------------------------------------

pub struct Navigator<V, T, R> {
    config: NavigatorConfig,
    view: V,
    transport: T,
    modules: R,
    state: NavState,
    in_flight: Option<InFlight>,
    next_request: RequestId,
    history: PageHistory,
    menus: MenuCache,
    scripts: ScriptLoader,
    events: EventRegistry,
    lock: LockGuard,
    url_hash: UrlHashSync,
    route_params: RouteParams,
    after_apply: Option<AfterApply>,
    /// History slot to replay once the pending script batch completes.
    pending_replay: Option<usize>,
}

impl<V, T, R> Navigator<V, T, R>
where
    V: ViewPort,
    T: Transport,
    R: ModuleRegistry,
{
    pub fn new(config: NavigatorConfig, view: V, transport: T, modules: R) -> Result<Self, NavError> {
        config.validate()?;
        Ok(Self {
            history: PageHistory::new(config.page_capacity),
            menus: MenuCache::new(config.menu_capacity),
            scripts: ScriptLoader::new(config.script_endpoint.clone()),
            url_hash: UrlHashSync::new(config.bookmark_prefix.clone()),
            events: EventRegistry::new(),
            lock: LockGuard::new(),
            state: NavState::Idle,
            in_flight: None,
            next_request: 0,
            route_params: RouteParams::new(),
            after_apply: None,
            pending_replay: None,
            config,
            view,
            transport,
            modules,
        })
    }

    // -----------------------------------------------------------------------
    // Startup
    // -----------------------------------------------------------------------

    /// Inspect the fragment present on first load. An allow-listed deep link
    /// leaves the page for its target.
    pub fn start(&mut self) -> Startup {
        let href = self.view.location_href();
        let fragment = href.split_once('#').map_or("", |(_, fragment)| fragment);
        let startup = self.url_hash.startup(fragment, &self.config.redirect_allowlist);
        if let Startup::Redirect(target) = &startup {
            tracing::info!(%target, "following deep link");
            self.view.load_document(target);
        }
        startup
    }

    /// Seed the caches with the page the server rendered along with the
    /// document.
    pub fn prime(&mut self, primer: Primer) -> AddOutcome {
        if primer.url.is_empty() {
            return AddOutcome::Unchanged;
        }
        for script in &primer.scripts {
            self.scripts.record(&script.name, script.fire);
        }
        let record = PageRecord {
            bookmark_key: primer.url,
            script_files: primer.scripts,
            menu_key: primer.menu_key.clone(),
            route_params: RouteParams::new(),
            relation: None,
        };
        let outcome = self.record_page(record);
        if !primer.menu_html.is_empty() {
            self.cache_menu(&primer.menu_key, &primer.menu_html);
        }
        outcome
    }

    /// Page initialization finished; flush a bookmark saved before then.
    pub fn page_ready(&mut self) {
        if let Some(fragment) = self.url_hash.initialized() {
            self.view.set_fragment(&fragment);
        }
    }

    // -----------------------------------------------------------------------
    // Dispatch
    // -----------------------------------------------------------------------

    /// Handle a click or submit.
    pub fn request(&mut self, trigger: Trigger) -> Dispatch {
        if let Some(bypass) = bypass(&trigger) {
            tracing::debug!(?bypass, "leaving navigation to the native handler");
            return Dispatch::Native(bypass);
        }
        if let Trigger::Submit(form) = &trigger {
            if form.inline_veto {
                return Dispatch::Vetoed;
            }
        }

        let user_click = matches!(&trigger, Trigger::Link(link) if !link.scripted);
        if user_click && self.lock.is_locked() && !self.view.confirm(&self.config.messages.confirm_navigation) {
            return Dispatch::Declined;
        }
        self.lock.reset();
        self.view.set_lock_indicator(None);

        if self.is_busy() && !self.abort_in_flight() {
            tracing::debug!(state = ?self.state, "busy; dropping navigation");
            return Dispatch::Dropped;
        }

        let relation = trigger.relation();
        let menu_param = self.menus.request_param();
        let (request, abortable) = match &trigger {
            Trigger::Link(link) => (PageRequest::link(&link.href, menu_param), true),
            Trigger::Submit(form) => (PageRequest::form(&form.action, &form.fields, menu_param), false),
        };

        self.next_request += 1;
        let id = self.next_request;
        tracing::debug!(id, method = ?request.method, url = %request.url, "loading");
        let cancel = self.transport.send(id, &request);
        self.in_flight = Some(InFlight {
            id,
            cancel: abortable.then_some(cancel),
            relation,
        });
        self.state = NavState::Requesting;
        self.view.show_notice(Notice::loading(&self.config.messages.loading));
        Dispatch::Sent(id)
    }

    /// Try to cancel the outstanding request so a new one can start.
    fn abort_in_flight(&mut self) -> bool {
        let Some(in_flight) = self.in_flight.as_mut() else {
            // Applying: runs to completion.
            return false;
        };
        let Some(cancel) = in_flight.cancel.as_mut() else {
            return false;
        };
        if !cancel.abort() {
            return false;
        }
        tracing::debug!(id = in_flight.id, "aborted request");
        self.in_flight = None;
        self.state = NavState::Idle;
        self.view.show_notice(Notice::info(&self.config.messages.aborted_request));
        true
    }

    // -----------------------------------------------------------------------
    // Responses
    // -----------------------------------------------------------------------

    /// Route a completion event from the host.
    pub fn handle_net(&mut self, event: NetEvent) {
        match event {
            NetEvent::Response { id, result: Ok(envelope) } => {
                self.on_response(id, envelope);
            }
            NetEvent::Response { id, result: Err(failure) } => {
                self.on_transport_failure(id, failure);
            }
            NetEvent::ScriptsLoaded { batch } => {
                self.scripts_loaded(batch);
            }
        }
    }

    /// Apply the server's answer to request `id`.
    pub fn on_response(&mut self, id: RequestId, envelope: ResponseEnvelope) -> Applied {
        let Some(in_flight) = self.take_in_flight(id) else {
            return Applied::Ignored;
        };

        if !envelope.success {
            self.apply_failure(&envelope);
            return Applied::Failed;
        }

        self.view.dismiss_loading();
        if let Some(target) = envelope.redirect_target.as_deref() {
            self.view.show_notice(Notice::info(target));
            self.state = NavState::Idle;
            return Applied::Redirected;
        }

        self.state = NavState::Applying;
        self.reset_page();
        self.apply_success(envelope, in_flight.relation);
        Applied::Rendered
    }

    /// A transport-level failure for request `id`.
    pub fn on_transport_failure(&mut self, id: RequestId, failure: TransportFailure) -> Applied {
        if self.take_in_flight(id).is_none() {
            return Applied::Ignored;
        }
        self.state = NavState::Idle;

        match failure {
            TransportFailure::Cancelled | TransportFailure::Status { code: 0, .. } => {
                tracing::debug!(id, "request ended without a response");
                self.view.dismiss_loading();
                Applied::Cancelled
            }
            TransportFailure::Network { text } => {
                tracing::warn!(id, %text, "page request failed before a response");
                self.show_request_error(0, &text);
                Applied::Failed
            }
            TransportFailure::Status { code, text } => {
                tracing::warn!(id, code, %text, "page request failed");
                self.show_request_error(code, &text);
                Applied::Failed
            }
        }
    }

    fn show_request_error(&mut self, code: u16, text: &str) {
        let messages = &self.config.messages;
        let code = utils::format_message(&messages.error_code, &code.to_string());
        let text = utils::format_message(&messages.error_text, text);
        let html = format!(
            "<div class=\"error\">{}<div>{}</div><div>{}</div></div>",
            messages.error_processing_request,
            utils::escape_html(&code),
            utils::escape_html(&text),
        );
        self.view.dismiss_loading();
        self.view.show_notice(Notice::error(html));
    }

    fn take_in_flight(&mut self, id: RequestId) -> Option<InFlight> {
        if self.in_flight.as_ref().map(|f| f.id) != Some(id) {
            tracing::warn!(id, "ignoring response for a request no longer in flight");
            return None;
        }
        self.in_flight.take()
    }

    fn apply_failure(&mut self, envelope: &ResponseEnvelope) {
        self.state = NavState::Idle;
        self.view.dismiss_loading();
        self.view.show_notice(Notice::error(envelope.error.clone().unwrap_or_default()));

        if envelope.redirect_flag {
            let href = utils::append_query_param(&self.view.location_href(), "session_expired=1");
            tracing::info!("session expired; reloading");
            self.view.load_document(&href);
        } else if envelope.reload_flag {
            let href = utils::strip_token_param(&self.view.location_href());
            tracing::info!("stale token; reloading");
            self.view.load_document(&href);
        }
        if let Some(field) = envelope.field_with_error.as_deref() {
            self.view.set_field_error(field);
        }
    }

    fn apply_success(&mut self, envelope: ResponseEnvelope, relation: Option<Relation>) {
        // 1. Chrome outside the content region
        if envelope.reload_navigation {
            self.view.reload_navigation();
        }
        if let Some(title) = envelope.title.as_deref() {
            self.view.replace_title(title);
        }
        if let Some(menu) = envelope.menu_html() {
            self.menus.replace(&mut self.view, menu);
        } else if let Some(key) = envelope.menu_key.as_deref() {
            match self.menus.get(key) {
                Some(menu) => self.view.replace_menu(menu),
                None => tracing::warn!(menu_key = key, "menu missing from cache; keeping current menu"),
            }
        }

        // 2. Content swap
        self.view.remove_stray_regions(&self.config.preserved_regions);
        if let Some(message) = envelope.message.as_deref().filter(|m| !m.is_empty()) {
            self.view.replace_content(message);
        }
        let selflink = envelope
            .selflink_target
            .as_deref()
            .map(|target| utils::rewrite_selflink(target, &self.config.selflink_aliases));
        if let Some(selflink) = selflink.as_deref() {
            self.view.set_selflink_href(selflink);
        }

        // 3. Scripts, then history
        let status = self.load_scripts(envelope.scripts.as_deref().unwrap_or_default());
        if let (Some(selflink), Some(scripts), Some(menu_key), Some(params)) = (
            selflink,
            envelope.scripts.clone(),
            envelope.menu_key.clone(),
            envelope.route_params.clone(),
        ) {
            self.record_page(PageRecord {
                bookmark_key: selflink,
                script_files: scripts,
                menu_key,
                route_params: params,
                relation,
            });
        }
        // Cached only after the record so eviction sees the pages still held.
        if let Some(key) = envelope.menu_key.as_deref() {
            match envelope.menu_html() {
                Some(menu) => self.cache_menu(key, menu),
                None => {
                    self.menus.touch(key);
                }
            }
        }
        if let Some(params) = envelope.route_params {
            self.route_params = params;
        }
        if let Some(banner) = envelope.display_message.as_deref() {
            self.view.prepend_content(banner);
        }

        // 4. Error-report panel and final notice
        self.view.set_errors_panel(None);
        let mut notice = envelope.error_submit_message.unwrap_or_default();
        if let Some(debug) = envelope.debug_panel.as_deref() {
            self.view.replace_debug_panel(debug);
        }
        if let Some(errors) = envelope.errors_panel.as_deref() {
            self.view.set_errors_panel(Some(errors));
            if envelope.send_errors_always && !envelope.stop_error_loop {
                self.view.submit_error_report();
                self.view
                    .show_notice(Notice::info(&self.config.messages.errors_being_submitted));
            } else if envelope.prompt_for_errors {
                notice.push_str(&self.config.messages.errors_found);
            }
        }
        if !notice.is_empty() {
            self.view.show_notice(Notice::info(notice));
        }

        if let Some(callback) = self.after_apply.take() {
            callback(&mut self.view);
        }

        if status == LoadStatus::Ready {
            self.state = NavState::Idle;
        }
    }

    fn cache_menu(&mut self, menu_key: &str, content_html: &str) {
        let history = &self.history;
        self.menus
            .add_retaining(menu_key, content_html, |key| history.references_menu(key));
    }

    fn record_page(&mut self, record: PageRecord) -> AddOutcome {
        let view = &self.view;
        let outcome = self.history.add(record, || Captured {
            content_html: view.content_html(),
            selflink_html: view.selflink_html(),
        });
        if let AddOutcome::Appended { index } = outcome {
            let key = self
                .history
                .get(index)
                .map(|page| page.bookmark_key.clone())
                .unwrap_or_default();
            if let Some(fragment) = self.url_hash.publish(&Bookmark::new(index, key)) {
                self.view.set_fragment(&fragment);
            }
        }
        outcome
    }

    // -----------------------------------------------------------------------
    // Script lifecycle
    // -----------------------------------------------------------------------

    /// Tear the outgoing page down before anything new is inserted.
    fn reset_page(&mut self) {
        for file in self.scripts.take_fire_list() {
            self.events.fire_teardown(&file, &mut self.view);
        }
        self.view.bind_interception();
        self.history.update(self.view.content_html());
    }

    fn load_scripts(&mut self, files: &[ScriptDescriptor]) -> LoadStatus {
        let status = self.scripts.load(files, &mut self.modules);
        if status == LoadStatus::Ready {
            self.fire_onload();
        }
        status
    }

    fn fire_onload(&mut self) {
        for file in self.scripts.fire_list().to_vec() {
            self.events.fire_onload(&file, &mut self.view);
        }
    }

    /// The module registry finished running `batch`. Returns whether it was
    /// the batch the current page was waiting on.
    pub fn scripts_loaded(&mut self, batch: BatchId) -> bool {
        if !self.scripts.complete(batch) {
            return false;
        }
        self.fire_onload();
        if self.state == NavState::Applying {
            self.state = NavState::Idle;
        }
        if let Some(index) = self.pending_replay.take() {
            if let Err(err) = self.navigate(index) {
                tracing::warn!(index, error = %err, "deferred history replay failed");
            }
        }
        true
    }

    // -----------------------------------------------------------------------
    // History
    // -----------------------------------------------------------------------

    /// Replay history slot `index` from the cache.
    ///
    /// An invalid slot shows the invalid-page notice and changes nothing.
    /// While the current page is still waiting on its scripts the replay is
    /// queued and runs when the batch completes.
    pub fn navigate(&mut self, index: usize) -> Result<(), NavError> {
        let page = match self.history.replayable(index, &self.menus) {
            Ok(page) => page.clone(),
            Err(err) => {
                tracing::warn!(index, "history entry cannot be replayed");
                let html = format!("<div class=\"error\">{}</div>", self.config.messages.invalid_page);
                self.view.show_notice(Notice::error(html));
                return Err(err);
            }
        };

        if self.state == NavState::Applying {
            tracing::debug!(index, "page scripts still loading; replay queued");
            self.pending_replay = Some(index);
            return Ok(());
        }

        if let Some(mut in_flight) = self.in_flight.take() {
            if let Some(cancel) = in_flight.cancel.as_mut() {
                cancel.abort();
            }
            tracing::debug!(id = in_flight.id, "history navigation superseded request");
            self.view.dismiss_loading();
        }

        self.state = NavState::Applying;
        self.reset_page();
        self.view.replace_content(&page.content_html);
        self.view.replace_selflink(&page.selflink_html);
        if let Some(menu) = self.menus.get(&page.menu_key) {
            self.view.replace_menu(menu);
        }
        self.menus.touch(&page.menu_key);
        self.route_params = page.route_params;
        let status = self.load_scripts(&page.script_files);
        self.history.set_current(index)?;
        if status == LoadStatus::Ready {
            self.state = NavState::Idle;
        }
        Ok(())
    }

    /// The URL fragment changed. Replays the bookmarked slot when the change
    /// came from the user.
    pub fn fragment_changed(&mut self, fragment: &str) -> Option<Result<(), NavError>> {
        let index = self.url_hash.on_fragment_change(fragment)?;
        Some(self.navigate(index))
    }

    // -----------------------------------------------------------------------
    // Lock page
    // -----------------------------------------------------------------------

    /// Record the clean value of a lock-page field.
    pub fn track_field(&mut self, lock_id: &str, clean_value: &str) {
        self.lock.track(lock_id, clean_value);
        self.refresh_lock_indicator();
    }

    /// An edit inside a lock-page field. Fields without a lock id are ignored.
    pub fn field_edited(&mut self, lock_id: Option<&str>, value: &str) -> bool {
        if let Some(lock_id) = lock_id {
            self.lock.edit(lock_id, value);
            self.refresh_lock_indicator();
        }
        self.lock.is_locked()
    }

    pub fn keystroke(&mut self, lock_id: Option<&str>, char_code: u32, value: &str) -> bool {
        if let Some(lock_id) = lock_id {
            if self.lock.keystroke(lock_id, char_code, value).is_some() {
                self.refresh_lock_indicator();
            }
        }
        self.lock.is_locked()
    }

    pub fn form_reset(&mut self) {
        self.lock.reset();
        self.refresh_lock_indicator();
    }

    fn refresh_lock_indicator(&mut self) {
        let tooltip = self
            .lock
            .is_locked()
            .then_some(self.config.messages.lock_tooltip.as_str());
        self.view.set_lock_indicator(tooltip);
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// Run `callback` once at the end of the next successful apply.
    pub fn after_next_apply<F>(&mut self, callback: F)
    where
        F: FnOnce(&mut dyn ViewPort) + 'static,
    {
        self.after_apply = Some(Box::new(callback));
    }

    pub fn events_mut(&mut self) -> &mut EventRegistry {
        &mut self.events
    }

    pub fn state(&self) -> NavState {
        self.state
    }

    pub fn is_busy(&self) -> bool {
        self.state != NavState::Idle
    }

    /// History slot queued behind the pending script batch.
    pub fn pending_replay(&self) -> Option<usize> {
        self.pending_replay
    }

    pub fn in_flight(&self) -> Option<RequestId> {
        self.in_flight.as_ref().map(|f| f.id)
    }

    pub fn history(&self) -> &PageHistory {
        &self.history
    }

    pub fn menus(&self) -> &MenuCache {
        &self.menus
    }

    pub fn scripts(&self) -> &ScriptLoader {
        &self.scripts
    }

    pub fn lock(&self) -> &LockGuard {
        &self.lock
    }

    pub fn route_params(&self) -> &RouteParams {
        &self.route_params
    }

    pub fn config(&self) -> &NavigatorConfig {
        &self.config
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut V {
        &mut self.view
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn modules(&self) -> &R {
        &self.modules
    }
}

fn bypass(trigger: &Trigger) -> Option<Bypass> {
    match trigger {
        Trigger::Link(link) => {
            if link.shift_key || link.ctrl_key {
                Some(Bypass::ModifierKey)
            } else if link.target.as_deref().is_some_and(|t| !t.is_empty()) {
                Some(Bypass::ExplicitTarget)
            } else if link.exempt {
                Some(Bypass::Exempt)
            } else if link.href.is_empty() {
                Some(Bypass::NoHref)
            } else if link.href.starts_with('#') {
                Some(Bypass::FragmentLink)
            } else if link.href.starts_with("mailto") {
                Some(Bypass::Mailto)
            } else if link.datepicker_control {
                Some(Bypass::CalendarControl)
            } else {
                None
            }
        }
        Trigger::Submit(form) => {
            if form.target.as_deref().is_some_and(|t| !t.is_empty()) {
                Some(Bypass::ExplicitTarget)
            } else if form.exempt {
                Some(Bypass::Exempt)
            } else {
                None
            }
        }
    }
}
