//! tokio event loop for a [`Navigator`].
//!
//! The navigator lives on a single task; UI events and network completions
//! arrive over channels and are applied one at a time, so navigator state is
//! never shared and needs no locking.

use serde::Deserialize;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

use crate::navigator::{Navigator, Trigger};
use crate::scripts::{ModuleRegistry, ScriptBatch};
use crate::transport::{NetEvent, Transport};
use crate::viewport::ViewPort;

/// Input coming from the rendering surface.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum UiEvent {
    Trigger { trigger: Trigger },
    FragmentChanged { fragment: String },
    FieldEdited { lock_id: Option<String>, value: String },
    Keystroke { lock_id: Option<String>, char_code: u32, value: String },
    FormReset,
    PageReady,
}

/// Apply one UI event.
pub fn handle_ui<V, T, R>(navigator: &mut Navigator<V, T, R>, event: UiEvent)
where
    V: ViewPort,
    T: Transport,
    R: ModuleRegistry,
{
    match event {
        UiEvent::Trigger { trigger } => {
            let dispatch = navigator.request(trigger);
            tracing::debug!(?dispatch, "trigger handled");
        }
        UiEvent::FragmentChanged { fragment } => {
            if let Some(Err(err)) = navigator.fragment_changed(&fragment) {
                tracing::warn!(error = %err, %fragment, "history replay failed");
            }
        }
        UiEvent::FieldEdited { lock_id, value } => {
            navigator.field_edited(lock_id.as_deref(), &value);
        }
        UiEvent::Keystroke {
            lock_id,
            char_code,
            value,
        } => {
            navigator.keystroke(lock_id.as_deref(), char_code, &value);
        }
        UiEvent::FormReset => navigator.form_reset(),
        UiEvent::PageReady => navigator.page_ready(),
    }
}

/// Drive `navigator` until the UI channel closes and no navigation is in
/// progress. Network completions are always drained before the next UI
/// event. Returns the number of events applied.
pub async fn run<V, T, R>(
    navigator: &mut Navigator<V, T, R>,
    mut ui: UnboundedReceiver<UiEvent>,
    mut net: UnboundedReceiver<NetEvent>,
) -> usize
where
    V: ViewPort,
    T: Transport,
    R: ModuleRegistry,
{
    let mut ui_open = true;
    let mut applied = 0;
    loop {
        if !ui_open && !navigator.is_busy() {
            break;
        }
        tokio::select! {
            biased;
            Some(event) = net.recv() => {
                navigator.handle_net(event);
                applied += 1;
            }
            event = ui.recv(), if ui_open => match event {
                Some(event) => {
                    handle_ui(navigator, event);
                    applied += 1;
                }
                None => ui_open = false,
            },
            else => {
                tracing::warn!(state = ?navigator.state(), "event channels closed while busy");
                break;
            }
        }
    }
    applied
}

/// Module registry for scripts linked into the host: a fetched batch has
/// already run, so completion is posted straight back to the loop.
#[derive(Debug, Clone)]
pub struct LoopbackRegistry {
    events: UnboundedSender<NetEvent>,
    fetched: Vec<ScriptBatch>,
}

impl LoopbackRegistry {
    pub fn new(events: UnboundedSender<NetEvent>) -> Self {
        Self {
            events,
            fetched: Vec::new(),
        }
    }

    pub fn fetched(&self) -> &[ScriptBatch] {
        &self.fetched
    }
}

impl ModuleRegistry for LoopbackRegistry {
    fn fetch(&mut self, batch: &ScriptBatch) {
        self.fetched.push(batch.clone());
        if self.events.send(NetEvent::ScriptsLoaded { batch: batch.id }).is_err() {
            tracing::debug!(batch = batch.id, "event loop gone; batch completion dropped");
        }
    }
}
