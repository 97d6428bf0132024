//! Script dependency tracking.
//!
//! Keeps track of which script files are already installed, requests the
//! missing ones for an incoming page in a single batch, and remembers which
//! files must have their onload/teardown handlers fired for the page on
//! screen.

use std::collections::HashSet;

use serde::Serialize;

use crate::ScriptDescriptor;

/// Identifies one batched script fetch.
pub type BatchId = u64;

/// A single batched request for every file the incoming page is missing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScriptBatch {
    pub id: BatchId,
    pub files: Vec<String>,
    /// `<endpoint>?scripts%5B%5D=a.js&...&call_done=1`
    pub url: String,
}

/// Capability that installs script modules.
///
/// `fetch` starts loading a batch; the host reports completion through
/// [`Navigator::scripts_loaded`](crate::Navigator::scripts_loaded) once every
/// file in it has run its top-level registration code.
pub trait ModuleRegistry {
    fn fetch(&mut self, batch: &ScriptBatch);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    /// Nothing to fetch; completion may run right away.
    Ready,
    /// Waiting for batch `BatchId`.
    Pending(BatchId),
}

#[derive(Debug, Clone)]
pub struct ScriptLoader {
    endpoint: String,
    loaded: HashSet<String>,
    /// Files whose handlers fire for the page currently installed.
    to_fire: Vec<String>,
    pending: Option<BatchId>,
    next_batch: BatchId,
}

impl ScriptLoader {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            loaded: HashSet::new(),
            to_fire: Vec::new(),
            pending: None,
            next_batch: 0,
        }
    }

    /// Mark `file` as already present. With `will_fire` its handlers also
    /// fire on the next teardown.
    pub fn record(&mut self, file: &str, will_fire: bool) {
        self.loaded.insert(file.to_string());
        if will_fire && !self.to_fire.iter().any(|f| f == file) {
            self.to_fire.push(file.to_string());
        }
    }

    /// Prepare the scripts for an incoming page.
    ///
    /// The fire list becomes exactly the page's firing scripts. Files not
    /// yet present are requested from `registry` in one batch.
    pub fn load(&mut self, files: &[ScriptDescriptor], registry: &mut dyn ModuleRegistry) -> LoadStatus {
        self.to_fire = files
            .iter()
            .filter(|file| file.fire)
            .map(|file| file.name.clone())
            .collect();

        let mut missing: Vec<String> = Vec::new();
        for file in files {
            if self.loaded.insert(file.name.clone()) {
                missing.push(file.name.clone());
            }
        }

        if missing.is_empty() {
            self.pending = None;
            return LoadStatus::Ready;
        }

        self.next_batch += 1;
        let batch = ScriptBatch {
            id: self.next_batch,
            url: batch_url(&self.endpoint, &missing),
            files: missing,
        };
        tracing::debug!(batch = batch.id, files = ?batch.files, "requesting scripts");
        registry.fetch(&batch);
        self.pending = Some(batch.id);
        LoadStatus::Pending(batch.id)
    }

    /// Accept completion of `batch`. Stale batches are ignored.
    pub fn complete(&mut self, batch: BatchId) -> bool {
        if self.pending == Some(batch) {
            self.pending = None;
            true
        } else {
            tracing::debug!(batch, "ignoring stale script batch");
            false
        }
    }

    /// Drain the fire list for teardown of the outgoing page.
    pub fn take_fire_list(&mut self) -> Vec<String> {
        std::mem::take(&mut self.to_fire)
    }

    pub fn fire_list(&self) -> &[String] {
        &self.to_fire
    }

    pub fn pending(&self) -> Option<BatchId> {
        self.pending
    }

    pub fn is_loaded(&self, file: &str) -> bool {
        self.loaded.contains(file)
    }
}

fn batch_url(endpoint: &str, files: &[String]) -> String {
    let mut query = url::form_urlencoded::Serializer::new(String::new());
    for file in files {
        query.append_pair("scripts[]", file);
    }
    query.append_pair("call_done", "1");
    format!("{}?{}", endpoint, query.finish())
}
