//! Per-file onload/teardown handler registry.
//!
//! Scripts register handlers against their own file identifier. When a page
//! that declares the file is installed its onload handlers run; just before
//! that page is torn down its teardown handlers run. Handlers are kept in
//! registration order and all of them fire, not only the first.

use std::collections::HashMap;
use std::fmt;

use serde::Deserialize;

use crate::utils;
use crate::viewport::ViewPort;

/// A lifecycle callback. Receives the surface it should (un)bind against.
pub type Handler = Box<dyn FnMut(&mut dyn ViewPort)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Onload,
    Teardown,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Onload => "onload",
            Phase::Teardown => "teardown",
        }
    }
}

/// Diagnostic name of the channel for `file`, e.g. `onload_216025292`.
pub fn channel_name(phase: Phase, file: &str) -> String {
    format!("{}_{}", phase.as_str(), utils::hash(file))
}

struct Channel {
    file: String,
    handlers: Vec<Handler>,
}

/// Registry of lifecycle handlers keyed by file identifier.
///
/// The content hash is only a bucket key; files that collide still get
/// separate channels.
#[derive(Default)]
pub struct EventRegistry {
    buckets: HashMap<(Phase, u32), Vec<Channel>>,
}

impl fmt::Debug for EventRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventRegistry")
            .field("channels", &self.buckets.values().map(Vec::len).sum::<usize>())
            .finish()
    }
}

impl EventRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_onload<F>(&mut self, file: &str, handler: F) -> &mut Self
    where
        F: FnMut(&mut dyn ViewPort) + 'static,
    {
        self.register(Phase::Onload, file, Box::new(handler))
    }

    pub fn register_teardown<F>(&mut self, file: &str, handler: F) -> &mut Self
    where
        F: FnMut(&mut dyn ViewPort) + 'static,
    {
        self.register(Phase::Teardown, file, Box::new(handler))
    }

    /// Run every onload handler registered for `file`. Returns how many ran.
    pub fn fire_onload(&mut self, file: &str, view: &mut dyn ViewPort) -> usize {
        self.fire(Phase::Onload, file, view)
    }

    /// Run every teardown handler registered for `file`. Returns how many ran.
    pub fn fire_teardown(&mut self, file: &str, view: &mut dyn ViewPort) -> usize {
        self.fire(Phase::Teardown, file, view)
    }

    /// Number of handlers registered for `file` in `phase`.
    pub fn handler_count(&self, phase: Phase, file: &str) -> usize {
        self.buckets
            .get(&(phase, utils::hash(file)))
            .and_then(|channels| channels.iter().find(|c| c.file == file))
            .map_or(0, |c| c.handlers.len())
    }

    fn register(&mut self, phase: Phase, file: &str, handler: Handler) -> &mut Self {
        let channels = self.buckets.entry((phase, utils::hash(file))).or_default();
        match channels.iter_mut().find(|c| c.file == file) {
            Some(channel) => channel.handlers.push(handler),
            None => channels.push(Channel {
                file: file.to_string(),
                handlers: vec![handler],
            }),
        }
        tracing::debug!(channel = %channel_name(phase, file), file, "registered handler");
        self
    }

    fn fire(&mut self, phase: Phase, file: &str, view: &mut dyn ViewPort) -> usize {
        let Some(channel) = self
            .buckets
            .get_mut(&(phase, utils::hash(file)))
            .and_then(|channels| channels.iter_mut().find(|c| c.file == file))
        else {
            return 0;
        };
        for handler in channel.handlers.iter_mut() {
            handler(&mut *view);
        }
        tracing::debug!(
            channel = %channel_name(phase, file),
            file,
            handlers = channel.handlers.len(),
            "fired channel"
        );
        channel.handlers.len()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::memory::MemoryViewPort;

    #[test]
    fn channel_names_use_content_hash() {
        assert_eq!(channel_name(Phase::Onload, "functions.js"), "onload_216025292");
        assert_eq!(channel_name(Phase::Teardown, "functions.js"), "teardown_216025292");
    }

    #[test]
    fn fires_all_handlers_in_registration_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut registry = EventRegistry::new();
        for tag in ["first", "second"] {
            let log = Rc::clone(&log);
            registry.register_onload("sql.js", move |_| log.borrow_mut().push(tag));
        }

        let mut view = MemoryViewPort::default();
        assert_eq!(registry.fire_onload("sql.js", &mut view), 2);
        assert_eq!(*log.borrow(), vec!["first", "second"]);
    }

    #[test]
    fn phases_are_separate_channels() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut registry = EventRegistry::new();
        let onload = Rc::clone(&log);
        let teardown = Rc::clone(&log);
        registry
            .register_onload("a.js", move |_| onload.borrow_mut().push("onload"))
            .register_teardown("a.js", move |_| teardown.borrow_mut().push("teardown"));

        let mut view = MemoryViewPort::default();
        registry.fire_teardown("a.js", &mut view);
        assert_eq!(*log.borrow(), vec!["teardown"]);
        assert_eq!(registry.fire_onload("b.js", &mut view), 0);
    }

    #[test]
    fn handlers_can_touch_the_surface() {
        let mut registry = EventRegistry::new();
        registry.register_onload("lock.js", |view| view.set_lock_indicator(Some("locked")));

        let mut view = MemoryViewPort::default();
        registry.fire_onload("lock.js", &mut view);
        assert_eq!(view.lock_indicator.as_deref(), Some("locked"));
    }
}
