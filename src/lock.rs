//! Unsaved-edit tracking for lock-page forms.
//!
//! A tracked field is dirty while the hash of its current value differs from
//! the hash recorded when it was last clean. While any field is dirty a
//! click-initiated navigation asks the user before leaving.

use std::collections::{BTreeSet, HashMap};

use crate::utils;

#[derive(Debug, Clone, Default)]
pub struct LockGuard {
    baselines: HashMap<String, u32>,
    locked: BTreeSet<String>,
}

impl LockGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the clean value of a field.
    pub fn track(&mut self, lock_id: &str, clean_value: &str) {
        self.baselines.insert(lock_id.to_string(), utils::hash(clean_value));
        self.locked.remove(lock_id);
    }

    /// Re-evaluate a field after an edit. Returns whether anything is locked.
    ///
    /// A field edited without a recorded baseline counts as dirty.
    pub fn edit(&mut self, lock_id: &str, value: &str) -> bool {
        let current = utils::hash(value);
        if self.baselines.get(lock_id) == Some(&current) {
            self.locked.remove(lock_id);
        } else {
            self.locked.insert(lock_id.to_string());
        }
        !self.locked.is_empty()
    }

    /// Keystroke variant of [`edit`](Self::edit). Non-printing keys (character
    /// code 0, e.g. Enter) leave the lock state alone and return `None`.
    pub fn keystroke(&mut self, lock_id: &str, char_code: u32, value: &str) -> Option<bool> {
        if char_code == 0 {
            return None;
        }
        Some(self.edit(lock_id, value))
    }

    /// Clear every lock, e.g. on form reset or once navigation proceeds.
    pub fn reset(&mut self) {
        self.locked.clear();
    }

    pub fn is_locked(&self) -> bool {
        !self.locked.is_empty()
    }

    pub fn locked_ids(&self) -> impl Iterator<Item = &str> {
        self.locked.iter().map(String::as_str)
    }
}
