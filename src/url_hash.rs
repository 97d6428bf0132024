//! Binding between the URL fragment and the history cursor.
//!
//! Every recorded page publishes `#<prefix><index>:<route>`. Pressing back or
//! forward changes the fragment, which maps back to a history slot. Writes made
//! by the navigator itself are flagged so they never trigger a replay.

use std::fmt;

use crate::NavError;

pub const DEFAULT_BOOKMARK_PREFIX: &str = "PMAURL-";

/// A history slot plus the canonical route rendered there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bookmark {
    pub index: usize,
    pub route: String,
}

impl Bookmark {
    pub fn new(index: usize, route: impl Into<String>) -> Self {
        Self {
            index,
            route: route.into(),
        }
    }

    /// Fragment text (no leading `#`).
    pub fn encode(&self, prefix: &str) -> String {
        format!("{}{}:{}", prefix, self.index, self.route)
    }

    /// Parse a fragment, with or without the leading `#`.
    pub fn parse(fragment: &str, prefix: &str) -> Result<Self, NavError> {
        let malformed = || NavError::Bookmark(fragment.to_string());
        let body = fragment.strip_prefix('#').unwrap_or(fragment);
        let rest = body.strip_prefix(prefix).ok_or_else(malformed)?;
        let (index, route) = rest.split_once(':').ok_or_else(malformed)?;
        if index.is_empty() || !index.bytes().all(|b| b.is_ascii_digit()) {
            return Err(malformed());
        }
        let index = index.parse().map_err(|_| malformed())?;
        Ok(Self::new(index, route))
    }
}

impl fmt::Display for Bookmark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode(DEFAULT_BOOKMARK_PREFIX))
    }
}

/// Result of inspecting the fragment present on first load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Startup {
    /// Deep link to an allow-listed route: leave for this URL.
    Redirect(String),
    /// Stay; bookmarks are published once the page reports ready.
    Stay,
}

#[derive(Debug, Clone)]
pub struct UrlHashSync {
    prefix: String,
    ready: bool,
    saved: Option<String>,
    /// Our own last fragment write, until the host echoes it back.
    self_written: Option<String>,
}

impl UrlHashSync {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            ready: false,
            saved: None,
            self_written: None,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Inspect the startup fragment.
    ///
    /// A deep link is `#<prefix><index>:<path>?<query>`; only the `<path>`
    /// part is checked against `allowlist`, and the redirect target is
    /// everything after the colon.
    pub fn startup(&mut self, fragment: &str, allowlist: &[String]) -> Startup {
        let body = fragment.strip_prefix('#').unwrap_or(fragment);
        if !body.starts_with(self.prefix.as_str()) {
            return Startup::Stay;
        }
        let (Some(colon), Some(question)) = (body.find(':'), body.find('?')) else {
            return Startup::Stay;
        };
        if colon > question {
            return Startup::Stay;
        }
        let path = &body[colon + 1..question];
        if allowlist.iter().any(|allowed| allowed == path) {
            Startup::Redirect(body[colon + 1..].to_string())
        } else {
            tracing::warn!(path, "deep link target not on the redirect allow-list");
            Startup::Stay
        }
    }

    /// The page finished initializing. Returns a bookmark saved before then,
    /// which the caller writes to the fragment.
    pub fn initialized(&mut self) -> Option<String> {
        self.ready = true;
        let fragment = self.saved.take()?;
        self.self_written = Some(fragment.clone());
        Some(fragment)
    }

    /// Publish a bookmark. Returns the fragment to write now, or `None` when
    /// it was saved for [`initialized`](Self::initialized).
    pub fn publish(&mut self, bookmark: &Bookmark) -> Option<String> {
        let fragment = bookmark.encode(&self.prefix);
        if self.ready {
            self.self_written = Some(fragment.clone());
            Some(fragment)
        } else {
            self.saved = Some(fragment);
            None
        }
    }

    /// The fragment changed. Returns the history slot to replay when the
    /// change came from the user (back/forward, edited URL).
    ///
    /// The echo of our own last write is swallowed once. Any other change
    /// supersedes that write.
    pub fn on_fragment_change(&mut self, fragment: &str) -> Option<usize> {
        let body = fragment.strip_prefix('#').unwrap_or(fragment);
        if self.self_written.take().as_deref() == Some(body) {
            return None;
        }
        Bookmark::parse(body, &self.prefix).ok().map(|b| b.index)
    }
}
