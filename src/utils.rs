//! Utility functions for the navigator.
//!
//! - Content hashing for event channels and lock baselines
//! - Location rewriting (token stripping, session-expiry marker, legacy aliases)
//! - HTML escaping for templated notices
//! - Lenient decoding of the server's wire flags

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer};

use crate::RouteParams;

// ---------------------------------------------------------------------------
// Content Hasher
// ---------------------------------------------------------------------------

/// Jenkins one-at-a-time hash over the UTF-16 code units of `key`.
///
/// Arithmetic is 32-bit signed with wraparound so the value matches what the
/// server computes for the same key. Not cryptographic; only used as an
/// opaque bucket identifier.
pub fn hash(key: &str) -> u32 {
    let mut h: i32 = 0;
    for unit in key.encode_utf16() {
        h = h.wrapping_add(unit as i32);
        h = h.wrapping_add(h.wrapping_shl(10));
        h ^= h >> 6;
    }
    h = h.wrapping_add(h.wrapping_shl(3));
    h ^= h >> 11;
    h = h.wrapping_add(h.wrapping_shl(15));
    h.unsigned_abs()
}

// ---------------------------------------------------------------------------
// Location Rewriting
// ---------------------------------------------------------------------------

static TOKEN_PARAM: Lazy<Regex> = Lazy::new(|| Regex::new(r"&?token=[^&#]*").expect("valid regex"));

/// Remove every `token=...` query parameter from a location.
pub fn strip_token_param(href: &str) -> String {
    TOKEN_PARAM.replace_all(href, "").into_owned()
}

/// Append a raw `name=value` pair to the query of `href`, keeping any fragment last.
pub fn append_query_param(href: &str, pair: &str) -> String {
    let (base, fragment) = match href.find('#') {
        Some(pos) => (&href[..pos], &href[pos..]),
        None => (href, ""),
    };
    let sep = if base.contains('?') { '&' } else { '?' };
    format!("{base}{sep}{pair}{fragment}")
}

/// Rewrite a self-link whose route matches a known legacy alias.
///
/// Only the path part (before `?`) is compared; the query is kept.
pub fn rewrite_selflink(selflink: &str, aliases: &BTreeMap<String, String>) -> String {
    let source = selflink.split('?').next().unwrap_or_default();
    match aliases.get(source) {
        Some(replacement) => selflink.replacen(source, replacement, 1),
        None => selflink.to_string(),
    }
}

// ---------------------------------------------------------------------------
// HTML Escaping
// ---------------------------------------------------------------------------

/// Escape text for safe embedding in notice markup.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 16);
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            c => out.push(c),
        }
    }
    out
}

/// Substitute the first `%s` of a translated message.
pub fn format_message(template: &str, arg: &str) -> String {
    template.replacen("%s", arg, 1)
}

// ---------------------------------------------------------------------------
// Wire Decoding
// ---------------------------------------------------------------------------

/// Decode a boolean flag sent as `true`, `1` or `"1"`.
///
/// Numeric strings follow integer parsing (`"0"` is false); `null` is false.
pub fn de_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(flag_value(&value))
}

fn flag_value(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Bool(b) => *b,
        serde_json::Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        serde_json::Value::String(s) => match s.trim().parse::<i64>() {
            Ok(n) => n != 0,
            Err(_) => s.eq_ignore_ascii_case("true"),
        },
        _ => false,
    }
}

/// Decode route parameters. The server sends an empty list instead of an
/// empty object when there are none.
pub fn de_params<'de, D>(deserializer: D) -> Result<Option<RouteParams>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Object(map)) => Some(map.into_iter().collect()),
        Some(serde_json::Value::Array(items)) if items.is_empty() => Some(RouteParams::new()),
        _ => None,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
