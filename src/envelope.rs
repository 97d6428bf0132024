//! Wire formats: the outgoing page request and the server's response envelope.
//!
//! Field names on the envelope are the server's (`_menu`, `_menuHash`, ...).
//! Everything but `success` is optional; failure-path fields are only read
//! when `success` is false.

use serde::{Deserialize, Serialize};

use crate::{utils, NavError, RouteParams, ScriptDescriptor};

/// Parameters marking a request as an asynchronous full-fragment page request.
pub const PAGE_REQUEST_FLAGS: [(&str, &str); 2] = [("ajax_request", "true"), ("ajax_page_request", "true")];

// ---------------------------------------------------------------------------
// PageRequest
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
}

/// One navigation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageRequest {
    pub method: Method,
    pub url: String,
    /// `application/x-www-form-urlencoded` parameters: query string for GET,
    /// body for POST.
    pub params: String,
}

impl PageRequest {
    /// GET for a followed link.
    pub fn link(href: &str, menu_param: Option<(&str, String)>) -> Self {
        Self {
            method: Method::Get,
            url: href.to_string(),
            params: encode_params(&[], menu_param),
        }
    }

    /// POST for a submitted form, carrying its serialized fields.
    pub fn form(action: &str, fields: &[(String, String)], menu_param: Option<(&str, String)>) -> Self {
        Self {
            method: Method::Post,
            url: action.to_string(),
            params: encode_params(fields, menu_param),
        }
    }

    /// URL with the parameters appended, as sent for GET.
    pub fn query_url(&self) -> String {
        let sep = if self.url.contains('?') { '&' } else { '?' };
        format!("{}{}{}", self.url, sep, self.params)
    }
}

fn encode_params(fields: &[(String, String)], menu_param: Option<(&str, String)>) -> String {
    let mut query = url::form_urlencoded::Serializer::new(String::new());
    query.extend_pairs(PAGE_REQUEST_FLAGS);
    query.extend_pairs(fields.iter().map(|(k, v)| (k.as_str(), v.as_str())));
    if let Some((name, value)) = menu_param {
        query.append_pair(name, &value);
    }
    query.finish()
}

// ---------------------------------------------------------------------------
// ResponseEnvelope
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ResponseEnvelope {
    #[serde(default, deserialize_with = "utils::de_flag")]
    pub success: bool,

    /// New content-region markup.
    #[serde(default)]
    pub message: Option<String>,

    /// Message-only redirect; no DOM or cache update.
    #[serde(default, rename = "_redirect")]
    pub redirect_target: Option<String>,

    #[serde(default, rename = "_reloadNavigation", deserialize_with = "utils::de_flag")]
    pub reload_navigation: bool,

    #[serde(default, rename = "_title")]
    pub title: Option<String>,

    #[serde(default, rename = "_menu")]
    pub menu: Option<String>,

    #[serde(default, rename = "_menuHash")]
    pub menu_key: Option<String>,

    #[serde(default, rename = "_selflink")]
    pub selflink_target: Option<String>,

    #[serde(default, rename = "_scripts")]
    pub scripts: Option<Vec<ScriptDescriptor>>,

    #[serde(default, rename = "_params", deserialize_with = "utils::de_params")]
    pub route_params: Option<RouteParams>,

    #[serde(default, rename = "_displayMessage")]
    pub display_message: Option<String>,

    #[serde(default, rename = "_debug")]
    pub debug_panel: Option<String>,

    // -- error-report panel --------------------------------------------------
    #[serde(default, rename = "_errors")]
    pub errors_panel: Option<String>,

    #[serde(default, rename = "_errSubmitMsg")]
    pub error_submit_message: Option<String>,

    #[serde(default, rename = "_sendErrorAlways", deserialize_with = "utils::de_flag")]
    pub send_errors_always: bool,

    #[serde(default, rename = "_stopErrorReportLoop", deserialize_with = "utils::de_flag")]
    pub stop_error_loop: bool,

    #[serde(default, rename = "_promptPhpErrors", deserialize_with = "utils::de_flag")]
    pub prompt_for_errors: bool,

    // -- failure path ------------------------------------------------------------
    #[serde(default)]
    pub error: Option<String>,

    /// Session expired: reload with a marker.
    #[serde(default, deserialize_with = "utils::de_flag")]
    pub redirect_flag: bool,

    /// Stale token: strip it and reload.
    #[serde(default, deserialize_with = "utils::de_flag")]
    pub reload_flag: bool,

    #[serde(default, rename = "fieldWithError")]
    pub field_with_error: Option<String>,
}

impl ResponseEnvelope {
    pub fn from_json(source: &str) -> Result<Self, NavError> {
        Ok(serde_json::from_str(source)?)
    }

    /// Menu markup, ignoring empty strings.
    pub fn menu_html(&self) -> Option<&str> {
        self.menu.as_deref().filter(|m| !m.is_empty())
    }
}
