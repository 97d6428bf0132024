//! The rendering surface the navigator drives.
//!
//! Exactly one content region and one menu region are owned by the
//! navigator. Every other top-level region is left alone unless it is missing
//! from the preserve list handed to [`ViewPort::remove_stray_regions`].

use crate::Notice;

/// Rendering surface plus the window location it lives in.
///
/// Implementations must be cheap to call repeatedly; the navigator makes no
/// attempt to batch updates.
pub trait ViewPort {
    // -- content region ----------------------------------------------------

    /// Serialized markup of the content region.
    fn content_html(&self) -> String;

    fn replace_content(&mut self, html: &str);

    /// Insert a banner at the top of the content region.
    fn prepend_content(&mut self, html: &str);

    // -- self-link -----------------------------------------------------------

    /// Serialized markup of the self-link region.
    fn selflink_html(&self) -> String;

    fn replace_selflink(&mut self, html: &str);

    /// Point the self-link anchor at a new canonical URL.
    fn set_selflink_href(&mut self, href: &str);

    // -- chrome ----------------------------------------------------------------

    fn replace_title(&mut self, html: &str);

    /// Swap the menu region and re-run the menu's layout/resize behavior.
    fn replace_menu(&mut self, html: &str);

    fn replace_debug_panel(&mut self, html: &str);

    /// Replace the server error-report panel; `None` removes it.
    fn set_errors_panel(&mut self, html: Option<&str>);

    /// Submit the hidden error-report form.
    fn submit_error_report(&mut self);

    /// Refresh the externally owned site navigation widget.
    fn reload_navigation(&mut self);

    /// Remove every top-level region whose identifier is not in `preserved`.
    fn remove_stray_regions(&mut self, preserved: &[String]);

    /// Clear the error mark from all fields, then mark `field_id`.
    fn set_field_error(&mut self, field_id: &str);

    /// Show the unsaved-edits indicator with a tooltip, or hide it (`None`).
    fn set_lock_indicator(&mut self, tooltip: Option<&str>);

    // -- interaction -----------------------------------------------------------

    fn show_notice(&mut self, notice: Notice);

    /// Dismiss the loading notice shown when a request was dispatched.
    fn dismiss_loading(&mut self);

    /// Ask the user a yes/no question. Returns `true` to proceed.
    fn confirm(&mut self, message: &str) -> bool;

    /// (Re)attach the global click/submit interception. Must be idempotent.
    fn bind_interception(&mut self);

    // -- window location -----------------------------------------------------

    /// Full current location, including any fragment.
    fn location_href(&self) -> String;

    /// Write the URL fragment (without the leading `#`).
    fn set_fragment(&mut self, fragment: &str);

    /// Leave the single-page flow: full document load of `url`.
    fn load_document(&mut self, url: &str);
}
