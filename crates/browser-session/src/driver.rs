//! The page driver seam.
//!
//! Execution crates (step primitives, learner, issuer adapters) drive pages
//! only through this trait. The production implementation speaks CDP via
//! chromiumoxide; tests use [`crate::ScriptedPage`].

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::captcha::CaptchaOutcome;
use crate::errors::SessionError;

/// One form input discovered on a page, as seen by the learner.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FormField {
    /// CSS selector addressing the field (id-based where possible).
    pub selector: String,
    pub name: Option<String>,
    pub id: Option<String>,
    /// Visible label text associated with the field, if any.
    pub label: Option<String>,
    pub placeholder: Option<String>,
    /// The `type` attribute for inputs, or "select"/"textarea".
    pub input_type: String,
    pub required: bool,
}

impl FormField {
    /// All human-readable hints for this field, in inference priority order.
    pub fn hints(&self) -> impl Iterator<Item = &str> + Clone {
        self.label
            .as_deref()
            .into_iter()
            .chain(self.name.as_deref())
            .chain(self.id.as_deref())
            .chain(self.placeholder.as_deref())
    }
}

/// Driver for one open page within one session.
///
/// Every method blocks until the action settles or its timeout elapses;
/// a timeout is always an error, never a silent continue.
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Navigate to a URL and wait for the load to settle.
    async fn navigate(&self, url: &str) -> Result<(), SessionError>;

    /// Set the value of an input/textarea, firing input+change events.
    async fn fill(&self, selector: &str, value: &str) -> Result<(), SessionError>;

    /// Click the element matched by the selector.
    async fn click(&self, selector: &str) -> Result<(), SessionError>;

    /// Select an option (by value, falling back to visible text) in a
    /// `<select>` element.
    async fn select_option(&self, selector: &str, value: &str) -> Result<(), SessionError>;

    /// Block until the selector matches a visible element, or fail after
    /// `timeout`.
    async fn wait_for_selector(
        &self,
        selector: &str,
        timeout: Duration,
    ) -> Result<(), SessionError>;

    /// Block until the current URL contains the fragment, or fail after
    /// `timeout`.
    async fn wait_for_url_contains(
        &self,
        fragment: &str,
        timeout: Duration,
    ) -> Result<(), SessionError>;

    /// Capture a full-page PNG screenshot.
    async fn screenshot(&self) -> Result<Vec<u8>, SessionError>;

    /// Attach a local file to a file input.
    async fn upload_file(&self, selector: &str, path: &str) -> Result<(), SessionError>;

    /// Invoke the session's installed CAPTCHA-solving capability against
    /// the current page.
    async fn solve_captcha(&self) -> Result<CaptchaOutcome, SessionError>;

    /// Current serialized page markup.
    async fn content(&self) -> Result<String, SessionError>;

    /// Current page URL.
    async fn current_url(&self) -> Result<String, SessionError>;

    /// Enumerate the form fields present on the page.
    async fn form_fields(&self) -> Result<Vec<FormField>, SessionError>;
}
