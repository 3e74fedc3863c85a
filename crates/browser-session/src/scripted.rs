//! Scripted in-memory page driver.
//!
//! Serves the same purpose as a no-op transport in a protocol adapter: the
//! execution crates exercise their full control flow against this driver in
//! unit and integration tests, with failures injected per selector.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::captcha::CaptchaOutcome;
use crate::driver::{FormField, PageDriver};
use crate::errors::SessionError;
use crate::{BrowserSession, SessionProvider};

/// Builder for [`ScriptedPage`].
#[derive(Default)]
pub struct ScriptedPageBuilder {
    contents: VecDeque<String>,
    fail_wait: HashSet<String>,
    fail_fill: HashSet<String>,
    fail_click: HashSet<String>,
    form_fields: Vec<FormField>,
    captcha_outcome: Option<CaptchaOutcome>,
}

impl ScriptedPageBuilder {
    /// Queue page markup; each `navigate` consumes the next entry and the
    /// last one sticks.
    pub fn push_content(mut self, html: impl Into<String>) -> Self {
        self.contents.push_back(html.into());
        self
    }

    /// Make any wait on this selector or URL fragment time out.
    pub fn fail_wait_on(mut self, target: impl Into<String>) -> Self {
        self.fail_wait.insert(target.into());
        self
    }

    /// Make filling this selector fail as not-found.
    pub fn fail_fill_on(mut self, selector: impl Into<String>) -> Self {
        self.fail_fill.insert(selector.into());
        self
    }

    /// Make clicking this selector fail as not-found.
    pub fn fail_click_on(mut self, selector: impl Into<String>) -> Self {
        self.fail_click.insert(selector.into());
        self
    }

    pub fn with_form_fields(mut self, fields: Vec<FormField>) -> Self {
        self.form_fields = fields;
        self
    }

    pub fn with_captcha_outcome(mut self, outcome: CaptchaOutcome) -> Self {
        self.captcha_outcome = Some(outcome);
        self
    }

    pub fn build(self) -> Arc<ScriptedPage> {
        Arc::new(ScriptedPage {
            contents: Mutex::new(self.contents),
            current_content: Mutex::new(String::new()),
            current_url: Mutex::new("about:blank".to_string()),
            fail_wait: self.fail_wait,
            fail_fill: self.fail_fill,
            fail_click: self.fail_click,
            form_fields: self.form_fields,
            captcha_outcome: self.captcha_outcome.unwrap_or(CaptchaOutcome::NotPresent),
            actions: Mutex::new(Vec::new()),
            screenshots: AtomicUsize::new(0),
        })
    }
}

/// In-memory [`PageDriver`] with scripted responses and an action log.
pub struct ScriptedPage {
    contents: Mutex<VecDeque<String>>,
    current_content: Mutex<String>,
    current_url: Mutex<String>,
    fail_wait: HashSet<String>,
    fail_fill: HashSet<String>,
    fail_click: HashSet<String>,
    form_fields: Vec<FormField>,
    captcha_outcome: CaptchaOutcome,
    actions: Mutex<Vec<String>>,
    screenshots: AtomicUsize,
}

impl ScriptedPage {
    pub fn builder() -> ScriptedPageBuilder {
        ScriptedPageBuilder::default()
    }

    /// Every driver call so far, in order, as `verb:detail` strings.
    pub fn actions(&self) -> Vec<String> {
        self.actions.lock().clone()
    }

    pub fn screenshot_count(&self) -> usize {
        self.screenshots.load(Ordering::SeqCst)
    }

    fn log(&self, entry: String) {
        self.actions.lock().push(entry);
    }
}

#[async_trait]
impl PageDriver for ScriptedPage {
    async fn navigate(&self, url: &str) -> Result<(), SessionError> {
        self.log(format!("navigate:{url}"));
        *self.current_url.lock() = url.to_string();
        let mut contents = self.contents.lock();
        if let Some(next) = contents.pop_front() {
            // Keep the final page sticking around for repeat visits.
            if contents.is_empty() {
                contents.push_back(next.clone());
            }
            *self.current_content.lock() = next;
        }
        Ok(())
    }

    async fn fill(&self, selector: &str, value: &str) -> Result<(), SessionError> {
        if self.fail_fill.contains(selector) {
            return Err(SessionError::SelectorTimeout(format!(
                "no element matches `{selector}`"
            )));
        }
        self.log(format!("fill:{selector}={value}"));
        Ok(())
    }

    async fn click(&self, selector: &str) -> Result<(), SessionError> {
        if self.fail_click.contains(selector) {
            return Err(SessionError::SelectorTimeout(format!(
                "no element matches `{selector}`"
            )));
        }
        self.log(format!("click:{selector}"));
        Ok(())
    }

    async fn select_option(&self, selector: &str, value: &str) -> Result<(), SessionError> {
        self.log(format!("select:{selector}={value}"));
        Ok(())
    }

    async fn wait_for_selector(
        &self,
        selector: &str,
        timeout: Duration,
    ) -> Result<(), SessionError> {
        self.log(format!("wait_selector:{selector}"));
        if self.fail_wait.contains(selector) {
            return Err(SessionError::SelectorTimeout(format!(
                "`{selector}` did not appear within {timeout:?}"
            )));
        }
        Ok(())
    }

    async fn wait_for_url_contains(
        &self,
        fragment: &str,
        timeout: Duration,
    ) -> Result<(), SessionError> {
        self.log(format!("wait_url:{fragment}"));
        if self.fail_wait.contains(fragment) {
            return Err(SessionError::SelectorTimeout(format!(
                "url never contained `{fragment}` within {timeout:?}"
            )));
        }
        Ok(())
    }

    async fn screenshot(&self) -> Result<Vec<u8>, SessionError> {
        let n = self.screenshots.fetch_add(1, Ordering::SeqCst) + 1;
        self.log(format!("screenshot:{n}"));
        Ok(format!("PNG-{n}").into_bytes())
    }

    async fn upload_file(&self, selector: &str, path: &str) -> Result<(), SessionError> {
        self.log(format!("upload:{selector}={path}"));
        Ok(())
    }

    async fn solve_captcha(&self) -> Result<CaptchaOutcome, SessionError> {
        self.log("solve_captcha".to_string());
        Ok(self.captcha_outcome.clone())
    }

    async fn content(&self) -> Result<String, SessionError> {
        Ok(self.current_content.lock().clone())
    }

    async fn current_url(&self) -> Result<String, SessionError> {
        Ok(self.current_url.lock().clone())
    }

    async fn form_fields(&self) -> Result<Vec<FormField>, SessionError> {
        Ok(self.form_fields.clone())
    }
}

/// Session provider handing out one scripted page, counting opens so tests
/// can assert that refused runs open zero sessions.
pub struct ScriptedSessionProvider {
    page: Arc<ScriptedPage>,
    opened: AtomicUsize,
}

impl ScriptedSessionProvider {
    pub fn new(page: Arc<ScriptedPage>) -> Self {
        Self {
            page,
            opened: AtomicUsize::new(0),
        }
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionProvider for ScriptedSessionProvider {
    async fn open(&self) -> Result<BrowserSession, SessionError> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(BrowserSession::new_detached(
            Arc::clone(&self.page) as Arc<dyn PageDriver>,
        ))
    }
}
