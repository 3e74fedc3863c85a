//! Chromium-backed session provider.
//!
//! One Chromium OS process per session, launched fresh for every task and
//! torn down with it. The viewport is pinned large and desktop-shaped;
//! several enforcement portals serve a degraded mobile flow (or reject the
//! form outright) below tablet width.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::dom::SetFileInputFilesParams;
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, info, warn};

use challenger_core_types::CaptchaKind;

use crate::captcha::{CaptchaOutcome, CaptchaSolver, CaptchaTask, NoopCaptchaSolver};
use crate::driver::{FormField, PageDriver};
use crate::errors::SessionError;
use crate::{BrowserSession, SessionProvider};

/// Fixed desktop viewport. Narrow viewports get rejected or redirected by
/// enough portals that this is not configurable.
pub const VIEWPORT_WIDTH: u32 = 1920;
pub const VIEWPORT_HEIGHT: u32 = 1080;

const DEFAULT_NAV_TIMEOUT: Duration = Duration::from_secs(30);
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Launch configuration for one session.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub headless: bool,
    pub executable: Option<PathBuf>,
    pub user_data_dir: Option<PathBuf>,
    pub nav_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            headless: true,
            executable: None,
            user_data_dir: None,
            nav_timeout: DEFAULT_NAV_TIMEOUT,
        }
    }
}

/// Session provider backed by a real Chromium process.
pub struct ChromiumSessionProvider {
    config: SessionConfig,
    solver: Arc<dyn CaptchaSolver>,
}

impl ChromiumSessionProvider {
    pub fn new(config: SessionConfig, solver: Arc<dyn CaptchaSolver>) -> Self {
        Self { config, solver }
    }

    pub fn without_solver(config: SessionConfig) -> Self {
        Self {
            config,
            solver: Arc::new(NoopCaptchaSolver),
        }
    }

    fn browser_config(&self) -> Result<BrowserConfig, SessionError> {
        let viewport = Viewport {
            width: VIEWPORT_WIDTH,
            height: VIEWPORT_HEIGHT,
            ..Default::default()
        };
        let mut builder = BrowserConfig::builder()
            .window_size(VIEWPORT_WIDTH, VIEWPORT_HEIGHT)
            .viewport(viewport);
        if !self.config.headless {
            builder = builder.with_head();
        }
        if let Some(executable) = &self.config.executable {
            builder = builder.chrome_executable(executable);
        }
        if let Some(dir) = &self.config.user_data_dir {
            builder = builder.user_data_dir(dir);
        }
        builder.build().map_err(SessionError::Launch)
    }
}

#[async_trait]
impl SessionProvider for ChromiumSessionProvider {
    async fn open(&self) -> Result<BrowserSession, SessionError> {
        let browser_config = self.browser_config()?;
        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|err| SessionError::Launch(err.to_string()))?;

        // The handler future must be polled for the CDP connection to make
        // progress; it ends when the browser process goes away.
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(err) => {
                handler_task.abort();
                return Err(SessionError::Launch(err.to_string()));
            }
        };

        info!(
            headless = self.config.headless,
            viewport = %format!("{}x{}", VIEWPORT_WIDTH, VIEWPORT_HEIGHT),
            "browser session opened"
        );

        let driver = ChromiumPage {
            page,
            solver: Arc::clone(&self.solver),
            nav_timeout: self.config.nav_timeout,
        };
        Ok(BrowserSession::new_chromium(
            Arc::new(driver),
            browser,
            handler_task,
        ))
    }
}

/// [`PageDriver`] over one chromiumoxide page.
pub struct ChromiumPage {
    page: Page,
    solver: Arc<dyn CaptchaSolver>,
    nav_timeout: Duration,
}

impl ChromiumPage {
    async fn find(&self, selector: &str) -> Result<chromiumoxide::element::Element, SessionError> {
        self.page
            .find_element(selector)
            .await
            .map_err(|_| SessionError::SelectorTimeout(format!("no element matches `{selector}`")))
    }

    async fn eval_json(&self, script: &str) -> Result<serde_json::Value, SessionError> {
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(|err| SessionError::Io(err.to_string()))?;
        Ok(result.value().cloned().unwrap_or(serde_json::Value::Null))
    }

    async fn detect_captcha_widget(&self) -> Result<Option<(Option<String>, CaptchaKind)>, SessionError> {
        let script = r#"(() => {
            const probes = [
                ['.g-recaptcha[data-sitekey], [data-sitekey].g-recaptcha', 'recaptcha'],
                ['.h-captcha[data-sitekey]', 'hcaptcha'],
                ['.cf-turnstile[data-sitekey]', 'cloudflare'],
                ['[data-sitekey]', 'unknown'],
            ];
            for (const [selector, kind] of probes) {
                const el = document.querySelector(selector);
                if (el) return JSON.stringify({ site_key: el.getAttribute('data-sitekey'), kind });
            }
            if (document.querySelector('iframe[src*="recaptcha"]')) {
                return JSON.stringify({ site_key: null, kind: 'recaptcha' });
            }
            return null;
        })()"#;
        let value = self.eval_json(script).await?;
        let Some(raw) = value.as_str() else {
            return Ok(None);
        };
        let parsed: serde_json::Value = serde_json::from_str(raw)
            .map_err(|err| SessionError::Io(format!("captcha probe unreadable: {err}")))?;
        let site_key = parsed
            .get("site_key")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string());
        let kind = match parsed.get("kind").and_then(|v| v.as_str()) {
            Some("recaptcha") => CaptchaKind::Recaptcha,
            Some("hcaptcha") => CaptchaKind::Hcaptcha,
            Some("cloudflare") => CaptchaKind::Cloudflare,
            _ => CaptchaKind::Unknown,
        };
        Ok(Some((site_key, kind)))
    }

    async fn inject_token(&self, token: &str) -> Result<(), SessionError> {
        let script = format!(
            r#"(() => {{
                const token = {token};
                for (const name of ['g-recaptcha-response', 'h-captcha-response', 'cf-turnstile-response']) {{
                    const el = document.querySelector(`[name="${{name}}"], #${{name}}`);
                    if (el) {{
                        el.value = token;
                        el.dispatchEvent(new Event('change', {{ bubbles: true }}));
                    }}
                }}
                return true;
            }})()"#,
            token = serde_json::to_string(token).unwrap_or_default(),
        );
        self.eval_json(&script).await.map(|_| ())
    }
}

#[async_trait]
impl PageDriver for ChromiumPage {
    async fn navigate(&self, url: &str) -> Result<(), SessionError> {
        let load = async {
            self.page
                .goto(url)
                .await
                .map_err(|err| SessionError::Navigation(err.to_string()))?;
            self.page
                .wait_for_navigation()
                .await
                .map_err(|err| SessionError::Navigation(err.to_string()))?;
            Ok(())
        };
        match timeout(self.nav_timeout, load).await {
            Ok(result) => result,
            Err(_) => Err(SessionError::Navigation(format!(
                "load of {url} exceeded {:?}",
                self.nav_timeout
            ))),
        }
    }

    async fn fill(&self, selector: &str, value: &str) -> Result<(), SessionError> {
        let element = self.find(selector).await?;
        element
            .click()
            .await
            .map_err(|err| SessionError::NotInteractable(format!("{selector}: {err}")))?;
        element
            .call_js_fn("function() { this.value = ''; }", false)
            .await
            .map_err(|err| SessionError::Io(err.to_string()))?;
        element
            .type_str(value)
            .await
            .map_err(|err| SessionError::NotInteractable(format!("{selector}: {err}")))?;
        Ok(())
    }

    async fn click(&self, selector: &str) -> Result<(), SessionError> {
        let element = self.find(selector).await?;
        if let Err(err) = element.scroll_into_view().await {
            debug!(%selector, %err, "scroll_into_view failed before click");
        }
        element
            .click()
            .await
            .map_err(|err| SessionError::NotInteractable(format!("{selector}: {err}")))?;
        Ok(())
    }

    async fn select_option(&self, selector: &str, value: &str) -> Result<(), SessionError> {
        let element = self.find(selector).await?;
        let function = format!(
            r#"function() {{
                const wanted = {wanted};
                for (const option of this.options) {{
                    if (option.value === wanted || option.textContent.trim() === wanted) {{
                        this.value = option.value;
                        this.dispatchEvent(new Event('change', {{ bubbles: true }}));
                        return true;
                    }}
                }}
                return false;
            }}"#,
            wanted = serde_json::to_string(value).unwrap_or_default(),
        );
        let result = element
            .call_js_fn(function, false)
            .await
            .map_err(|err| SessionError::Io(err.to_string()))?;
        let matched = result
            .result
            .value
            .as_ref()
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        if matched {
            Ok(())
        } else {
            Err(SessionError::NotInteractable(format!(
                "`{selector}` has no option matching `{value}`"
            )))
        }
    }

    async fn wait_for_selector(
        &self,
        selector: &str,
        timeout_after: Duration,
    ) -> Result<(), SessionError> {
        let deadline = Instant::now() + timeout_after;
        loop {
            if self.page.find_element(selector).await.is_ok() {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(SessionError::SelectorTimeout(format!(
                    "`{selector}` did not appear within {timeout_after:?}"
                )));
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    async fn wait_for_url_contains(
        &self,
        fragment: &str,
        timeout_after: Duration,
    ) -> Result<(), SessionError> {
        let deadline = Instant::now() + timeout_after;
        loop {
            let url = self.current_url().await?;
            if url.contains(fragment) {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(SessionError::SelectorTimeout(format!(
                    "url never contained `{fragment}` within {timeout_after:?} (last: {url})"
                )));
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    async fn screenshot(&self) -> Result<Vec<u8>, SessionError> {
        self.page
            .screenshot(
                ScreenshotParams::builder()
                    .format(CaptureScreenshotFormat::Png)
                    .full_page(true)
                    .build(),
            )
            .await
            .map_err(|err| SessionError::Io(format!("screenshot failed: {err}")))
    }

    async fn upload_file(&self, selector: &str, path: &str) -> Result<(), SessionError> {
        let element = self.find(selector).await?;
        let params = SetFileInputFilesParams::builder()
            .file(path.to_string())
            .node_id(element.node_id)
            .build()
            .map_err(SessionError::Io)?;
        self.page
            .execute(params)
            .await
            .map_err(|err| SessionError::Io(format!("file upload failed: {err}")))?;
        Ok(())
    }

    async fn solve_captcha(&self) -> Result<CaptchaOutcome, SessionError> {
        let Some((site_key, kind)) = self.detect_captcha_widget().await? else {
            return Ok(CaptchaOutcome::NotPresent);
        };
        let task = CaptchaTask {
            page_url: self.current_url().await?,
            site_key,
            kind,
        };
        let outcome = self.solver.solve(task).await;
        if let CaptchaOutcome::Solved { token } = &outcome {
            if let Err(err) = self.inject_token(token).await {
                warn!(%err, "token injection failed after solve");
                return Ok(CaptchaOutcome::Unresolved {
                    reason: format!("solved but injection failed: {err}"),
                });
            }
        }
        Ok(outcome)
    }

    async fn content(&self) -> Result<String, SessionError> {
        self.page
            .content()
            .await
            .map_err(|err| SessionError::Io(err.to_string()))
    }

    async fn current_url(&self) -> Result<String, SessionError> {
        let url = self
            .page
            .url()
            .await
            .map_err(|err| SessionError::Io(err.to_string()))?;
        Ok(url.unwrap_or_else(|| "about:blank".to_string()))
    }

    async fn form_fields(&self) -> Result<Vec<FormField>, SessionError> {
        let script = r#"(() => {
            const fields = [];
            const skip = ['hidden', 'submit', 'button', 'image', 'reset'];
            document.querySelectorAll('input, select, textarea').forEach((el, index) => {
                const tag = el.tagName.toLowerCase();
                const type = tag === 'select' ? 'select' : (tag === 'textarea' ? 'textarea' : (el.type || 'text'));
                if (skip.includes(type)) return;
                let label = null;
                if (el.id) {
                    const forLabel = document.querySelector('label[for="' + el.id + '"]');
                    if (forLabel) label = forLabel.textContent.trim();
                }
                if (!label) {
                    const wrapping = el.closest('label');
                    if (wrapping) label = wrapping.textContent.trim();
                }
                const selector = el.id
                    ? '#' + el.id
                    : (el.name ? tag + '[name="' + el.name + '"]' : tag + ':nth-of-type(' + (index + 1) + ')');
                fields.push({
                    selector,
                    name: el.name || null,
                    id: el.id || null,
                    label,
                    placeholder: el.placeholder || null,
                    input_type: type,
                    required: !!el.required,
                });
            });
            return JSON.stringify(fields);
        })()"#;
        let value = self.eval_json(script).await?;
        let raw = value
            .as_str()
            .ok_or_else(|| SessionError::Io("field enumeration returned no data".to_string()))?;
        serde_json::from_str(raw)
            .map_err(|err| SessionError::Io(format!("field enumeration unreadable: {err}")))
    }
}
