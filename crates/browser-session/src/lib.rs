//! Browser session provider and the page driver seam.
//!
//! Every automation task (learner probe, runner pass, issuer adapter run)
//! owns exactly one browser session for its lifetime. A session wraps one
//! Chromium OS process configured with a fixed desktop viewport and the
//! CAPTCHA-solving capability, and must be released on every exit path.
//!
//! All step execution goes through the [`PageDriver`] trait so the execution
//! crates never talk CDP directly; [`ScriptedPage`] implements the same seam
//! in memory for tests.

pub mod captcha;
pub mod chromium;
pub mod driver;
pub mod errors;
pub mod scripted;

pub use captcha::{CaptchaOutcome, CaptchaSolver, HttpCaptchaSolver, NoopCaptchaSolver};
pub use chromium::{ChromiumSessionProvider, SessionConfig};
pub use driver::{FormField, PageDriver};
pub use errors::SessionError;
pub use scripted::{ScriptedPage, ScriptedPageBuilder, ScriptedSessionProvider};

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

/// Opens one browser session per call. Implementations never pool or share
/// sessions across tasks.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    async fn open(&self) -> Result<BrowserSession, SessionError>;
}

enum Teardown {
    Chromium {
        browser: chromiumoxide::Browser,
        handler: tokio::task::JoinHandle<()>,
    },
    Noop,
}

/// Handle to one live browser session. The caller must call [`close`] on
/// every exit path; dropping without closing still tears the process down
/// but is logged as a leak.
///
/// [`close`]: BrowserSession::close
pub struct BrowserSession {
    page: Arc<dyn PageDriver>,
    teardown: Option<Teardown>,
}

impl BrowserSession {
    pub fn new_chromium(
        page: Arc<dyn PageDriver>,
        browser: chromiumoxide::Browser,
        handler: tokio::task::JoinHandle<()>,
    ) -> Self {
        Self {
            page,
            teardown: Some(Teardown::Chromium { browser, handler }),
        }
    }

    /// Session over a driver with no owned process (tests, scripted runs).
    pub fn new_detached(page: Arc<dyn PageDriver>) -> Self {
        Self {
            page,
            teardown: Some(Teardown::Noop),
        }
    }

    pub fn page(&self) -> Arc<dyn PageDriver> {
        Arc::clone(&self.page)
    }

    /// Gracefully release the session: closes the browser process and joins
    /// the CDP handler task.
    pub async fn close(mut self) -> Result<(), SessionError> {
        match self.teardown.take() {
            Some(Teardown::Chromium {
                mut browser,
                handler,
            }) => {
                let result = browser
                    .close()
                    .await
                    .map_err(|err| SessionError::Teardown(err.to_string()));
                handler.abort();
                result.map(|_| ())
            }
            Some(Teardown::Noop) | None => Ok(()),
        }
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        if let Some(teardown) = self.teardown.take() {
            match teardown {
                Teardown::Chromium { browser, handler } => {
                    warn!("browser session dropped without close(); killing process");
                    handler.abort();
                    drop(browser);
                }
                Teardown::Noop => {}
            }
        }
    }
}
