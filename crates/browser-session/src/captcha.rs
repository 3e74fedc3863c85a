//! CAPTCHA-solving capability.
//!
//! The solver is a black-box external service invoked through one blocking
//! call with a timeout. Failure to solve is reported in the outcome rather
//! than raised, so callers decide whether an unsolved CAPTCHA blocks the
//! next required step.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use challenger_core_types::CaptchaKind;

/// What the solver is asked to break: the page hosting the widget plus the
/// site key scraped from its markup, when one could be found.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CaptchaTask {
    pub page_url: String,
    pub site_key: Option<String>,
    pub kind: CaptchaKind,
}

/// Result of one solving attempt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaptchaOutcome {
    /// No CAPTCHA widget present on the page.
    NotPresent,
    /// Token obtained and ready for injection.
    Solved { token: String },
    /// The service failed, timed out, or declined the task.
    Unresolved { reason: String },
}

impl CaptchaOutcome {
    pub fn is_solved(&self) -> bool {
        matches!(self, CaptchaOutcome::Solved { .. })
    }
}

/// External CAPTCHA-solving service.
#[async_trait]
pub trait CaptchaSolver: Send + Sync {
    async fn solve(&self, task: CaptchaTask) -> CaptchaOutcome;
}

/// Solver that never solves anything. Default wiring for dry runs and for
/// portals whose recipes carry `CaptchaKind::None`.
#[derive(Default)]
pub struct NoopCaptchaSolver;

#[async_trait]
impl CaptchaSolver for NoopCaptchaSolver {
    async fn solve(&self, task: CaptchaTask) -> CaptchaOutcome {
        debug!(page = %task.page_url, "noop solver invoked");
        CaptchaOutcome::Unresolved {
            reason: "no solver configured".to_string(),
        }
    }
}

#[derive(Serialize)]
struct SolveRequest<'a> {
    key: &'a str,
    page_url: &'a str,
    site_key: Option<&'a str>,
    kind: &'a str,
}

#[derive(Deserialize)]
struct SolveResponse {
    token: Option<String>,
    error: Option<String>,
}

/// HTTP client for a token-solving service.
pub struct HttpCaptchaSolver {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    timeout: Duration,
}

impl HttpCaptchaSolver {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            timeout,
        }
    }

    fn kind_tag(kind: CaptchaKind) -> &'static str {
        match kind {
            CaptchaKind::None => "none",
            CaptchaKind::Recaptcha => "recaptcha_v2",
            CaptchaKind::Hcaptcha => "hcaptcha",
            CaptchaKind::Cloudflare => "turnstile",
            CaptchaKind::Unknown => "unknown",
        }
    }

    async fn request_token(&self, task: &CaptchaTask) -> Result<String, String> {
        let body = SolveRequest {
            key: &self.api_key,
            page_url: &task.page_url,
            site_key: task.site_key.as_deref(),
            kind: Self::kind_tag(task.kind),
        };
        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|err| format!("solver request failed: {err}"))?;
        let parsed: SolveResponse = response
            .json()
            .await
            .map_err(|err| format!("solver response unreadable: {err}"))?;
        match (parsed.token, parsed.error) {
            (Some(token), _) if !token.is_empty() => Ok(token),
            (_, Some(error)) => Err(error),
            _ => Err("solver returned neither token nor error".to_string()),
        }
    }
}

#[async_trait]
impl CaptchaSolver for HttpCaptchaSolver {
    async fn solve(&self, task: CaptchaTask) -> CaptchaOutcome {
        // The outer timeout caps the whole exchange; the per-request timeout
        // alone would not cover connection setup retries inside reqwest.
        let attempt = tokio::time::timeout(self.timeout, self.request_token(&task)).await;
        match attempt {
            Ok(Ok(token)) => CaptchaOutcome::Solved { token },
            Ok(Err(reason)) => {
                warn!(page = %task.page_url, %reason, "captcha solver failed");
                CaptchaOutcome::Unresolved { reason }
            }
            Err(_) => {
                warn!(page = %task.page_url, timeout = ?self.timeout, "captcha solver timed out");
                CaptchaOutcome::Unresolved {
                    reason: format!("solver timed out after {:?}", self.timeout),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn noop_solver_never_solves() {
        let solver = NoopCaptchaSolver;
        let outcome = solver
            .solve(CaptchaTask {
                page_url: "https://example.test/appeal".into(),
                site_key: None,
                kind: CaptchaKind::Recaptcha,
            })
            .await;
        assert!(!outcome.is_solved());
    }

    #[tokio::test]
    async fn http_solver_times_out_against_unroutable_endpoint() {
        let solver = HttpCaptchaSolver::new(
            "http://192.0.2.1/solve",
            "test-key",
            Duration::from_millis(50),
        );
        let outcome = solver
            .solve(CaptchaTask {
                page_url: "https://example.test/appeal".into(),
                site_key: Some("sitekey".into()),
                kind: CaptchaKind::Recaptcha,
            })
            .await;
        assert!(matches!(outcome, CaptchaOutcome::Unresolved { .. }));
    }
}
