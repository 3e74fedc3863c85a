//! Bounded retry with a retryable-state classifier.
//!
//! One shared utility instead of a copy per adapter: fixed attempt count,
//! fixed delay, and exactly one warning report on the first retry plus
//! exactly one error report on exhaustion; the sink pages on errors, so a
//! noisy portal must not produce a report per attempt.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use report_sink::{Report, ReportSink};

use crate::errors::AdapterError;

#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(5),
        }
    }
}

/// Tags attached to the retry reports.
#[derive(Clone, Debug)]
pub struct RetryContext {
    pub component: String,
    pub action: String,
    pub authority: challenger_core_types::AuthorityId,
    pub pcn_number: Option<String>,
    pub registration: Option<String>,
}

impl RetryContext {
    fn report(&self, base: Report) -> Report {
        let mut report = base.with_authority(self.authority.clone());
        if let Some(pcn) = &self.pcn_number {
            report = report.with_pcn(pcn.clone());
        }
        if let Some(reg) = &self.registration {
            report = report.with_registration(reg.clone());
        }
        report
    }
}

/// Run `op` up to `policy.max_attempts` times, retrying failures the
/// classifier marks retryable, with a fixed delay between attempts.
/// Non-retryable failures escape immediately.
pub async fn retry_bounded<T, F, Fut, C>(
    policy: &RetryPolicy,
    sink: &dyn ReportSink,
    context: &RetryContext,
    classify: C,
    mut op: F,
) -> Result<T, AdapterError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, AdapterError>>,
    C: Fn(&AdapterError) -> bool,
{
    let mut warned = false;
    let mut attempt = 1;
    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) if !classify(&err) => return Err(err),
            Err(err) if attempt >= policy.max_attempts => {
                warn!(
                    authority = %context.authority,
                    attempt,
                    %err,
                    "retries exhausted"
                );
                sink.submit(
                    context
                        .report(Report::error(
                            context.component.clone(),
                            format!("{}_exhausted", context.action),
                            format!("gave up after {attempt} attempts: {err}"),
                        ))
                        .with_attempt(attempt),
                )
                .await;
                return Err(err);
            }
            Err(err) => {
                debug!(
                    authority = %context.authority,
                    attempt,
                    %err,
                    "retryable failure, waiting before next attempt"
                );
                if !warned {
                    sink.submit(
                        context
                            .report(Report::warning(
                                context.component.clone(),
                                format!("{}_retrying", context.action),
                                format!("attempt {attempt} failed: {err}; retrying"),
                            ))
                            .with_attempt(attempt),
                    )
                    .await;
                    warned = true;
                }
                tokio::time::sleep(policy.delay).await;
                attempt += 1;
            }
        }
    }
}
