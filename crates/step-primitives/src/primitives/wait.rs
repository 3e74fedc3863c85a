//! Post-condition waiting. Every variant is bounded by the step timeout;
//! an unmet condition is a hard failure.

use std::time::Duration;

use tracing::debug;

use browser_session::PageDriver;
use recipes::WaitFor;

use crate::errors::StepError;

pub(super) async fn apply(
    page: &dyn PageDriver,
    wait_for: &WaitFor,
    timeout: Duration,
) -> Result<(), StepError> {
    debug!(?wait_for, ?timeout, "waiting for post-condition");
    match wait_for {
        WaitFor::SelectorVisible { selector } => {
            page.wait_for_selector(selector, timeout).await?;
        }
        WaitFor::UrlContains { fragment } => {
            page.wait_for_url_contains(fragment, timeout).await?;
        }
        WaitFor::Delay { ms } => {
            // A fixed delay still honours the step ceiling.
            let capped = Duration::from_millis(*ms).min(timeout);
            tokio::time::sleep(capped).await;
        }
    }
    Ok(())
}
