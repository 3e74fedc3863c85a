//! Step dispatch.
//!
//! Primitives for recipe steps:
//! navigate, fill, click, select, wait, screenshot, solve-captcha,
//! upload-file. Each performs its action and applies the step's optional
//! post-condition wait; all waiting is bounded.

mod captcha;
mod click;
mod fill;
mod navigate;
mod select;
mod upload;
mod wait;

use std::time::Duration;

use tracing::debug;

use automation_context::{resolve_placeholders, AutomationContext};
use browser_session::PageDriver;
use recipes::{Step, StepAction};

use crate::errors::StepError;

/// Bounds for the blocking points inside one step.
#[derive(Clone, Copy, Debug)]
pub struct StepTimeouts {
    /// Ceiling for `wait_for` post-conditions.
    pub wait: Duration,
}

impl Default for StepTimeouts {
    fn default() -> Self {
        Self {
            wait: Duration::from_secs(10),
        }
    }
}

/// Execute one step: resolve the templated value, perform the primitive,
/// then block on the post-condition. Placeholder resolution happens before
/// anything touches the browser, so an unresolvable token never half-runs
/// a step.
pub async fn execute_step(
    page: &dyn PageDriver,
    step: &Step,
    context: &AutomationContext,
    timeouts: &StepTimeouts,
) -> Result<(), StepError> {
    let value = match &step.value {
        Some(raw) => Some(resolve_placeholders(raw, context)?),
        None => None,
    };

    debug!(order = %step.order, action = ?step.action, "executing step");

    match &step.action {
        StepAction::Navigate => {
            navigate::execute(page, &require_value(step, value.as_deref())?).await?
        }
        StepAction::Fill => {
            fill::execute(
                page,
                require_selector(step)?,
                &require_value(step, value.as_deref())?,
            )
            .await?
        }
        StepAction::Click { .. } => click::execute(page, require_selector(step)?).await?,
        StepAction::Select => {
            select::execute(
                page,
                require_selector(step)?,
                &require_value(step, value.as_deref())?,
            )
            .await?
        }
        StepAction::Wait => {
            let wait_for = step.wait_for.as_ref().ok_or_else(|| StepError::InvalidStep {
                order: step.order,
                reason: "wait step has no wait_for condition".to_string(),
            })?;
            wait::apply(page, wait_for, timeouts.wait).await?;
            // The condition was the whole action; don't apply it twice.
            return Ok(());
        }
        // The runner screenshots after every step; the action exists so a
        // recipe can force an extra evidence point with no interaction.
        StepAction::Screenshot => {}
        StepAction::SolveCaptcha => captcha::execute(page, step).await?,
        StepAction::UploadFile => {
            upload::execute(
                page,
                require_selector(step)?,
                &require_value(step, value.as_deref())?,
            )
            .await?
        }
    }

    if let Some(wait_for) = &step.wait_for {
        wait::apply(page, wait_for, timeouts.wait).await?;
    }
    Ok(())
}

fn require_selector(step: &Step) -> Result<&str, StepError> {
    step.selector.as_deref().ok_or_else(|| StepError::InvalidStep {
        order: step.order,
        reason: format!("{:?} step has no selector", step.action),
    })
}

fn require_value(step: &Step, value: Option<&str>) -> Result<String, StepError> {
    value
        .map(str::to_string)
        .ok_or_else(|| StepError::InvalidStep {
            order: step.order,
            reason: format!("{:?} step has no value", step.action),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use browser_session::ScriptedPage;
    use challenger_core_types::StepOrder;
    use recipes::WaitFor;

    fn context() -> AutomationContext {
        AutomationContext {
            pcn_number: "PCN123456".into(),
            vehicle_registration: "AB12CDE".into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn fill_resolves_placeholders_before_driving() {
        let page = ScriptedPage::builder().build();
        let step = Step::new(StepOrder(1), StepAction::Fill, "Enter PCN")
            .with_selector("#pcn")
            .with_value("{{pcn_number}}");

        execute_step(&*page, &step, &context(), &StepTimeouts::default())
            .await
            .unwrap();
        assert_eq!(page.actions(), vec!["fill:#pcn=PCN123456".to_string()]);
    }

    #[tokio::test]
    async fn unresolved_placeholder_never_reaches_the_page() {
        let page = ScriptedPage::builder().build();
        let step = Step::new(StepOrder(1), StepAction::Fill, "Enter email")
            .with_selector("#email")
            .with_value("{{email}}");

        let err = execute_step(&*page, &step, &context(), &StepTimeouts::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StepError::UnresolvedPlaceholder(_)));
        assert!(page.actions().is_empty());
    }

    #[tokio::test]
    async fn post_condition_timeout_is_a_hard_failure() {
        let page = ScriptedPage::builder().fail_wait_on("#results").build();
        let step = Step::new(
            StepOrder(4),
            StepAction::Click {
                final_submission: false,
            },
            "Search for the ticket",
        )
        .with_selector("#search")
        .with_wait(WaitFor::SelectorVisible {
            selector: "#results".into(),
        });

        let err = execute_step(&*page, &step, &context(), &StepTimeouts::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StepError::SelectorTimeout(_)));
        // The click itself still happened before the wait failed.
        assert!(page.actions().contains(&"click:#search".to_string()));
    }

    #[tokio::test]
    async fn invalid_step_definitions_are_rejected() {
        let page = ScriptedPage::builder().build();
        let no_selector = Step::new(StepOrder(1), StepAction::Fill, "broken").with_value("x");
        let err = execute_step(&*page, &no_selector, &context(), &StepTimeouts::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StepError::InvalidStep { .. }));

        let no_wait = Step::new(StepOrder(1), StepAction::Wait, "broken wait");
        let err = execute_step(&*page, &no_wait, &context(), &StepTimeouts::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StepError::InvalidStep { .. }));
    }
}
