//! Recipe runner and verifier.
//!
//! The runner consumes a `Verified` recipe and a resolved context, executes
//! the steps strictly in order inside one owned browser session, captures
//! an evidence screenshot after every step, and converts any non-optional
//! failure into a terminal challenge outcome. It never lets a step failure
//! escape as a panic or a raw error; the challenge record is the boundary.

pub mod challenge;
pub mod verifier;

pub use challenge::{AutomationRef, Challenge};
pub use verifier::{VerifyOutcome, Verifier};

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use automation_context::AutomationContext;
use browser_session::{PageDriver, SessionError, SessionProvider};
use challenger_core_types::TicketId;
use evidence_store::{put_with_retry, EvidencePathBuilder, EvidenceStore};
use recipes::{Recipe, RecipeError, RecipeStatus, Step};
use step_primitives::{execute_step, StepTimeouts};

#[derive(Debug, Error)]
pub enum RunnerError {
    /// The recipe is not `Verified`; refused before any session opens.
    #[error("Automation not ready: recipe for `{authority}` is {status:?}")]
    AutomationNotReady {
        authority: challenger_core_types::AuthorityId,
        status: RecipeStatus,
    },

    #[error(transparent)]
    Recipe(#[from] RecipeError),

    #[error(transparent)]
    Session(#[from] SessionError),
}

pub struct RecipeRunner {
    sessions: Arc<dyn SessionProvider>,
    evidence: Arc<dyn EvidenceStore>,
    timeouts: StepTimeouts,
}

impl RecipeRunner {
    pub fn new(sessions: Arc<dyn SessionProvider>, evidence: Arc<dyn EvidenceStore>) -> Self {
        Self {
            sessions,
            evidence,
            timeouts: StepTimeouts::default(),
        }
    }

    pub fn with_timeouts(mut self, timeouts: StepTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Execute one challenge. The recipe is snapshotted up front: a
    /// concurrent verifier demoting it mid-run does not affect this
    /// execution, only the next one.
    pub async fn execute(
        &self,
        recipe: &Recipe,
        ticket: &TicketId,
        context: &AutomationContext,
        dry_run: bool,
    ) -> Result<Challenge, RunnerError> {
        if !recipe.status.is_runnable() {
            return Err(RunnerError::AutomationNotReady {
                authority: recipe.authority.clone(),
                status: recipe.status,
            });
        }
        recipe.validate_steps()?;
        let steps = recipe.sorted_steps();

        let mut challenge = Challenge::begin(
            ticket.clone(),
            recipe.authority.clone(),
            AutomationRef::Recipe {
                id: recipe.id.clone(),
            },
            context.narrative.clone(),
            dry_run,
        );
        let paths =
            EvidencePathBuilder::for_challenge(&recipe.authority, ticket, &challenge.id);

        info!(
            authority = %recipe.authority,
            challenge = %challenge.id,
            steps = steps.len(),
            dry_run,
            "starting challenge run"
        );

        let session = self.sessions.open().await?;
        self.drive(
            session.page().as_ref(),
            &steps,
            context,
            dry_run,
            &paths,
            &mut challenge,
        )
        .await;
        if let Err(err) = session.close().await {
            warn!(challenge = %challenge.id, %err, "session close failed after run");
        }

        info!(
            challenge = %challenge.id,
            status = ?challenge.status,
            evidence = challenge.evidence.len(),
            "challenge run finished"
        );
        Ok(challenge)
    }

    /// Step loop. Mutates the challenge into its terminal shape; all
    /// failures are converted, none propagate.
    async fn drive(
        &self,
        page: &dyn PageDriver,
        steps: &[Step],
        context: &AutomationContext,
        dry_run: bool,
        paths: &EvidencePathBuilder,
        challenge: &mut Challenge,
    ) {
        let last_order = steps.last().map(|s| s.order);

        for step in steps {
            let step_result = if dry_run && step.is_final_submission() {
                info!(order = %step.order, "dry run: skipping final submission step");
                Ok(())
            } else {
                execute_step(page, step, context, &self.timeouts).await
            };

            // Evidence is captured after every step regardless of outcome,
            // so partial progress survives a later crash. The last artifact
            // of a run gets the retried upload.
            let final_artifact =
                Some(step.order) == last_order || step_result.is_err();
            self.capture_step_evidence(page, paths, step, final_artifact, challenge)
                .await;

            if let Err(err) = step_result {
                if step.optional {
                    warn!(order = %step.order, %err, "optional step failed, continuing");
                    continue;
                }
                warn!(order = %step.order, %err, "step failed, aborting challenge");
                challenge.fail(format!("step {} failed: {err}", step.order));
                return;
            }
        }

        challenge.succeed();
    }

    async fn capture_step_evidence(
        &self,
        page: &dyn PageDriver,
        paths: &EvidencePathBuilder,
        step: &Step,
        final_artifact: bool,
        challenge: &mut Challenge,
    ) {
        let bytes = match page.screenshot().await {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(order = %step.order, %err, "step screenshot failed");
                return;
            }
        };
        let path = paths.step_screenshot(step.order);
        let upload = if final_artifact {
            put_with_retry(self.evidence.as_ref(), &path, bytes, "image/png").await
        } else {
            self.evidence.put(&path, bytes, "image/png").await
        };
        match upload {
            Ok(()) => challenge.evidence.push(path.as_str().to_string()),
            // Per-step screenshot loss is never fatal to the challenge.
            Err(err) => warn!(order = %step.order, %err, "evidence upload failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use browser_session::{ScriptedPage, ScriptedSessionProvider};
    use challenger_core_types::{AuthorityId, ChallengeStatus, StepOrder};
    use evidence_store::MemoryEvidenceStore;
    use recipes::{StepAction, WaitFor};

    fn recipe(authority: &str, status: RecipeStatus) -> Recipe {
        let mut recipe = Recipe::new(AuthorityId::new(authority), "https://example.test/appeal");
        recipe.status = status;
        recipe.steps = vec![
            Step::new(StepOrder(1), StepAction::Navigate, "Open the portal")
                .with_value("https://example.test/appeal"),
            Step::new(StepOrder(2), StepAction::Fill, "Enter the PCN number")
                .with_selector("#pcn")
                .with_value("{{pcn_number}}"),
            Step::new(StepOrder(3), StepAction::Fill, "Enter the registration")
                .with_selector("#reg")
                .with_value("{{vehicle_registration}}"),
            Step::new(
                StepOrder(4),
                StepAction::Click {
                    final_submission: true,
                },
                "Submit the challenge form",
            )
            .with_selector("#submit")
            .with_wait(WaitFor::SelectorVisible {
                selector: "#confirmation".into(),
            }),
        ];
        recipe
    }

    fn context() -> AutomationContext {
        AutomationContext {
            pcn_number: "PCN123456".into(),
            vehicle_registration: "AB12CDE".into(),
            narrative: "The signage was obscured.".into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn non_verified_recipe_is_refused_before_any_session() {
        let page = ScriptedPage::builder().build();
        let provider = Arc::new(ScriptedSessionProvider::new(page));
        let runner = RecipeRunner::new(
            Arc::clone(&provider) as Arc<dyn SessionProvider>,
            Arc::new(MemoryEvidenceStore::new()),
        );

        for status in [
            RecipeStatus::Draft,
            RecipeStatus::Learning,
            RecipeStatus::PendingReview,
            RecipeStatus::Failed,
            RecipeStatus::NeedsHumanHelp,
        ] {
            let err = runner
                .execute(
                    &recipe("metro-parking", status),
                    &TicketId("t-1".into()),
                    &context(),
                    false,
                )
                .await
                .unwrap_err();
            assert!(matches!(err, RunnerError::AutomationNotReady { .. }));
        }
        assert_eq!(provider.opened(), 0);
    }

    #[tokio::test]
    async fn full_run_succeeds_with_one_screenshot_per_step() {
        let page = ScriptedPage::builder().build();
        let provider = Arc::new(ScriptedSessionProvider::new(Arc::clone(&page)));
        let evidence = Arc::new(MemoryEvidenceStore::new());
        let runner = RecipeRunner::new(
            provider as Arc<dyn SessionProvider>,
            Arc::clone(&evidence) as Arc<dyn EvidenceStore>,
        );

        let challenge = runner
            .execute(
                &recipe("metro-parking", RecipeStatus::Verified),
                &TicketId("t-1".into()),
                &context(),
                false,
            )
            .await
            .unwrap();

        assert_eq!(challenge.status, ChallengeStatus::Success);
        assert_eq!(challenge.evidence.len(), 4);
        assert_eq!(evidence.count(), 4);
        // The placeholder-resolved values reached the page.
        assert!(page.actions().contains(&"fill:#pcn=PCN123456".to_string()));
        assert!(page.actions().contains(&"click:#submit".to_string()));
    }

    #[tokio::test]
    async fn dry_run_skips_submission_but_keeps_evidence_parity() {
        let page = ScriptedPage::builder().build();
        let provider = Arc::new(ScriptedSessionProvider::new(Arc::clone(&page)));
        let evidence = Arc::new(MemoryEvidenceStore::new());
        let runner = RecipeRunner::new(
            provider as Arc<dyn SessionProvider>,
            Arc::clone(&evidence) as Arc<dyn EvidenceStore>,
        );

        let challenge = runner
            .execute(
                &recipe("metro-parking", RecipeStatus::Verified),
                &TicketId("t-1".into()),
                &context(),
                true,
            )
            .await
            .unwrap();

        // Dry runs end pending, never submitted.
        assert_eq!(challenge.status, ChallengeStatus::Pending);
        assert!(!page.actions().contains(&"click:#submit".to_string()));
        // The skipped step was still screenshotted.
        assert_eq!(challenge.evidence.len(), 4);
    }

    #[tokio::test]
    async fn step_failure_aborts_and_reports_the_order() {
        let page = ScriptedPage::builder().fail_wait_on("#confirmation").build();
        let provider = Arc::new(ScriptedSessionProvider::new(Arc::clone(&page)));
        let evidence = Arc::new(MemoryEvidenceStore::new());
        let runner = RecipeRunner::new(
            provider as Arc<dyn SessionProvider>,
            Arc::clone(&evidence) as Arc<dyn EvidenceStore>,
        );

        let challenge = runner
            .execute(
                &recipe("metro-parking", RecipeStatus::Verified),
                &TicketId("t-1".into()),
                &context(),
                false,
            )
            .await
            .unwrap();

        assert_eq!(challenge.status, ChallengeStatus::Error);
        let reason = challenge.failure_reason.unwrap();
        assert!(reason.contains("step 4"), "reason was: {reason}");
        // Three completed steps plus the best-effort failure screenshot.
        assert_eq!(challenge.evidence.len(), 4);
    }

    #[tokio::test]
    async fn optional_step_failure_does_not_change_the_outcome() {
        let mut failing = recipe("metro-parking", RecipeStatus::Verified);
        failing.steps.insert(
            3,
            Step::new(StepOrder(4), StepAction::Fill, "Optional note")
                .with_selector("#missing")
                .with_value("{{pcn_number}}")
                .optional(),
        );
        failing.steps[4].order = StepOrder(5);

        let page = ScriptedPage::builder().fail_fill_on("#missing").build();
        let provider = Arc::new(ScriptedSessionProvider::new(Arc::clone(&page)));
        let runner = RecipeRunner::new(
            provider as Arc<dyn SessionProvider>,
            Arc::new(MemoryEvidenceStore::new()),
        );

        let challenge = runner
            .execute(&failing, &TicketId("t-1".into()), &context(), false)
            .await
            .unwrap();

        assert_eq!(challenge.status, ChallengeStatus::Success);
    }
}
