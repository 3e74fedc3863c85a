//! Periodic recipe re-verification.
//!
//! Drift between a recipe's selectors and the live portal is caught by
//! re-running the recipe as a dry run: the form gets filled with synthetic
//! values, nothing is submitted. Success refreshes `last_verified_at`;
//! failure demotes to `Failed`, which blocks the runner until a human
//! re-approves.

use std::sync::Arc;

use tracing::{info, warn};

use automation_context::AutomationContext;
use challenger_core_types::{AuthorityId, ChallengeStatus, TicketId};
use recipes::{RecipeError, RecipeStore, RecipeUpdate};

use crate::{Challenge, RecipeRunner, RunnerError};

/// Result of one verification pass.
#[derive(Clone, Debug)]
pub struct VerifyOutcome {
    pub ok: bool,
    pub challenge: Challenge,
}

pub struct Verifier {
    runner: Arc<RecipeRunner>,
    store: Arc<dyn RecipeStore>,
}

impl Verifier {
    pub fn new(runner: Arc<RecipeRunner>, store: Arc<dyn RecipeStore>) -> Self {
        Self { runner, store }
    }

    /// Re-run the authority's `Verified` recipe without submitting, and
    /// record the result on the recipe.
    pub async fn check(&self, authority: &AuthorityId) -> Result<VerifyOutcome, RunnerError> {
        let recipe = self
            .store
            .get(authority)
            .await?
            .ok_or_else(|| RecipeError::NotFound(authority.clone()))?;

        // The runner's own gate rejects anything not Verified; let that be
        // the single enforcement point.
        let ticket = TicketId(format!("verification-{authority}"));
        let context = AutomationContext::verification_sample();
        let challenge = self.runner.execute(&recipe, &ticket, &context, true).await?;

        let ok = challenge.status != ChallengeStatus::Error;
        if ok {
            info!(%authority, "verification passed, refreshing last_verified_at");
            self.store
                .update(authority, RecipeUpdate::verified_now())
                .await?;
        } else {
            let reason = challenge
                .failure_reason
                .clone()
                .unwrap_or_else(|| "verification run failed".to_string());
            warn!(%authority, %reason, "verification failed, demoting recipe");
            self.store
                .update(authority, RecipeUpdate::failed(reason))
                .await?;
        }
        Ok(VerifyOutcome { ok, challenge })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use browser_session::{ScriptedPage, ScriptedSessionProvider, SessionProvider};
    use challenger_core_types::StepOrder;
    use evidence_store::{EvidenceStore, MemoryEvidenceStore};
    use recipes::{MemoryRecipeStore, Recipe, RecipeStatus, Step, StepAction, WaitFor};

    async fn seeded_store(authority: &AuthorityId) -> Arc<MemoryRecipeStore> {
        let store = Arc::new(MemoryRecipeStore::new());
        let mut recipe = Recipe::new(authority.clone(), "https://example.test/appeal");
        recipe.status = RecipeStatus::PendingReview;
        recipe.steps = vec![
            Step::new(StepOrder(1), StepAction::Navigate, "Open the portal")
                .with_value("https://example.test/appeal"),
            Step::new(StepOrder(2), StepAction::Fill, "Enter the PCN number")
                .with_selector("#pcn")
                .with_value("{{pcn_number}}")
                .with_wait(WaitFor::SelectorVisible {
                    selector: "#reg".into(),
                }),
            Step::new(
                StepOrder(3),
                StepAction::Click {
                    final_submission: true,
                },
                "Submit the challenge form",
            )
            .with_selector("#submit"),
        ];
        store.create(recipe).await.unwrap();
        store
            .update(authority, RecipeUpdate::status(RecipeStatus::Verified))
            .await
            .unwrap();
        store
    }

    fn verifier_over(page: Arc<ScriptedPage>, store: Arc<MemoryRecipeStore>) -> Verifier {
        let provider = Arc::new(ScriptedSessionProvider::new(page));
        let runner = Arc::new(RecipeRunner::new(
            provider as Arc<dyn SessionProvider>,
            Arc::new(MemoryEvidenceStore::new()) as Arc<dyn EvidenceStore>,
        ));
        Verifier::new(runner, store)
    }

    #[tokio::test]
    async fn passing_verification_refreshes_the_timestamp() {
        let authority = AuthorityId::new("metro-parking");
        let store = seeded_store(&authority).await;
        let verifier = verifier_over(ScriptedPage::builder().build(), Arc::clone(&store));

        let outcome = verifier.check(&authority).await.unwrap();
        assert!(outcome.ok);

        let recipe = store.get(&authority).await.unwrap().unwrap();
        assert_eq!(recipe.status, RecipeStatus::Verified);
        assert!(recipe.last_verified_at.is_some());
    }

    #[tokio::test]
    async fn failing_verification_demotes_to_failed() {
        let authority = AuthorityId::new("metro-parking");
        let store = seeded_store(&authority).await;
        let page = ScriptedPage::builder().fail_wait_on("#reg").build();
        let verifier = verifier_over(page, Arc::clone(&store));

        let outcome = verifier.check(&authority).await.unwrap();
        assert!(!outcome.ok);

        let recipe = store.get(&authority).await.unwrap().unwrap();
        assert_eq!(recipe.status, RecipeStatus::Failed);
        assert!(recipe.failure_reason.unwrap().contains("step 2"));
        assert!(recipe.last_failed_at.is_some());
    }

    #[tokio::test]
    async fn verification_never_submits() {
        let authority = AuthorityId::new("metro-parking");
        let store = seeded_store(&authority).await;
        let page = ScriptedPage::builder().build();
        let verifier = verifier_over(Arc::clone(&page), store);

        verifier.check(&authority).await.unwrap();
        assert!(!page.actions().contains(&"click:#submit".to_string()));
    }
}
