//! Generic recipe-backed automation.
//!
//! The default path for regular portals: the capability interface mapped
//! onto the recipe runner. `access` confirms the portal answers at all,
//! `verify` is a dry run, `challenge` a live run; the runner's own
//! `Verified`-only gate applies to both.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use automation_context::AutomationContext;
use browser_session::SessionProvider;
use challenger_core_types::{AuthorityId, TicketId};
use recipes::{Recipe, RecipeError, RecipeStore};
use runner::{Challenge, RecipeRunner, RunnerError};

use crate::errors::AdapterError;
use crate::ChallengeAutomation;

pub struct RecipeAutomation {
    authority: AuthorityId,
    store: Arc<dyn RecipeStore>,
    runner: Arc<RecipeRunner>,
    sessions: Arc<dyn SessionProvider>,
}

impl RecipeAutomation {
    pub fn new(
        authority: AuthorityId,
        store: Arc<dyn RecipeStore>,
        runner: Arc<RecipeRunner>,
        sessions: Arc<dyn SessionProvider>,
    ) -> Self {
        Self {
            authority,
            store,
            runner,
            sessions,
        }
    }

    async fn recipe(&self) -> Result<Recipe, AdapterError> {
        self.store
            .get(&self.authority)
            .await
            .map_err(RunnerError::from)?
            .ok_or_else(|| {
                AdapterError::Runner(RunnerError::Recipe(RecipeError::NotFound(
                    self.authority.clone(),
                )))
            })
    }
}

#[async_trait]
impl ChallengeAutomation for RecipeAutomation {
    fn name(&self) -> &str {
        "recipe"
    }

    fn authority(&self) -> AuthorityId {
        self.authority.clone()
    }

    async fn access(
        &self,
        _ticket: &TicketId,
        _context: &AutomationContext,
    ) -> Result<(), AdapterError> {
        let recipe = self.recipe().await?;
        let session = self.sessions.open().await?;
        let result = session.page().navigate(&recipe.entry_url).await;
        if let Err(err) = session.close().await {
            warn!(authority = %self.authority, %err, "session close failed after access");
        }
        result.map_err(AdapterError::from)
    }

    async fn verify(
        &self,
        ticket: &TicketId,
        context: &AutomationContext,
    ) -> Result<Vec<String>, AdapterError> {
        let recipe = self.recipe().await?;
        let challenge = self.runner.execute(&recipe, ticket, context, true).await?;
        Ok(challenge.evidence)
    }

    async fn challenge(
        &self,
        ticket: &TicketId,
        context: &AutomationContext,
        dry_run: bool,
    ) -> Result<Challenge, AdapterError> {
        let recipe = self.recipe().await?;
        Ok(self.runner.execute(&recipe, ticket, context, dry_run).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use browser_session::{ScriptedPage, ScriptedSessionProvider};
    use challenger_core_types::{ChallengeStatus, StepOrder};
    use evidence_store::{EvidenceStore, MemoryEvidenceStore};
    use recipes::{MemoryRecipeStore, RecipeStatus, RecipeUpdate, Step, StepAction};

    async fn verified_store(authority: &AuthorityId) -> Arc<MemoryRecipeStore> {
        let store = Arc::new(MemoryRecipeStore::new());
        let mut recipe = Recipe::new(authority.clone(), "https://example.test/appeal");
        recipe.status = RecipeStatus::PendingReview;
        recipe.steps = vec![
            Step::new(StepOrder(1), StepAction::Navigate, "Open the portal")
                .with_value("https://example.test/appeal"),
            Step::new(
                StepOrder(2),
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

    #[tokio::test]
    async fn generic_path_runs_the_recipe() {
        let authority = AuthorityId::new("metro-parking");
        let store = verified_store(&authority).await;
        let page = ScriptedPage::builder().build();
        let provider = Arc::new(ScriptedSessionProvider::new(Arc::clone(&page)));
        let runner = Arc::new(RecipeRunner::new(
            Arc::clone(&provider) as Arc<dyn SessionProvider>,
            Arc::new(MemoryEvidenceStore::new()) as Arc<dyn EvidenceStore>,
        ));
        let automation = RecipeAutomation::new(
            authority.clone(),
            store,
            runner,
            provider as Arc<dyn SessionProvider>,
        );

        let challenge = automation
            .challenge(
                &TicketId("t-1".into()),
                &AutomationContext::verification_sample(),
                false,
            )
            .await
            .unwrap();
        assert_eq!(challenge.status, ChallengeStatus::Success);
        assert!(page.actions().contains(&"click:#submit".to_string()));
    }
}
