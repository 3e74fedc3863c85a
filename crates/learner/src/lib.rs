//! Recipe learner.
//!
//! Given an authority and an optional seed URL, the learner locates the
//! challenge portal, probes it inside one owned browser session, and emits
//! a draft recipe for human review. It never promotes a recipe to
//! `Verified` (that is review's decision alone), and it never guesses at
//! a portal it cannot find: no URL means `NeedsHumanHelp` and a report to
//! the sink, with zero sessions opened.

pub mod detectors;
pub mod draft;
pub mod portal;

pub use detectors::{detect_account_requirement, detect_captcha};
pub use draft::draft_steps;
pub use portal::{NoopPortalLocator, PortalLocator, StaticPortalTable};

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use browser_session::{PageDriver, SessionError, SessionProvider};
use challenger_core_types::{AuthorityId, CaptchaKind};
use recipes::{Recipe, RecipeError, RecipeStatus, RecipeStore, RecipeUpdate, Step};
use report_sink::{Report, ReportSink};

#[derive(Debug, Error)]
pub enum LearnerError {
    /// No portal URL from the seed, the table, or the search collaborator.
    #[error("Target portal not found for authority `{0}`")]
    TargetNotFound(AuthorityId),

    #[error(transparent)]
    Recipe(#[from] RecipeError),

    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Outcome of one learning pass.
#[derive(Clone, Debug)]
pub struct LearnReport {
    pub needs_human_help: bool,
    pub reason: Option<String>,
    pub recipe: Recipe,
}

pub struct RecipeLearner {
    sessions: Arc<dyn SessionProvider>,
    store: Arc<dyn RecipeStore>,
    sink: Arc<dyn ReportSink>,
    table: StaticPortalTable,
    locator: Arc<dyn PortalLocator>,
}

impl RecipeLearner {
    pub fn new(
        sessions: Arc<dyn SessionProvider>,
        store: Arc<dyn RecipeStore>,
        sink: Arc<dyn ReportSink>,
        table: StaticPortalTable,
        locator: Arc<dyn PortalLocator>,
    ) -> Self {
        Self {
            sessions,
            store,
            sink,
            table,
            locator,
        }
    }

    /// Run one learning pass for an authority. Drives the recipe through
    /// `Learning` into either `PendingReview` (draft steps attached) or
    /// `NeedsHumanHelp` (with the dead-end reason).
    pub async fn learn(
        &self,
        authority: &AuthorityId,
        seed_url: Option<&str>,
    ) -> Result<LearnReport, LearnerError> {
        self.ensure_learning_record(authority, seed_url).await?;

        let entry_url = match self.resolve_portal(authority, seed_url).await {
            Ok(url) => url,
            Err(LearnerError::TargetNotFound(_)) => {
                return self
                    .dead_end(authority, "target portal not found; provide a seed URL")
                    .await;
            }
            Err(other) => return Err(other),
        };

        info!(%authority, url = %entry_url, "probing challenge portal");

        // One session owned for the probe's lifetime, released on both paths.
        let session = self.sessions.open().await?;
        let probe = self.probe(session.page().as_ref(), &entry_url).await;
        if let Err(err) = session.close().await {
            warn!(%authority, %err, "session close failed after probe");
        }

        match probe {
            Ok((captcha, requires_account, steps)) => {
                let update = RecipeUpdate {
                    status: Some(RecipeStatus::PendingReview),
                    steps: Some(steps),
                    entry_url: Some(entry_url),
                    captcha: Some(captcha),
                    requires_account: Some(requires_account),
                    failure_reason: Some(None),
                    ..Default::default()
                };
                let recipe = self.store.update(authority, update).await?;
                info!(
                    %authority,
                    steps = recipe.steps.len(),
                    captcha = ?recipe.captcha,
                    requires_account = recipe.requires_account,
                    "draft recipe ready for review"
                );
                Ok(LearnReport {
                    needs_human_help: false,
                    reason: None,
                    recipe,
                })
            }
            Err(err) => {
                self.dead_end(authority, &format!("portal probe failed: {err}"))
                    .await
            }
        }
    }

    async fn ensure_learning_record(
        &self,
        authority: &AuthorityId,
        seed_url: Option<&str>,
    ) -> Result<(), LearnerError> {
        if self.store.get(authority).await?.is_none() {
            let recipe = Recipe::new(authority.clone(), seed_url.unwrap_or_default());
            self.store.create(recipe).await?;
        }
        self.store
            .update(authority, RecipeUpdate::status(RecipeStatus::Learning))
            .await?;
        Ok(())
    }

    async fn resolve_portal(
        &self,
        authority: &AuthorityId,
        seed_url: Option<&str>,
    ) -> Result<String, LearnerError> {
        if let Some(url) = seed_url {
            return Ok(url.to_string());
        }
        if let Some(url) = self.table.lookup(authority) {
            return Ok(url.to_string());
        }
        if let Some(url) = self.locator.locate(authority).await {
            return Ok(url);
        }
        Err(LearnerError::TargetNotFound(authority.clone()))
    }

    async fn probe(
        &self,
        page: &dyn PageDriver,
        entry_url: &str,
    ) -> Result<(CaptchaKind, bool, Vec<Step>), SessionError> {
        page.navigate(entry_url).await?;
        let content = page.content().await?;
        let captcha = detect_captcha(&content);
        let requires_account = detect_account_requirement(&content);
        let fields = page.form_fields().await?;
        Ok((
            captcha,
            requires_account,
            draft_steps(entry_url, &fields, captcha),
        ))
    }

    async fn dead_end(
        &self,
        authority: &AuthorityId,
        reason: &str,
    ) -> Result<LearnReport, LearnerError> {
        self.sink
            .submit(
                Report::error("learner", "locate_portal", reason)
                    .with_authority(authority.clone()),
            )
            .await;
        let recipe = self
            .store
            .update(authority, RecipeUpdate::needs_human_help(reason))
            .await?;
        Ok(LearnReport {
            needs_human_help: true,
            reason: Some(reason.to_string()),
            recipe,
        })
    }
}
