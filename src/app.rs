//! Process wiring.
//!
//! Collaborators are constructed once here and handed around by reference;
//! in particular the automation registry is built at startup and dispatch
//! never consults ambient state.

use std::sync::Arc;

use anyhow::Result;

use browser_session::{
    CaptchaSolver, ChromiumSessionProvider, HttpCaptchaSolver, NoopCaptchaSolver, SessionConfig,
    SessionProvider,
};
use challenger_core_types::AuthorityId;
use evidence_store::{EvidenceStore, FsEvidenceStore};
use issuer_adapters::{
    AutomationRegistry, ChallengeAutomation, MeridianParkingAdapter, RecipeAutomation,
    RetryPolicy, WestbridgeCouncilAdapter,
};
use learner::{NoopPortalLocator, RecipeLearner, StaticPortalTable};
use recipes::{JsonRecipeStore, RecipeStore};
use report_sink::{ReportSink, TracingSink};
use runner::{RecipeRunner, Verifier};

use crate::config::AppConfig;

pub struct App {
    pub config: AppConfig,
    pub sessions: Arc<dyn SessionProvider>,
    pub evidence: Arc<dyn EvidenceStore>,
    pub recipes: Arc<dyn RecipeStore>,
    pub sink: Arc<dyn ReportSink>,
    pub runner: Arc<RecipeRunner>,
    pub registry: AutomationRegistry,
}

impl App {
    pub fn bootstrap(config: AppConfig) -> Result<Self> {
        let solver: Arc<dyn CaptchaSolver> = if config.captcha.api_key.is_empty() {
            Arc::new(NoopCaptchaSolver)
        } else {
            Arc::new(HttpCaptchaSolver::new(
                config.captcha.endpoint.clone(),
                config.captcha.api_key.clone(),
                config.captcha_timeout(),
            ))
        };

        let sessions: Arc<dyn SessionProvider> = Arc::new(ChromiumSessionProvider::new(
            SessionConfig {
                headless: config.browser.headless,
                executable: config.browser.chrome_executable.clone(),
                user_data_dir: None,
                nav_timeout: config.nav_timeout(),
            },
            solver,
        ));
        let evidence: Arc<dyn EvidenceStore> =
            Arc::new(FsEvidenceStore::new(&config.storage.evidence_root));
        let recipes: Arc<dyn RecipeStore> =
            Arc::new(JsonRecipeStore::new(&config.storage.recipes_root));
        let sink: Arc<dyn ReportSink> = Arc::new(TracingSink);
        let runner = Arc::new(RecipeRunner::new(
            Arc::clone(&sessions),
            Arc::clone(&evidence),
        ));

        let retry = RetryPolicy {
            max_attempts: config.retry.max_attempts,
            delay: config.retry_delay(),
        };
        let registry = AutomationRegistry::new();
        registry.register(Arc::new(
            MeridianParkingAdapter::new(
                Arc::clone(&sessions),
                Arc::clone(&evidence),
                Arc::clone(&sink),
            )
            .with_retry_policy(retry),
        ));
        registry.register(Arc::new(WestbridgeCouncilAdapter::new(
            Arc::clone(&sessions),
            Arc::clone(&evidence),
        )));

        Ok(Self {
            config,
            sessions,
            evidence,
            recipes,
            sink,
            runner,
            registry,
        })
    }

    /// Automation for an authority: a hand-written adapter when one is
    /// registered, otherwise the generic recipe path.
    pub fn automation_for(&self, authority: &AuthorityId) -> Arc<dyn ChallengeAutomation> {
        self.registry.dispatch(authority).unwrap_or_else(|_| {
            Arc::new(RecipeAutomation::new(
                authority.clone(),
                Arc::clone(&self.recipes),
                Arc::clone(&self.runner),
                Arc::clone(&self.sessions),
            ))
        })
    }

    pub fn learner(&self) -> RecipeLearner {
        RecipeLearner::new(
            Arc::clone(&self.sessions),
            Arc::clone(&self.recipes),
            Arc::clone(&self.sink),
            known_portals(),
            Arc::new(NoopPortalLocator),
        )
    }

    pub fn verifier(&self) -> Verifier {
        Verifier::new(Arc::clone(&self.runner), Arc::clone(&self.recipes))
    }
}

/// Authorities whose portals have been confirmed by hand.
fn known_portals() -> StaticPortalTable {
    StaticPortalTable::new()
        .with_entry(
            AuthorityId::new("westbridge-council"),
            "https://pcn.westbridge.example/lookup",
        )
        .with_entry(
            AuthorityId::new("meridian-parking"),
            "https://appeals.meridianparking.example/charge-search",
        )
}
