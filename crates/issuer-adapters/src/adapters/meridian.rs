//! Meridian Parking Services.
//!
//! Private operator with an aggressive bot interstitial: roughly one page
//! load in three lands on an "automated activity detected" page that
//! clears itself after a pause, so every entry to the portal goes through
//! the bounded retry. The appeal itself is a two-page wizard behind a
//! charge search.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use automation_context::AutomationContext;
use browser_session::{PageDriver, SessionProvider};
use challenger_core_types::{AuthorityId, TicketId};
use evidence_store::{EvidencePathBuilder, EvidenceStore};
use report_sink::ReportSink;
use runner::{AutomationRef, Challenge};

use crate::errors::AdapterError;
use crate::retry::{retry_bounded, RetryContext, RetryPolicy};
use crate::support::{capture, capture_standalone};
use crate::ChallengeAutomation;

const SEARCH_URL: &str = "https://appeals.meridianparking.example/charge-search";
const ANTI_BOT_MARKER: &str = "automated activity detected";
const NOT_FOUND_MARKER: &str = "no matching parking charge";

const WAIT: std::time::Duration = std::time::Duration::from_secs(10);

pub struct MeridianParkingAdapter {
    sessions: Arc<dyn SessionProvider>,
    evidence: Arc<dyn EvidenceStore>,
    sink: Arc<dyn ReportSink>,
    retry: RetryPolicy,
}

impl MeridianParkingAdapter {
    pub fn new(
        sessions: Arc<dyn SessionProvider>,
        evidence: Arc<dyn EvidenceStore>,
        sink: Arc<dyn ReportSink>,
    ) -> Self {
        Self {
            sessions,
            evidence,
            sink,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn retry_context(&self, context: &AutomationContext) -> RetryContext {
        RetryContext {
            component: format!("adapter:{}", self.authority()),
            action: "anti_bot".into(),
            authority: self.authority(),
            pcn_number: Some(context.pcn_number.clone()),
            registration: Some(context.vehicle_registration.clone()),
        }
    }

    /// Search for the charge and land on its summary. One attempt; the
    /// caller wraps this in the bounded retry.
    async fn locate_charge(
        page: &dyn PageDriver,
        context: &AutomationContext,
        authority: AuthorityId,
        attempt: u32,
    ) -> Result<(), AdapterError> {
        page.navigate(SEARCH_URL).await?;
        let content = page.content().await?.to_lowercase();
        if content.contains(ANTI_BOT_MARKER) {
            return Err(AdapterError::AntiBotDetected { authority, attempt });
        }

        page.fill("#ChargeReference", &context.pcn_number).await?;
        page.fill("#VehicleReg", &context.vehicle_registration)
            .await?;
        page.click("#btn-search").await?;
        page.wait_for_selector(".charge-summary", WAIT).await?;

        let content = page.content().await?.to_lowercase();
        if content.contains(NOT_FOUND_MARKER) {
            return Err(AdapterError::TicketNotFound(format!(
                "charge {} not found for {}",
                context.pcn_number, context.vehicle_registration
            )));
        }
        Ok(())
    }

    async fn locate_with_retry(
        &self,
        page: Arc<dyn PageDriver>,
        context: &AutomationContext,
    ) -> Result<(), AdapterError> {
        let retry_context = self.retry_context(context);
        let authority = self.authority();
        let context = context.clone();
        retry_bounded(
            &self.retry,
            self.sink.as_ref(),
            &retry_context,
            AdapterError::is_anti_bot,
            move |attempt| {
                let page = Arc::clone(&page);
                let context = context.clone();
                let authority = authority.clone();
                async move {
                    Self::locate_charge(page.as_ref(), &context, authority, attempt).await
                }
            },
        )
        .await
    }

    /// The appeal wizard: representation page, then declaration page.
    async fn drive_appeal(
        &self,
        page: &dyn PageDriver,
        context: &AutomationContext,
        dry_run: bool,
        paths: &EvidencePathBuilder,
        challenge: &mut Challenge,
    ) -> Result<(), AdapterError> {
        page.click("a.challenge-charge").await?;
        page.wait_for_selector("#appeal-form", WAIT).await?;
        capture(
            page,
            self.evidence.as_ref(),
            paths.artifact("appeal-form.png"),
            challenge,
            false,
        )
        .await;

        let full_name = format!("{} {}", context.first_name, context.last_name);
        page.fill("#AppellantName", full_name.trim()).await?;
        page.fill("#AppellantEmail", &context.email).await?;
        page.fill("#AppellantAddress", &context.address_line1).await?;
        page.fill("#AppellantPostcode", &context.postcode).await?;
        page.fill("#AppealDetails", &context.narrative).await?;
        page.click("#btn-continue").await?;
        page.wait_for_selector("#declaration", WAIT).await?;
        capture(
            page,
            self.evidence.as_ref(),
            paths.artifact("declaration.png"),
            challenge,
            false,
        )
        .await;

        page.click("#declaration-agree").await?;
        if dry_run {
            info!(authority = %self.authority(), "dry run: stopping before final submission");
            capture(
                page,
                self.evidence.as_ref(),
                paths.artifact("dry-run-final-state.png"),
                challenge,
                true,
            )
            .await;
            return Ok(());
        }

        page.click("#btn-submit-appeal").await?;
        page.wait_for_selector(".appeal-confirmation", WAIT).await?;
        capture(
            page,
            self.evidence.as_ref(),
            paths.artifact("confirmation.png"),
            challenge,
            true,
        )
        .await;
        Ok(())
    }
}

#[async_trait]
impl ChallengeAutomation for MeridianParkingAdapter {
    fn name(&self) -> &str {
        "meridian-parking"
    }

    fn authority(&self) -> AuthorityId {
        AuthorityId::new("meridian-parking")
    }

    async fn access(
        &self,
        _ticket: &TicketId,
        context: &AutomationContext,
    ) -> Result<(), AdapterError> {
        let session = self.sessions.open().await?;
        let result = self.locate_with_retry(session.page(), context).await;
        if let Err(err) = session.close().await {
            warn!(authority = %self.authority(), %err, "session close failed after access");
        }
        result
    }

    async fn verify(
        &self,
        ticket: &TicketId,
        context: &AutomationContext,
    ) -> Result<Vec<String>, AdapterError> {
        let paths = EvidencePathBuilder::for_ticket_evidence(&self.authority(), ticket);
        let existing = self.evidence.list_prefix(&paths.prefix()).await?;
        if !existing.is_empty() {
            info!(
                authority = %self.authority(),
                %ticket,
                artifacts = existing.len(),
                "portal evidence already mirrored, skipping re-fetch"
            );
            return Ok(existing);
        }

        let session = self.sessions.open().await?;
        let page = session.page();
        let result = async {
            self.locate_with_retry(Arc::clone(&page), context).await?;

            let mut keys = Vec::new();
            if let Some(key) = capture_standalone(
                page.as_ref(),
                self.evidence.as_ref(),
                paths.artifact("charge-summary.png"),
            )
            .await
            {
                keys.push(key);
            }

            // The photo strip sits behind a tab that not every charge has.
            match page.click("a.view-evidence").await {
                Ok(()) => {
                    page.wait_for_selector(".evidence-photos", WAIT).await?;
                    if let Some(key) = capture_standalone(
                        page.as_ref(),
                        self.evidence.as_ref(),
                        paths.artifact("contravention-photos.png"),
                    )
                    .await
                    {
                        keys.push(key);
                    }
                }
                Err(err) => {
                    warn!(authority = %self.authority(), %err, "no evidence tab on this charge");
                }
            }
            Ok(keys)
        }
        .await;

        if let Err(err) = session.close().await {
            warn!(authority = %self.authority(), %err, "session close failed after verify");
        }
        result
    }

    async fn challenge(
        &self,
        ticket: &TicketId,
        context: &AutomationContext,
        dry_run: bool,
    ) -> Result<Challenge, AdapterError> {
        let mut challenge = Challenge::begin(
            ticket.clone(),
            self.authority(),
            AutomationRef::Adapter {
                name: self.name().to_string(),
            },
            context.narrative.clone(),
            dry_run,
        );
        let paths = EvidencePathBuilder::for_challenge(&self.authority(), ticket, &challenge.id);

        let session = self.sessions.open().await?;
        let page = session.page();

        // Anti-bot exhaustion raises out of the adapter; anything that
        // fails once the flow is underway becomes an Error challenge.
        let located = self.locate_with_retry(Arc::clone(&page), context).await;
        if let Err(err) = located {
            if let Err(close_err) = session.close().await {
                warn!(authority = %self.authority(), %close_err, "session close failed");
            }
            return Err(err);
        }
        capture(
            page.as_ref(),
            self.evidence.as_ref(),
            paths.artifact("charge-summary.png"),
            &mut challenge,
            false,
        )
        .await;

        let driven = self
            .drive_appeal(page.as_ref(), context, dry_run, &paths, &mut challenge)
            .await;
        if let Err(err) = session.close().await {
            warn!(authority = %self.authority(), %err, "session close failed after challenge");
        }

        match driven {
            Ok(()) => challenge.succeed(),
            Err(err) => challenge.fail(format!("appeal flow failed: {err}")),
        }
        Ok(challenge)
    }
}
