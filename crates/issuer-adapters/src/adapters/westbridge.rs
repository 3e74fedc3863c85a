//! Westbridge Borough Council.
//!
//! Council portal: PCN lookup by reference and registration, details page
//! with CCTV stills behind a tab, single-page representation form guarded
//! by reCAPTCHA. No bot interstitial, but the representation form rejects
//! submissions without a captcha token, so the solve call sits directly
//! before the submit.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use automation_context::AutomationContext;
use browser_session::{CaptchaOutcome, PageDriver, SessionProvider};
use challenger_core_types::{AuthorityId, TicketId};
use evidence_store::{EvidencePathBuilder, EvidenceStore};
use runner::{AutomationRef, Challenge};

use crate::errors::AdapterError;
use crate::support::{capture, capture_standalone};
use crate::ChallengeAutomation;

const LOOKUP_URL: &str = "https://pcn.westbridge.example/lookup";
const NOT_FOUND_MARKER: &str = "we could not find a penalty charge notice";

const WAIT: std::time::Duration = std::time::Duration::from_secs(10);

pub struct WestbridgeCouncilAdapter {
    sessions: Arc<dyn SessionProvider>,
    evidence: Arc<dyn EvidenceStore>,
}

impl WestbridgeCouncilAdapter {
    pub fn new(sessions: Arc<dyn SessionProvider>, evidence: Arc<dyn EvidenceStore>) -> Self {
        Self { sessions, evidence }
    }

    async fn locate_pcn(
        page: &dyn PageDriver,
        context: &AutomationContext,
    ) -> Result<(), AdapterError> {
        page.navigate(LOOKUP_URL).await?;
        page.fill("#pcn-ref", &context.pcn_number).await?;
        page.fill("#vehicle-vrm", &context.vehicle_registration)
            .await?;
        page.click("#find-pcn").await?;
        page.wait_for_selector("#pcn-details", WAIT).await?;

        let content = page.content().await?.to_lowercase();
        if content.contains(NOT_FOUND_MARKER) {
            return Err(AdapterError::TicketNotFound(format!(
                "PCN {} not found",
                context.pcn_number
            )));
        }
        Ok(())
    }

    async fn drive_representation(
        &self,
        page: &dyn PageDriver,
        context: &AutomationContext,
        dry_run: bool,
        paths: &EvidencePathBuilder,
        challenge: &mut Challenge,
    ) -> Result<(), AdapterError> {
        page.click("#make-representation").await?;
        page.wait_for_selector("#representation-form", WAIT).await?;

        let full_name = format!("{} {}", context.first_name, context.last_name);
        page.fill("#rep-name", full_name.trim()).await?;
        page.fill("#rep-email", &context.email).await?;
        page.fill("#rep-postcode", &context.postcode).await?;
        page.select_option("#rep-ground", &context.reason).await?;
        page.fill("#rep-details", &context.narrative).await?;
        capture(
            page,
            self.evidence.as_ref(),
            paths.artifact("representation-filled.png"),
            challenge,
            false,
        )
        .await;

        // The form bounces token-less submissions, so solve first; an
        // unresolved captcha still lets the dry-run evidence through.
        match page.solve_captcha().await? {
            CaptchaOutcome::Solved { .. } | CaptchaOutcome::NotPresent => {}
            CaptchaOutcome::Unresolved { reason } => {
                warn!(authority = %self.authority(), %reason, "captcha unresolved before submit");
            }
        }

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

        page.click("#submit-representation").await?;
        page.wait_for_selector(".representation-received", WAIT)
            .await?;
        capture(
            page,
            self.evidence.as_ref(),
            paths.artifact("receipt.png"),
            challenge,
            true,
        )
        .await;
        Ok(())
    }
}

#[async_trait]
impl ChallengeAutomation for WestbridgeCouncilAdapter {
    fn name(&self) -> &str {
        "westbridge-council"
    }

    fn authority(&self) -> AuthorityId {
        AuthorityId::new("westbridge-council")
    }

    async fn access(
        &self,
        _ticket: &TicketId,
        context: &AutomationContext,
    ) -> Result<(), AdapterError> {
        let session = self.sessions.open().await?;
        let result = Self::locate_pcn(session.page().as_ref(), context).await;
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
            Self::locate_pcn(page.as_ref(), context).await?;

            let mut keys = Vec::new();
            if let Some(key) = capture_standalone(
                page.as_ref(),
                self.evidence.as_ref(),
                paths.artifact("pcn-details.png"),
            )
            .await
            {
                keys.push(key);
            }

            match page.click("#evidence-tab").await {
                Ok(()) => {
                    page.wait_for_selector(".cctv-stills", WAIT).await?;
                    if let Some(key) = capture_standalone(
                        page.as_ref(),
                        self.evidence.as_ref(),
                        paths.artifact("cctv-stills.png"),
                    )
                    .await
                    {
                        keys.push(key);
                    }
                }
                Err(err) => {
                    warn!(authority = %self.authority(), %err, "no CCTV stills for this PCN");
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

        let driven = async {
            Self::locate_pcn(page.as_ref(), context).await?;
            capture(
                page.as_ref(),
                self.evidence.as_ref(),
                paths.artifact("pcn-details.png"),
                &mut challenge,
                false,
            )
            .await;
            self.drive_representation(page.as_ref(), context, dry_run, &paths, &mut challenge)
                .await
        }
        .await;

        if let Err(err) = session.close().await {
            warn!(authority = %self.authority(), %err, "session close failed after challenge");
        }

        match driven {
            Ok(()) => challenge.succeed(),
            Err(err) => challenge.fail(format!("representation flow failed: {err}")),
        }
        Ok(challenge)
    }
}
