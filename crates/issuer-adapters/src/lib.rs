//! Per-authority challenge automation.
//!
//! Most authorities are served by the generic recipe path; the irregular
//! ones get a hand-written adapter. Both implement one narrow capability
//! interface (`access` / `verify` / `challenge`) and are dispatched by
//! authority id through an explicit registry built at process start.
//! Tagged-variant dispatch through a lookup table, not inheritance, and no
//! ambient global maps.

pub mod adapters;
pub mod errors;
pub mod generic;
pub mod registry;
pub mod retry;
mod support;

pub use adapters::meridian::MeridianParkingAdapter;
pub use adapters::westbridge::WestbridgeCouncilAdapter;
pub use errors::AdapterError;
pub use generic::RecipeAutomation;
pub use registry::AutomationRegistry;
pub use retry::{retry_bounded, RetryContext, RetryPolicy};

use async_trait::async_trait;
use tracing::warn;

use automation_context::AutomationContext;
use challenger_core_types::{AuthorityId, TicketId};
use runner::{AutomationRef, Challenge};

/// The capability every automation path implements.
#[async_trait]
pub trait ChallengeAutomation: Send + Sync {
    /// Stable name recorded on challenges this automation produces.
    fn name(&self) -> &str;

    fn authority(&self) -> AuthorityId;

    /// Locate the ticket on the portal and confirm it is actionable.
    async fn access(
        &self,
        ticket: &TicketId,
        context: &AutomationContext,
    ) -> Result<(), AdapterError>;

    /// Confirm visibility and mirror portal-hosted evidence into object
    /// storage. Idempotent: re-running against an already-processed ticket
    /// returns the existing artifacts instead of duplicating them.
    async fn verify(
        &self,
        ticket: &TicketId,
        context: &AutomationContext,
    ) -> Result<Vec<String>, AdapterError>;

    /// Drive the full challenge submission. Step-level failures inside the
    /// flow come back as an `Error` challenge; failures before the flow can
    /// start (anti-bot exhaustion, no session) are raised.
    async fn challenge(
        &self,
        ticket: &TicketId,
        context: &AutomationContext,
        dry_run: bool,
    ) -> Result<Challenge, AdapterError>;
}

/// Run a challenge and fold raised errors into a terminal challenge record,
/// so callers always get an auditable outcome.
pub async fn execute_challenge(
    automation: &dyn ChallengeAutomation,
    ticket: &TicketId,
    context: &AutomationContext,
    dry_run: bool,
) -> Challenge {
    match automation.challenge(ticket, context, dry_run).await {
        Ok(challenge) => challenge,
        Err(err) => {
            warn!(
                authority = %automation.authority(),
                %ticket,
                %err,
                "challenge automation raised"
            );
            let mut challenge = Challenge::begin(
                ticket.clone(),
                automation.authority(),
                AutomationRef::Adapter {
                    name: automation.name().to_string(),
                },
                context.narrative.clone(),
                dry_run,
            );
            challenge.fail(err.to_string());
            challenge
        }
    }
}
