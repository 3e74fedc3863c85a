//! Error types for issuer automation.

use thiserror::Error;

use browser_session::SessionError;
use challenger_core_types::AuthorityId;
use evidence_store::EvidenceError;
use runner::RunnerError;

#[derive(Debug, Error)]
pub enum AdapterError {
    /// The portal served its "automated activity detected" interstitial.
    /// Retried to a fixed bound before this escapes.
    #[error("Anti-bot protection triggered on `{authority}` (attempt {attempt})")]
    AntiBotDetected { authority: AuthorityId, attempt: u32 },

    /// The ticket could not be located on the portal.
    #[error("Ticket not visible on portal: {0}")]
    TicketNotFound(String),

    /// No automation is registered for the authority.
    #[error("No automation registered for authority `{0}`")]
    Unsupported(AuthorityId),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Evidence(#[from] EvidenceError),

    #[error(transparent)]
    Runner(#[from] RunnerError),
}

impl AdapterError {
    /// Retryable-state predicate for the bounded retry utility: only the
    /// anti-bot interstitial is worth waiting out.
    pub fn is_anti_bot(&self) -> bool {
        matches!(self, AdapterError::AntiBotDetected { .. })
    }
}
