//! Composite artifact paths.
//!
//! Convention: `{feature}/{scope}/{authority-or-ticket}/{challenge}/{leaf}`
//! where the leaf is `{step}-{timestamp}.{ext}` for per-step screenshots
//! or a caller-chosen name for scraped portal evidence.

use chrono::Utc;

use challenger_core_types::{AuthorityId, ChallengeId, StepOrder, TicketId};

/// A fully-formed storage key.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct EvidencePath(String);

impl EvidencePath {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EvidencePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Builds the per-challenge family of paths, so every artifact from one
/// run shares a listable prefix.
#[derive(Clone, Debug)]
pub struct EvidencePathBuilder {
    prefix: String,
}

impl EvidencePathBuilder {
    /// Prefix for a recipe-driven challenge run:
    /// `challenges/{authority}/{ticket}/{challenge}/`.
    pub fn for_challenge(
        authority: &AuthorityId,
        ticket: &TicketId,
        challenge: &ChallengeId,
    ) -> Self {
        Self {
            prefix: format!("challenges/{authority}/{ticket}/{challenge}"),
        }
    }

    /// Prefix for portal-hosted evidence pulled by an issuer adapter:
    /// `issuer-evidence/{authority}/{ticket}/`. Deliberately excludes the
    /// challenge id: scraped evidence belongs to the ticket, and the
    /// prefix check must see uploads from earlier challenges.
    pub fn for_ticket_evidence(authority: &AuthorityId, ticket: &TicketId) -> Self {
        Self {
            prefix: format!("issuer-evidence/{authority}/{ticket}"),
        }
    }

    /// The listable prefix, with a trailing slash so `ch-1` never matches
    /// `ch-10`'s artifacts.
    pub fn prefix(&self) -> String {
        format!("{}/", self.prefix)
    }

    /// Path for the screenshot taken after one step.
    pub fn step_screenshot(&self, order: StepOrder) -> EvidencePath {
        let ts = Utc::now().timestamp_millis();
        EvidencePath(format!("{}/step-{order}-{ts}.png", self.prefix))
    }

    /// Path for a named artifact (scraped photos, final-outcome captures).
    pub fn artifact(&self, name: &str) -> EvidencePath {
        EvidencePath(format!("{}/{name}", self.prefix))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn challenge_paths_share_the_prefix() {
        let authority = AuthorityId::new("metro-parking");
        let ticket = TicketId("t-42".into());
        let challenge = ChallengeId("ch-abc".into());
        let builder = EvidencePathBuilder::for_challenge(&authority, &ticket, &challenge);

        let shot = builder.step_screenshot(StepOrder(3));
        assert!(shot.as_str().starts_with("challenges/metro-parking/t-42/ch-abc/step-3-"));
        assert!(shot.as_str().ends_with(".png"));
        assert!(shot.as_str().starts_with(&builder.prefix()));
    }

    #[test]
    fn ticket_evidence_prefix_omits_challenge() {
        let builder = EvidencePathBuilder::for_ticket_evidence(
            &AuthorityId::new("metro-parking"),
            &TicketId("t-42".into()),
        );
        assert_eq!(builder.prefix(), "issuer-evidence/metro-parking/t-42/");
        assert_eq!(
            builder.artifact("contravention-photo-1.jpg").as_str(),
            "issuer-evidence/metro-parking/t-42/contravention-photo-1.jpg"
        );
    }
}
