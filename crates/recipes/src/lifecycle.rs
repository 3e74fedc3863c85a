//! Recipe lifecycle state machine.
//!
//! `Draft -> Learning -> PendingReview -> Verified <-> Failed`, with
//! `NeedsHumanHelp` reachable from learning and review when automation
//! cannot proceed on its own. Only `Verified` recipes are runnable.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecipeStatus {
    /// Created, learning not yet started.
    Draft,
    /// A learner probe is actively working this authority.
    Learning,
    /// Draft steps emitted; awaiting human approval.
    PendingReview,
    /// Approved and eligible for the runner.
    Verified,
    /// Verification failed; blocked until a human re-approves.
    Failed,
    /// Automation hit a dead-end a human must resolve (no portal found,
    /// rejected at review, account wall).
    NeedsHumanHelp,
}

impl RecipeStatus {
    /// Whether the runner may consume a recipe in this status.
    pub fn is_runnable(&self) -> bool {
        matches!(self, RecipeStatus::Verified)
    }

    /// Valid lifecycle moves. Same-status writes are updates, not
    /// transitions, and are always allowed by the store.
    pub fn can_transition_to(&self, next: RecipeStatus) -> bool {
        use RecipeStatus::*;
        matches!(
            (self, next),
            (Draft, Learning)
                | (Learning, PendingReview)
                | (Learning, NeedsHumanHelp)
                | (PendingReview, Verified)
                | (PendingReview, NeedsHumanHelp)
                | (Verified, Failed)
                | (Failed, Verified)
                | (Failed, PendingReview)
                | (NeedsHumanHelp, Learning)
                | (NeedsHumanHelp, PendingReview)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::RecipeStatus::*;

    #[test]
    fn happy_path_transitions() {
        assert!(Draft.can_transition_to(Learning));
        assert!(Learning.can_transition_to(PendingReview));
        assert!(PendingReview.can_transition_to(Verified));
    }

    #[test]
    fn verifier_demotion_and_reapproval() {
        assert!(Verified.can_transition_to(Failed));
        assert!(Failed.can_transition_to(Verified));
        assert!(Failed.can_transition_to(PendingReview));
    }

    #[test]
    fn learner_never_self_promotes() {
        assert!(!Learning.can_transition_to(Verified));
        assert!(!Draft.can_transition_to(Verified));
        assert!(!NeedsHumanHelp.can_transition_to(Verified));
    }

    #[test]
    fn only_verified_is_runnable() {
        for status in [Draft, Learning, PendingReview, Failed, NeedsHumanHelp] {
            assert!(!status.is_runnable());
        }
        assert!(Verified.is_runnable());
    }
}
