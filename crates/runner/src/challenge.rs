//! The challenge record: one submission attempt against one ticket.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use challenger_core_types::{AuthorityId, ChallengeId, ChallengeStatus, RecipeId, TicketId};

/// Which automation produced this challenge.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AutomationRef {
    Recipe { id: RecipeId },
    Adapter { name: String },
}

/// One challenge attempt. Created when a submission is requested, terminal
/// once the automation returns; a re-attempt creates a new record rather
/// than mutating a finished one.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Challenge {
    pub id: ChallengeId,
    pub ticket: TicketId,
    pub authority: AuthorityId,
    pub automation: AutomationRef,
    pub status: ChallengeStatus,
    pub dry_run: bool,
    /// Storage keys of every artifact captured during the run, in order.
    pub evidence: Vec<String>,
    pub narrative: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl Challenge {
    pub fn begin(
        ticket: TicketId,
        authority: AuthorityId,
        automation: AutomationRef,
        narrative: impl Into<String>,
        dry_run: bool,
    ) -> Self {
        Self {
            id: ChallengeId::new(),
            ticket,
            authority,
            automation,
            status: ChallengeStatus::Pending,
            dry_run,
            evidence: Vec::new(),
            narrative: narrative.into(),
            failure_reason: None,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn succeed(&mut self) {
        // Dry runs never submitted anything, so they stay pending.
        if !self.dry_run {
            self.status = ChallengeStatus::Success;
        }
        self.finished_at = Some(Utc::now());
    }

    pub fn fail(&mut self, reason: impl Into<String>) {
        self.status = ChallengeStatus::Error;
        self.failure_reason = Some(reason.into());
        self.finished_at = Some(Utc::now());
    }
}
