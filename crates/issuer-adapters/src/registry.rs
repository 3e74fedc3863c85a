//! Explicit automation registry.
//!
//! Built once at process start and passed by reference to whatever
//! dispatches work, never consulted as ambient global state.

use std::sync::Arc;

use dashmap::DashMap;

use challenger_core_types::AuthorityId;

use crate::errors::AdapterError;
use crate::ChallengeAutomation;

#[derive(Default)]
pub struct AutomationRegistry {
    entries: DashMap<AuthorityId, Arc<dyn ChallengeAutomation>>,
}

impl AutomationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an automation under its own authority id. Last write wins,
    /// letting a hand-written adapter shadow the generic recipe path.
    pub fn register(&self, automation: Arc<dyn ChallengeAutomation>) {
        self.entries.insert(automation.authority(), automation);
    }

    pub fn dispatch(
        &self,
        authority: &AuthorityId,
    ) -> Result<Arc<dyn ChallengeAutomation>, AdapterError> {
        self.entries
            .get(authority)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| AdapterError::Unsupported(authority.clone()))
    }

    pub fn authorities(&self) -> Vec<AuthorityId> {
        let mut ids: Vec<AuthorityId> = self.entries.iter().map(|e| e.key().clone()).collect();
        ids.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        ids
    }
}
