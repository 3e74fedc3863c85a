//! Portal location.
//!
//! A built-in lookup table answers for known authorities; anything else is
//! delegated to an external search collaborator. Both coming back empty is
//! the learner's dead-end.

use std::collections::HashMap;

use async_trait::async_trait;

use challenger_core_types::AuthorityId;

/// External collaborator that can find a challenge portal URL for an
/// authority (a search service in production, a stub in tests).
#[async_trait]
pub trait PortalLocator: Send + Sync {
    async fn locate(&self, authority: &AuthorityId) -> Option<String>;
}

/// Static authority -> portal URL table, consulted before the external
/// locator. Entries are maintained by hand as portals are confirmed.
pub struct StaticPortalTable {
    entries: HashMap<AuthorityId, String>,
}

impl StaticPortalTable {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    pub fn with_entry(mut self, authority: AuthorityId, url: impl Into<String>) -> Self {
        self.entries.insert(authority, url.into());
        self
    }

    pub fn lookup(&self, authority: &AuthorityId) -> Option<&str> {
        self.entries.get(authority).map(String::as_str)
    }
}

impl Default for StaticPortalTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Locator that never finds anything; the default wiring when no search
/// collaborator is configured.
pub struct NoopPortalLocator;

#[async_trait]
impl PortalLocator for NoopPortalLocator {
    async fn locate(&self, _authority: &AuthorityId) -> Option<String> {
        None
    }
}
