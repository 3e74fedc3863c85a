//! Recipe persistence.
//!
//! The store exposes `create`/`update`/`get` and deliberately no delete:
//! failed recipes are retained for audit. Status changes go through the
//! lifecycle guard, so an update cannot smuggle a recipe into `Verified`
//! from a state the state machine forbids.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::debug;

use challenger_core_types::AuthorityId;

use crate::errors::RecipeError;
use crate::lifecycle::RecipeStatus;
use crate::model::{Recipe, Step};

/// Partial update applied through [`RecipeStore::update`]. Only the fields
/// set are touched; `updated_at` is stamped by the store.
#[derive(Clone, Debug, Default)]
pub struct RecipeUpdate {
    pub status: Option<RecipeStatus>,
    pub steps: Option<Vec<Step>>,
    pub entry_url: Option<String>,
    pub captcha: Option<challenger_core_types::CaptchaKind>,
    pub requires_account: Option<bool>,
    pub last_verified_at: Option<DateTime<Utc>>,
    pub last_failed_at: Option<DateTime<Utc>>,
    /// `Some(None)` clears the reason; `Some(Some(_))` sets it.
    pub failure_reason: Option<Option<String>>,
}

impl RecipeUpdate {
    pub fn status(status: RecipeStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    /// Verifier success: refresh the verification timestamp.
    pub fn verified_now() -> Self {
        Self {
            status: Some(RecipeStatus::Verified),
            last_verified_at: Some(Utc::now()),
            failure_reason: Some(None),
            ..Default::default()
        }
    }

    /// Verifier failure: demote and record why.
    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            status: Some(RecipeStatus::Failed),
            last_failed_at: Some(Utc::now()),
            failure_reason: Some(Some(reason.into())),
            ..Default::default()
        }
    }

    pub fn needs_human_help(reason: impl Into<String>) -> Self {
        Self {
            status: Some(RecipeStatus::NeedsHumanHelp),
            failure_reason: Some(Some(reason.into())),
            ..Default::default()
        }
    }

    fn apply(self, recipe: &mut Recipe) -> Result<(), RecipeError> {
        if let Some(next) = self.status {
            if next != recipe.status && !recipe.status.can_transition_to(next) {
                return Err(RecipeError::InvalidTransition {
                    from: recipe.status,
                    to: next,
                });
            }
            recipe.status = next;
        }
        if let Some(steps) = self.steps {
            recipe.steps = steps;
            recipe.validate_steps()?;
        }
        if let Some(entry_url) = self.entry_url {
            recipe.entry_url = entry_url;
        }
        if let Some(captcha) = self.captcha {
            recipe.captcha = captcha;
        }
        if let Some(requires_account) = self.requires_account {
            recipe.requires_account = requires_account;
        }
        if let Some(ts) = self.last_verified_at {
            recipe.last_verified_at = Some(ts);
        }
        if let Some(ts) = self.last_failed_at {
            recipe.last_failed_at = Some(ts);
        }
        if let Some(reason) = self.failure_reason {
            recipe.failure_reason = reason;
        }
        recipe.updated_at = Utc::now();
        Ok(())
    }
}

/// Persistence API for recipes. One recipe per authority.
#[async_trait]
pub trait RecipeStore: Send + Sync {
    async fn create(&self, recipe: Recipe) -> Result<(), RecipeError>;
    async fn update(
        &self,
        authority: &AuthorityId,
        update: RecipeUpdate,
    ) -> Result<Recipe, RecipeError>;
    async fn get(&self, authority: &AuthorityId) -> Result<Option<Recipe>, RecipeError>;
}

/// In-memory store suitable for unit tests and early integration.
#[derive(Default)]
pub struct MemoryRecipeStore {
    inner: RwLock<HashMap<AuthorityId, Recipe>>,
}

impl MemoryRecipeStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecipeStore for MemoryRecipeStore {
    async fn create(&self, recipe: Recipe) -> Result<(), RecipeError> {
        recipe.validate_steps()?;
        let mut guard = self.inner.write();
        if guard.contains_key(&recipe.authority) {
            return Err(RecipeError::AlreadyExists(recipe.authority.clone()));
        }
        guard.insert(recipe.authority.clone(), recipe);
        Ok(())
    }

    async fn update(
        &self,
        authority: &AuthorityId,
        update: RecipeUpdate,
    ) -> Result<Recipe, RecipeError> {
        let mut guard = self.inner.write();
        let recipe = guard
            .get_mut(authority)
            .ok_or_else(|| RecipeError::NotFound(authority.clone()))?;
        update.apply(recipe)?;
        Ok(recipe.clone())
    }

    async fn get(&self, authority: &AuthorityId) -> Result<Option<Recipe>, RecipeError> {
        Ok(self.inner.read().get(authority).cloned())
    }
}

/// One JSON document per authority under a root directory. Lets the tool
/// run without a database collaborator, and keeps recipes hand-editable
/// during review.
pub struct JsonRecipeStore {
    root: PathBuf,
}

impl JsonRecipeStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, authority: &AuthorityId) -> PathBuf {
        self.root.join(format!("{}.json", authority.as_str()))
    }

    async fn read(&self, authority: &AuthorityId) -> Result<Option<Recipe>, RecipeError> {
        let path = self.path_for(authority);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn write(&self, recipe: &Recipe) -> Result<(), RecipeError> {
        tokio::fs::create_dir_all(&self.root).await?;
        let path = self.path_for(&recipe.authority);
        let bytes = serde_json::to_vec_pretty(recipe)?;
        tokio::fs::write(&path, bytes).await?;
        debug!(authority = %recipe.authority, path = %path.display(), "recipe persisted");
        Ok(())
    }
}

#[async_trait]
impl RecipeStore for JsonRecipeStore {
    async fn create(&self, recipe: Recipe) -> Result<(), RecipeError> {
        recipe.validate_steps()?;
        if self.read(&recipe.authority).await?.is_some() {
            return Err(RecipeError::AlreadyExists(recipe.authority.clone()));
        }
        self.write(&recipe).await
    }

    async fn update(
        &self,
        authority: &AuthorityId,
        update: RecipeUpdate,
    ) -> Result<Recipe, RecipeError> {
        let mut recipe = self
            .read(authority)
            .await?
            .ok_or_else(|| RecipeError::NotFound(authority.clone()))?;
        update.apply(&mut recipe)?;
        self.write(&recipe).await?;
        Ok(recipe)
    }

    async fn get(&self, authority: &AuthorityId) -> Result<Option<Recipe>, RecipeError> {
        self.read(authority).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::StepAction;
    use challenger_core_types::StepOrder;

    fn pending_recipe(authority: &str) -> Recipe {
        let mut recipe = Recipe::new(AuthorityId::new(authority), "https://example.test/appeal");
        recipe.status = RecipeStatus::PendingReview;
        recipe.steps = vec![Step::new(
            StepOrder(1),
            StepAction::Navigate,
            "Open the appeal portal",
        )
        .with_value("https://example.test/appeal")];
        recipe
    }

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let store = MemoryRecipeStore::new();
        let recipe = pending_recipe("metro-parking");
        store.create(recipe.clone()).await.unwrap();
        let loaded = store.get(&recipe.authority).await.unwrap().unwrap();
        assert_eq!(loaded.id, recipe.id);
        assert_eq!(loaded.status, RecipeStatus::PendingReview);
    }

    #[tokio::test]
    async fn duplicate_create_is_rejected() {
        let store = MemoryRecipeStore::new();
        store.create(pending_recipe("metro-parking")).await.unwrap();
        let err = store
            .create(pending_recipe("metro-parking"))
            .await
            .unwrap_err();
        assert!(matches!(err, RecipeError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn approval_transition_is_enforced() {
        let store = MemoryRecipeStore::new();
        let recipe = pending_recipe("metro-parking");
        let authority = recipe.authority.clone();
        store.create(recipe).await.unwrap();

        // Review approves.
        let approved = store
            .update(&authority, RecipeUpdate::status(RecipeStatus::Verified))
            .await
            .unwrap();
        assert_eq!(approved.status, RecipeStatus::Verified);

        // Jumping back to Learning from Verified is not a legal move.
        let err = store
            .update(&authority, RecipeUpdate::status(RecipeStatus::Learning))
            .await
            .unwrap_err();
        assert!(matches!(err, RecipeError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn verifier_updates_stamp_timestamps() {
        let store = MemoryRecipeStore::new();
        let recipe = pending_recipe("metro-parking");
        let authority = recipe.authority.clone();
        store.create(recipe).await.unwrap();
        store
            .update(&authority, RecipeUpdate::status(RecipeStatus::Verified))
            .await
            .unwrap();

        let failed = store
            .update(&authority, RecipeUpdate::failed("selector drift on step 3"))
            .await
            .unwrap();
        assert_eq!(failed.status, RecipeStatus::Failed);
        assert!(failed.last_failed_at.is_some());
        assert_eq!(
            failed.failure_reason.as_deref(),
            Some("selector drift on step 3")
        );

        let restored = store
            .update(&authority, RecipeUpdate::verified_now())
            .await
            .unwrap();
        assert_eq!(restored.status, RecipeStatus::Verified);
        assert!(restored.last_verified_at.is_some());
        assert!(restored.failure_reason.is_none());
    }

    #[tokio::test]
    async fn json_store_round_trips_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonRecipeStore::new(dir.path());
        let recipe = pending_recipe("metro-parking");
        let authority = recipe.authority.clone();

        store.create(recipe).await.unwrap();
        let loaded = store.get(&authority).await.unwrap().unwrap();
        assert_eq!(loaded.authority, authority);

        let updated = store
            .update(&authority, RecipeUpdate::status(RecipeStatus::Verified))
            .await
            .unwrap();
        assert_eq!(updated.status, RecipeStatus::Verified);

        // A fresh store over the same directory sees the update.
        let reopened = JsonRecipeStore::new(dir.path());
        let persisted = reopened.get(&authority).await.unwrap().unwrap();
        assert_eq!(persisted.status, RecipeStatus::Verified);
    }
}
