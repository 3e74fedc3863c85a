//! Evidence storage backends.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::path::EvidencePath;
use crate::EvidenceError;

/// Write-once object storage for evidence artifacts.
#[async_trait]
pub trait EvidenceStore: Send + Sync {
    /// Upload an artifact. Fails with [`EvidenceError::AlreadyExists`] if
    /// the path is taken; evidence is immutable.
    async fn put(
        &self,
        path: &EvidencePath,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), EvidenceError>;

    /// Keys currently stored under the prefix.
    async fn list_prefix(&self, prefix: &str) -> Result<Vec<String>, EvidenceError>;

    /// Whether anything is stored under the prefix.
    async fn exists_prefix(&self, prefix: &str) -> Result<bool, EvidenceError> {
        Ok(!self.list_prefix(prefix).await?.is_empty())
    }
}

/// Upload with one retry. Used for final-outcome evidence, where losing the
/// artifact would leave a finished challenge with no proof.
pub async fn put_with_retry(
    store: &dyn EvidenceStore,
    path: &EvidencePath,
    bytes: Vec<u8>,
    content_type: &str,
) -> Result<(), EvidenceError> {
    match store.put(path, bytes.clone(), content_type).await {
        Ok(()) => Ok(()),
        Err(EvidenceError::AlreadyExists(existing)) => {
            Err(EvidenceError::AlreadyExists(existing))
        }
        Err(first) => {
            warn!(path = %path, %first, "evidence upload failed, retrying once");
            store.put(path, bytes, content_type).await
        }
    }
}

/// In-memory store suitable for unit tests and early integration.
#[derive(Default)]
pub struct MemoryEvidenceStore {
    objects: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryEvidenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.objects.read().len()
    }
}

#[async_trait]
impl EvidenceStore for MemoryEvidenceStore {
    async fn put(
        &self,
        path: &EvidencePath,
        bytes: Vec<u8>,
        _content_type: &str,
    ) -> Result<(), EvidenceError> {
        let mut guard = self.objects.write();
        let key = path.as_str().to_string();
        if guard.contains_key(&key) {
            return Err(EvidenceError::AlreadyExists(key));
        }
        guard.insert(key, bytes);
        Ok(())
    }

    async fn list_prefix(&self, prefix: &str) -> Result<Vec<String>, EvidenceError> {
        Ok(self
            .objects
            .read()
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect())
    }
}

/// Filesystem-backed store: keys map directly to paths under a root
/// directory. Stands in for the bucket in local operation.
pub struct FsEvidenceStore {
    root: PathBuf,
}

impl FsEvidenceStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn walk(dir: &Path, keys: &mut Vec<String>, root: &Path) -> std::io::Result<()> {
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.is_dir() {
                Self::walk(&path, keys, root)?;
            } else if let Ok(relative) = path.strip_prefix(root) {
                keys.push(relative.to_string_lossy().replace('\\', "/"));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl EvidenceStore for FsEvidenceStore {
    async fn put(
        &self,
        path: &EvidencePath,
        bytes: Vec<u8>,
        _content_type: &str,
    ) -> Result<(), EvidenceError> {
        let target = self.root.join(path.as_str());
        if target.exists() {
            return Err(EvidenceError::AlreadyExists(path.as_str().to_string()));
        }
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|err| EvidenceError::Upload(err.to_string()))?;
        }
        tokio::fs::write(&target, bytes)
            .await
            .map_err(|err| EvidenceError::Upload(err.to_string()))?;
        debug!(path = %path, "evidence artifact written");
        Ok(())
    }

    async fn list_prefix(&self, prefix: &str) -> Result<Vec<String>, EvidenceError> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }
        let mut keys = Vec::new();
        Self::walk(&self.root, &mut keys, &self.root)
            .map_err(|err| EvidenceError::Listing(err.to_string()))?;
        keys.retain(|key| key.starts_with(prefix));
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::EvidencePathBuilder;
    use challenger_core_types::{AuthorityId, ChallengeId, StepOrder, TicketId};

    fn builder() -> EvidencePathBuilder {
        EvidencePathBuilder::for_challenge(
            &AuthorityId::new("metro-parking"),
            &TicketId("t-1".into()),
            &ChallengeId("ch-1".into()),
        )
    }

    #[tokio::test]
    async fn put_is_write_once() {
        let store = MemoryEvidenceStore::new();
        let path = builder().artifact("outcome.png");
        store.put(&path, vec![1, 2, 3], "image/png").await.unwrap();
        let err = store.put(&path, vec![4], "image/png").await.unwrap_err();
        assert!(matches!(err, EvidenceError::AlreadyExists(_)));
        assert_eq!(store.count(), 1);
    }

    #[tokio::test]
    async fn prefix_listing_sees_only_the_challenge() {
        let store = MemoryEvidenceStore::new();
        let mine = builder();
        let other = EvidencePathBuilder::for_challenge(
            &AuthorityId::new("metro-parking"),
            &TicketId("t-1".into()),
            &ChallengeId("ch-2".into()),
        );
        store
            .put(&mine.step_screenshot(StepOrder(1)), vec![1], "image/png")
            .await
            .unwrap();
        store
            .put(&other.step_screenshot(StepOrder(1)), vec![2], "image/png")
            .await
            .unwrap();

        let listed = store.list_prefix(&mine.prefix()).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert!(store.exists_prefix(&mine.prefix()).await.unwrap());
        assert!(store.exists_prefix(&other.prefix()).await.unwrap());
    }

    #[tokio::test]
    async fn fs_store_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsEvidenceStore::new(dir.path());
        let path = builder().artifact("outcome.png");

        store.put(&path, vec![9, 9], "image/png").await.unwrap();
        let err = store.put(&path, vec![0], "image/png").await.unwrap_err();
        assert!(matches!(err, EvidenceError::AlreadyExists(_)));

        let listed = store.list_prefix(&builder().prefix()).await.unwrap();
        assert_eq!(listed, vec![path.as_str().to_string()]);
    }
}
