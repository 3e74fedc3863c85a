//! Shared evidence helpers for hand-written adapters.

use tracing::warn;

use browser_session::PageDriver;
use evidence_store::{put_with_retry, EvidencePath, EvidenceStore};
use runner::Challenge;

/// Screenshot the page into storage and record the key on the challenge.
/// Loss of a mid-flow screenshot is never fatal; the final artifact of a
/// flow passes `retried = true` to get the single upload retry.
pub(crate) async fn capture(
    page: &dyn PageDriver,
    store: &dyn EvidenceStore,
    path: EvidencePath,
    challenge: &mut Challenge,
    retried: bool,
) {
    let bytes = match page.screenshot().await {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!(%path, %err, "adapter screenshot failed");
            return;
        }
    };
    let upload = if retried {
        put_with_retry(store, &path, bytes, "image/png").await
    } else {
        store.put(&path, bytes, "image/png").await
    };
    match upload {
        Ok(()) => challenge.evidence.push(path.as_str().to_string()),
        Err(err) => warn!(%path, %err, "adapter evidence upload failed"),
    }
}

/// Screenshot into storage without a challenge record (verify flows).
/// Returns the stored key, or `None` when capture or upload failed.
pub(crate) async fn capture_standalone(
    page: &dyn PageDriver,
    store: &dyn EvidenceStore,
    path: EvidencePath,
) -> Option<String> {
    let bytes = match page.screenshot().await {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!(%path, %err, "adapter screenshot failed");
            return None;
        }
    };
    match store.put(&path, bytes, "image/png").await {
        Ok(()) => Some(path.as_str().to_string()),
        Err(err) => {
            warn!(%path, %err, "adapter evidence upload failed");
            None
        }
    }
}
