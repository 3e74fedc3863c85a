//! Object-storage collaborator for evidence artifacts.
//!
//! Screenshots and scraped portal evidence are write-once, read-many,
//! addressed by a composite path that makes every artifact traceable to an
//! authority, ticket, challenge and step. Prefix listing answers "has this
//! already been uploaded?" so re-running extraction never duplicates
//! artifacts.

pub mod path;
pub mod store;

pub use path::{EvidencePath, EvidencePathBuilder};
pub use store::{put_with_retry, EvidenceStore, FsEvidenceStore, MemoryEvidenceStore};

use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum EvidenceError {
    /// The path already holds an artifact; evidence is immutable.
    #[error("Artifact already exists at `{0}`")]
    AlreadyExists(String),

    /// Transport or filesystem failure during upload.
    #[error("Evidence upload failed: {0}")]
    Upload(String),

    /// Listing a prefix failed.
    #[error("Evidence listing failed: {0}")]
    Listing(String),
}
