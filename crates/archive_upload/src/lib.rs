//! Off-device archival of finished transcripts.
//!
//! The archive is best effort: callers report an [`ArchiveError`] to the
//! operator and carry on, since the local canonical record stays the source
//! of truth.

mod artifact;
mod error;
mod http;

pub use artifact::{export_csv, ArchiveArtifact, CSV_CONTENT_TYPE};
pub use error::ArchiveError;
pub use http::{ArchiveTarget, HttpArchiveUploader};

/// Pushes one artifact to durable remote storage.
pub trait ArchiveUploader: Send + Sync {
    /// Uploads `artifact` and returns the location it was stored at.
    fn upload(&self, artifact: &ArchiveArtifact) -> Result<String, ArchiveError>;
}
