use std::fs;
use std::path::{Path, PathBuf};

use model_gateway::Message;
use time::OffsetDateTime;

use crate::error::TranscriptStoreError;
use crate::paths::{backup_timestamp, validate_respondent_id, RecordKind, StoreDirectories};
use crate::records::{render_timing, render_transcript};

/// Where a save lands and how durable it must be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistTier {
    /// Per-turn scratch copy, suffixed with the session start so attempts never collide.
    Backup,
    /// Canonical copy under the bare respondent id; its timing file marks completion.
    Final,
}

/// Borrowed view of the session state a save needs.
#[derive(Debug, Clone, Copy)]
pub struct SessionSnapshot<'a> {
    pub respondent_id: &'a str,
    pub messages: &'a [Message],
    pub started_at: OffsetDateTime,
    pub now: OffsetDateTime,
}

/// Persistence seam used by the session controller.
pub trait TranscriptSink: Send {
    /// Whether the canonical timing file exists for `respondent_id`.
    fn is_completed(&self, respondent_id: &str) -> Result<bool, TranscriptStoreError>;

    /// Writes the transcript and timing records for one tier.
    fn save(
        &self,
        tier: PersistTier,
        snapshot: &SessionSnapshot<'_>,
    ) -> Result<(), TranscriptStoreError>;
}

/// Filesystem-backed transcript store.
#[derive(Debug, Clone)]
pub struct TranscriptStore {
    dirs: StoreDirectories,
}

impl TranscriptStore {
    #[must_use]
    pub fn new(dirs: StoreDirectories) -> Self {
        Self { dirs }
    }

    /// Creates the target directories, then returns the store.
    pub fn open(dirs: StoreDirectories) -> Result<Self, TranscriptStoreError> {
        dirs.ensure()?;
        Ok(Self::new(dirs))
    }

    #[must_use]
    pub fn directories(&self) -> &StoreDirectories {
        &self.dirs
    }

    #[must_use]
    pub fn final_transcript_path(&self, respondent_id: &str) -> PathBuf {
        self.dirs.final_path(RecordKind::Transcript, respondent_id)
    }

    #[must_use]
    pub fn final_timing_path(&self, respondent_id: &str) -> PathBuf {
        self.dirs.final_path(RecordKind::Timing, respondent_id)
    }

    fn target_paths(
        &self,
        tier: PersistTier,
        snapshot: &SessionSnapshot<'_>,
    ) -> Result<(PathBuf, PathBuf), TranscriptStoreError> {
        let id = snapshot.respondent_id;
        Ok(match tier {
            PersistTier::Final => (
                self.final_transcript_path(id),
                self.final_timing_path(id),
            ),
            PersistTier::Backup => {
                let stamp = backup_timestamp(snapshot.started_at)?;
                (
                    self.dirs.backup_path(RecordKind::Transcript, id, &stamp),
                    self.dirs.backup_path(RecordKind::Timing, id, &stamp),
                )
            }
        })
    }
}

impl TranscriptSink for TranscriptStore {
    fn is_completed(&self, respondent_id: &str) -> Result<bool, TranscriptStoreError> {
        validate_respondent_id(respondent_id)?;
        let path = self.final_timing_path(respondent_id);
        path.try_exists()
            .map_err(|source| TranscriptStoreError::io("checking completion marker", path, source))
    }

    fn save(
        &self,
        tier: PersistTier,
        snapshot: &SessionSnapshot<'_>,
    ) -> Result<(), TranscriptStoreError> {
        validate_respondent_id(snapshot.respondent_id)?;
        let (transcript_path, timing_path) = self.target_paths(tier, snapshot)?;
        let transcript = render_transcript(snapshot.messages);
        let timing = render_timing(snapshot.started_at, snapshot.now)?;

        // Timing goes last: in the final tier its presence is the completion marker.
        write_replacing(&transcript_path, &transcript)?;
        write_replacing(&timing_path, &timing)?;

        tracing::debug!(
            respondent_id = snapshot.respondent_id,
            ?tier,
            messages = snapshot.messages.len(),
            path = %transcript_path.display(),
            "transcript saved"
        );
        Ok(())
    }
}

/// Writes through a sibling temp file and renames it over `path`.
fn write_replacing(path: &Path, contents: &str) -> Result<(), TranscriptStoreError> {
    let mut temp_name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    temp_name.push(".partial");
    let temp_path = path.with_file_name(temp_name);

    fs::write(&temp_path, contents)
        .map_err(|source| TranscriptStoreError::io("writing record", &temp_path, source))?;
    fs::rename(&temp_path, path)
        .map_err(|source| TranscriptStoreError::io("replacing record", path, source))
}
