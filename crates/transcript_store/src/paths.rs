use std::fs;
use std::path::{Path, PathBuf};

use time::macros::format_description;
use time::OffsetDateTime;

use crate::error::TranscriptStoreError;

pub const DEFAULT_TRANSCRIPTS_DIR: &str = "data/transcripts";
pub const DEFAULT_TIMES_DIR: &str = "data/times";
pub const DEFAULT_BACKUPS_DIR: &str = "data/backups";

/// Which of the two per-respondent records a file holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Transcript,
    Timing,
}

impl RecordKind {
    fn backup_label(self) -> &'static str {
        match self {
            Self::Transcript => "transcript",
            Self::Timing => "time",
        }
    }
}

/// Target directories for the final and backup tiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreDirectories {
    pub transcripts: PathBuf,
    pub times: PathBuf,
    pub backups: PathBuf,
}

impl Default for StoreDirectories {
    fn default() -> Self {
        Self::new(DEFAULT_TRANSCRIPTS_DIR, DEFAULT_TIMES_DIR, DEFAULT_BACKUPS_DIR)
    }
}

impl StoreDirectories {
    #[must_use]
    pub fn new(
        transcripts: impl Into<PathBuf>,
        times: impl Into<PathBuf>,
        backups: impl Into<PathBuf>,
    ) -> Self {
        Self {
            transcripts: transcripts.into(),
            times: times.into(),
            backups: backups.into(),
        }
    }

    /// All three directories below one root, using the default leaf names.
    #[must_use]
    pub fn under(root: &Path) -> Self {
        Self::new(
            root.join("transcripts"),
            root.join("times"),
            root.join("backups"),
        )
    }

    /// Creates every directory that does not exist yet.
    pub fn ensure(&self) -> Result<(), TranscriptStoreError> {
        for dir in [&self.transcripts, &self.times, &self.backups] {
            fs::create_dir_all(dir)
                .map_err(|source| TranscriptStoreError::io("creating directory", dir, source))?;
        }
        Ok(())
    }

    #[must_use]
    pub fn final_path(&self, kind: RecordKind, respondent_id: &str) -> PathBuf {
        let dir = match kind {
            RecordKind::Transcript => &self.transcripts,
            RecordKind::Timing => &self.times,
        };
        dir.join(format!("{respondent_id}.txt"))
    }

    #[must_use]
    pub fn backup_path(&self, kind: RecordKind, respondent_id: &str, stamp: &str) -> PathBuf {
        self.backups
            .join(backup_file_name(kind, respondent_id, stamp))
    }
}

/// Rejects ids that would escape the target directory or name no file at all.
pub fn validate_respondent_id(respondent_id: &str) -> Result<(), TranscriptStoreError> {
    let invalid = respondent_id.trim().is_empty()
        || respondent_id == "."
        || respondent_id == ".."
        || respondent_id
            .chars()
            .any(|c| matches!(c, '/' | '\\' | '\0'));

    if invalid {
        return Err(TranscriptStoreError::InvalidRespondentId {
            id: respondent_id.to_string(),
        });
    }

    Ok(())
}

/// Formats a session start as `YYYY_MM_DD_HH_MM_SS` for backup file names.
pub fn backup_timestamp(started_at: OffsetDateTime) -> Result<String, TranscriptStoreError> {
    started_at
        .format(format_description!(
            "[year]_[month]_[day]_[hour]_[minute]_[second]"
        ))
        .map_err(TranscriptStoreError::ClockFormat)
}

#[must_use]
pub fn backup_file_name(kind: RecordKind, respondent_id: &str, stamp: &str) -> String {
    format!("{respondent_id}_{}_started_{stamp}.txt", kind.backup_label())
}
