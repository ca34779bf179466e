mod error;
mod paths;
mod records;
mod store;

pub use error::TranscriptStoreError;
pub use paths::{
    backup_file_name, backup_timestamp, validate_respondent_id, RecordKind, StoreDirectories,
};
pub use records::{parse_transcript, read_transcript, render_timing, render_transcript};
pub use store::{PersistTier, SessionSnapshot, TranscriptSink, TranscriptStore};
