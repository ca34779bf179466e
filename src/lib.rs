//! LLM-driven interview session controller.
//!
//! ## Configuration
//!
//! Set `INTERVIEWER_CONFIG_PATH` to a UTF-8 JSON file to override the
//! built-in defaults. Every field is optional:
//!
//! ```json
//! {
//!   "model": "gpt-4o-2024-05-13",
//!   "temperature": 0.7,
//!   "max_output_tokens": 2048,
//!   "transcripts_directory": "data/transcripts",
//!   "times_directory": "data/times",
//!   "backups_directory": "data/backups",
//!   "logins": false,
//!   "credentials": {},
//!   "script": { "outline": "...", "general_instructions": "...", "codes": { ... } },
//!   "timeout_sec": 120,
//!   "archive": { "endpoint": "https://...", "folder": "study", "token_env": "ARCHIVE_TOKEN" }
//! }
//! ```
//!
//! Contract notes:
//! - `model` names containing `gpt` use the chat-completions backend and read
//!   `OPENAI_API_KEY`; names containing `claude` use the messages backend and
//!   read `ANTHROPIC_API_KEY`. `mock` runs a scripted local backend.
//! - `api_key_env` overrides which variable holds the backend key.
//! - `timeout_sec` must be > 0 when provided.
//! - Unknown JSON fields are rejected.
//!
//! `INTERVIEWER_LOG` takes a `tracing` filter directive; logs go to stderr.
//!
//! ## Session contract
//!
//! A respondent with a final transcript on disk can never start again. Every
//! ordinary interviewer turn is backed up best effort; the closing record is
//! retried until the completion marker is observed.

pub mod auth;
pub mod codes;
pub mod commands;
pub mod config;
pub mod controller;
pub mod presenter;
pub mod providers;
pub mod script;
pub mod session;

pub use crate::auth::{authenticate, is_placeholder, AuthError, PLACEHOLDER_RESPONDENT_ID};
pub use crate::codes::{CodeKind, CodeScanner, ReservedCode, ReservedCodes};
pub use crate::commands::{parse_slash_command, SlashCommand, HELP_TEXT};
pub use crate::config::{ConfigError, EnvConfig, InterviewConfig};
pub use crate::controller::{
    ArchiveStatus, FinalPersistPolicy, InterviewController, SessionError, TurnOutcome,
};
pub use crate::presenter::{Presenter, TerminalPresenter};
pub use crate::script::InterviewScript;
pub use crate::session::{Session, SessionState, TerminationReason};
