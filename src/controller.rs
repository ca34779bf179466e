//! Interview session controller: turn loop, code detection, and persistence triggers.

use std::fmt;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use archive_upload::{ArchiveArtifact, ArchiveUploader};
use model_gateway::{GatewayError, GenerationParams, Message, ModelGateway, Role, TurnRequest};
use thiserror::Error;
use time::OffsetDateTime;
use transcript_store::{validate_respondent_id, PersistTier, TranscriptSink, TranscriptStoreError};

use crate::auth::is_placeholder;
use crate::codes::{CodeKind, CodeScanner};
use crate::config::DEFAULT_CANCEL_MESSAGE;
use crate::presenter::{Presenter, PARTIAL_DISPLAY_THRESHOLD, STREAM_CURSOR};
use crate::script::InterviewScript;
use crate::session::{Session, SessionState, TerminationReason};

pub const ALREADY_COMPLETED_NOTICE: &str = "Interview already completed.";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("interview already completed")]
    AlreadyCompleted,

    #[error("operation requires an active session (current state: {state:?})")]
    NotActive { state: SessionState },

    #[error("model gateway failed: {0}")]
    Gateway(#[from] GatewayError),

    #[error("transcript storage failed: {0}")]
    Storage(#[source] TranscriptStoreError),

    #[error("final transcript is not durable after {attempts} attempts: {last_error}")]
    FinalPersist { attempts: u32, last_error: String },

    #[error("no final record is pending (current state: {state:?})")]
    NoPendingRecord { state: SessionState },

    #[error("invalid respondent id: {0}")]
    InvalidRespondent(#[source] TranscriptStoreError),
}

/// How hard the controller tries to make the final record durable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinalPersistPolicy {
    pub retry_interval: Duration,
    /// Consecutive failures before one operator alert is raised.
    pub alert_after: u32,
    /// `None` keeps retrying until the record is durable.
    pub max_attempts: Option<u32>,
}

impl Default for FinalPersistPolicy {
    fn default() -> Self {
        Self {
            retry_interval: Duration::from_millis(100),
            alert_after: 50,
            max_attempts: None,
        }
    }
}

/// Result of the optional remote archive step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveStatus {
    Disabled,
    Uploaded { location: String },
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The session stays active; `reply` is the interviewer's message.
    Continue { reply: String },
    /// A reserved code ended the session and the final record is durable.
    Closed {
        code: CodeKind,
        closing_message: String,
        archive: ArchiveStatus,
    },
}

struct StreamedReply {
    text: String,
    code: Option<CodeKind>,
}

pub type Clock = fn() -> OffsetDateTime;

/// Local wall-clock time, falling back to UTC when the local offset is unknown.
pub fn now_local() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}

pub struct InterviewController {
    gateway: Arc<dyn ModelGateway>,
    sink: Box<dyn TranscriptSink>,
    archive: Option<Arc<dyn ArchiveUploader>>,
    script: InterviewScript,
    system_prompt: String,
    params: GenerationParams,
    cancel_message: String,
    final_persist: FinalPersistPolicy,
    clock: Clock,
    state: SessionState,
    session: Option<Session>,
}

impl fmt::Debug for InterviewController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterviewController")
            .field("gateway", &self.gateway.profile())
            .field("state", &self.state)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

impl InterviewController {
    pub fn new(
        gateway: Arc<dyn ModelGateway>,
        sink: Box<dyn TranscriptSink>,
        script: InterviewScript,
    ) -> Self {
        let system_prompt = script.system_prompt();
        Self {
            gateway,
            sink,
            archive: None,
            script,
            system_prompt,
            params: GenerationParams::default(),
            cancel_message: DEFAULT_CANCEL_MESSAGE.to_string(),
            final_persist: FinalPersistPolicy::default(),
            clock: now_local,
            state: SessionState::NotStarted,
            session: None,
        }
    }

    pub fn with_archive(mut self, uploader: Arc<dyn ArchiveUploader>) -> Self {
        self.archive = Some(uploader);
        self
    }

    pub fn with_final_persist_policy(mut self, policy: FinalPersistPolicy) -> Self {
        self.final_persist = policy;
        self
    }

    pub fn with_generation_params(mut self, params: GenerationParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_cancel_message(mut self, message: impl Into<String>) -> Self {
        self.cancel_message = message.into();
        self
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Starts the interview for `respondent_id` and streams the opening line.
    ///
    /// A completed respondent short-circuits to `AlreadyCompleted` without
    /// touching any file. A gateway failure discards the half-built session.
    pub fn initialize(
        &mut self,
        respondent_id: &str,
        presenter: &mut dyn Presenter,
    ) -> Result<TurnOutcome, SessionError> {
        if self.state != SessionState::NotStarted {
            return Err(SessionError::NotActive { state: self.state });
        }
        validate_respondent_id(respondent_id).map_err(SessionError::InvalidRespondent)?;

        if !is_placeholder(respondent_id)
            && self
                .sink
                .is_completed(respondent_id)
                .map_err(SessionError::Storage)?
        {
            tracing::info!(respondent_id, "interview already completed");
            self.state = SessionState::Terminated(TerminationReason::AlreadyCompleted);
            presenter.notice(ALREADY_COMPLETED_NOTICE);
            return Err(SessionError::AlreadyCompleted);
        }

        let started_at = (self.clock)();
        let history = self.gateway.prime_history(&self.system_prompt);
        self.session = Some(Session::new(respondent_id, history, started_at));
        self.state = SessionState::Active;
        tracing::info!(
            respondent_id,
            gateway = %self.gateway.profile().gateway_id,
            "interview session started"
        );

        match self.stream_reply(presenter) {
            Ok(reply) => self.finish_turn(reply, presenter),
            Err(error) => {
                tracing::error!(respondent_id, %error, "opening turn failed");
                self.session = None;
                self.state = SessionState::NotStarted;
                Err(SessionError::Gateway(error))
            }
        }
    }

    /// Records a respondent message and streams the interviewer's reply.
    ///
    /// On gateway failure the respondent message is rolled back and the
    /// session stays active so the same text can be sent again.
    pub fn submit_turn(
        &mut self,
        respondent_text: &str,
        presenter: &mut dyn Presenter,
    ) -> Result<TurnOutcome, SessionError> {
        self.active_session_mut()?
            .push(Message::user(respondent_text));

        match self.stream_reply(presenter) {
            Ok(reply) => self.finish_turn(reply, presenter),
            Err(error) => {
                if let Some(session) = self.session.as_mut() {
                    session.rollback_user_turn();
                }
                tracing::error!(%error, "interviewer turn failed");
                Err(SessionError::Gateway(error))
            }
        }
    }

    /// Cancels the interview at the respondent's request.
    ///
    /// The cancellation goes through final persistence but is not archived.
    pub fn quit(&mut self, presenter: &mut dyn Presenter) -> Result<(), SessionError> {
        let cancel_message = self.cancel_message.clone();
        let session = self.active_session_mut()?;
        session.push(Message::assistant(cancel_message.as_str()));
        session.deactivate();
        self.state = SessionState::Cancelling;
        presenter.show_message(Role::Assistant, &cancel_message);

        self.finish_cancellation(presenter)
    }

    /// Retries final persistence after a capped attempt gave up.
    ///
    /// Only valid while a code close or a cancellation is waiting on a durable
    /// record. A code close is archived once the record lands; a cancellation
    /// reports [`ArchiveStatus::Disabled`].
    pub fn retry_final_persist(
        &mut self,
        presenter: &mut dyn Presenter,
    ) -> Result<ArchiveStatus, SessionError> {
        match self.state {
            SessionState::Closing(code) => self.finish_closing(code, presenter),
            SessionState::Cancelling => self
                .finish_cancellation(presenter)
                .map(|()| ArchiveStatus::Disabled),
            state => Err(SessionError::NoPendingRecord { state }),
        }
    }

    fn finish_cancellation(&mut self, presenter: &mut dyn Presenter) -> Result<(), SessionError> {
        self.persist_final(presenter)?;
        self.state = SessionState::Terminated(TerminationReason::Cancelled);
        tracing::info!(reason = "cancelled", "interview session terminated");
        Ok(())
    }

    fn active_session_mut(&mut self) -> Result<&mut Session, SessionError> {
        match (self.state, self.session.as_mut()) {
            (SessionState::Active, Some(session)) => Ok(session),
            (state, _) => Err(SessionError::NotActive { state }),
        }
    }

    /// Pulls fragments until the stream ends or a reserved code appears.
    ///
    /// The code check runs before every display, so no partial shown to the
    /// respondent ever contains a complete code. Returning early drops the
    /// stream, which abandons the rest of the backend output.
    fn stream_reply(&self, presenter: &mut dyn Presenter) -> Result<StreamedReply, GatewayError> {
        let Some(session) = self.session.as_ref() else {
            return Err(GatewayError::new("no session to generate a reply for"));
        };
        let request = TurnRequest {
            messages: session.messages(),
            system_prompt: &self.system_prompt,
            params: &self.params,
        };

        let stream = self.gateway.stream(&request)?;
        let mut scanner = CodeScanner::new(&self.script.codes);
        let mut buffer = String::new();
        let mut chars = 0usize;

        for fragment in stream {
            let fragment = match fragment {
                Ok(fragment) => fragment,
                Err(error) => {
                    presenter.clear_partial();
                    return Err(error);
                }
            };
            if fragment.is_empty() {
                continue;
            }

            buffer.push_str(&fragment);
            chars += fragment.chars().count();

            if let Some(code) = scanner.scan(&buffer) {
                presenter.clear_partial();
                return Ok(StreamedReply {
                    text: buffer,
                    code: Some(code),
                });
            }

            if chars > PARTIAL_DISPLAY_THRESHOLD {
                presenter.show_partial(&format!("{buffer}{STREAM_CURSOR}"));
            }
        }

        Ok(StreamedReply {
            text: buffer,
            code: None,
        })
    }

    fn finish_turn(
        &mut self,
        reply: StreamedReply,
        presenter: &mut dyn Presenter,
    ) -> Result<TurnOutcome, SessionError> {
        match reply.code {
            None => {
                let session = self.active_session_mut()?;
                session.push(Message::assistant(reply.text.as_str()));
                presenter.show_message(Role::Assistant, &reply.text);
                self.persist_backup();
                Ok(TurnOutcome::Continue { reply: reply.text })
            }
            Some(code) => self.close_with_code(code, reply.text, presenter),
        }
    }

    fn close_with_code(
        &mut self,
        code: CodeKind,
        raw_reply: String,
        presenter: &mut dyn Presenter,
    ) -> Result<TurnOutcome, SessionError> {
        let closing_message = self.script.codes.get(code).message.clone();
        let session = self.active_session_mut()?;
        session.push(Message::assistant(raw_reply));
        session.deactivate();
        self.state = SessionState::Closing(code);
        tracing::info!(code = code.as_str(), "reserved code received");

        presenter.show_message(Role::Assistant, &closing_message);
        if let Some(session) = self.session.as_mut() {
            session.push(Message::assistant(closing_message.as_str()));
        }

        let archive = self.finish_closing(code, presenter)?;
        Ok(TurnOutcome::Closed {
            code,
            closing_message,
            archive,
        })
    }

    fn finish_closing(
        &mut self,
        code: CodeKind,
        presenter: &mut dyn Presenter,
    ) -> Result<ArchiveStatus, SessionError> {
        self.persist_final(presenter)?;
        self.state = SessionState::Terminated(TerminationReason::Code(code));
        tracing::info!(code = code.as_str(), "interview session terminated");

        Ok(self.archive_transcript(presenter))
    }

    /// Best effort: a failure is logged and the session carries on.
    fn persist_backup(&self) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        let snapshot = session.snapshot((self.clock)());
        if let Err(error) = self.sink.save(PersistTier::Backup, &snapshot) {
            tracing::warn!(
                respondent_id = session.respondent_id(),
                %error,
                "backup persistence failed"
            );
        }
    }

    /// Writes the canonical record and confirms the completion marker, retrying
    /// at a fixed interval until it is observed.
    fn persist_final(&self, presenter: &mut dyn Presenter) -> Result<(), SessionError> {
        let Some(session) = self.session.as_ref() else {
            return Ok(());
        };
        let respondent_id = session.respondent_id();
        let policy = self.final_persist;
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            let snapshot = session.snapshot((self.clock)());
            let last_error = match self
                .sink
                .save(PersistTier::Final, &snapshot)
                .and_then(|()| self.sink.is_completed(respondent_id))
            {
                Ok(true) => {
                    tracing::info!(respondent_id, attempts, "final transcript persisted");
                    return Ok(());
                }
                Ok(false) => "completion marker not visible after write".to_string(),
                Err(error) => error.to_string(),
            };

            tracing::warn!(respondent_id, attempts, error = %last_error, "final persistence attempt failed");

            if attempts == policy.alert_after {
                tracing::error!(
                    respondent_id,
                    attempts,
                    error = %last_error,
                    "final transcript still not durable"
                );
                presenter.warn(&format!(
                    "The final transcript could not be saved after {attempts} attempts ({last_error}). Still retrying."
                ));
            }

            if policy.max_attempts.is_some_and(|max| attempts >= max) {
                return Err(SessionError::FinalPersist {
                    attempts,
                    last_error,
                });
            }

            thread::sleep(policy.retry_interval);
        }
    }

    fn archive_transcript(&self, presenter: &mut dyn Presenter) -> ArchiveStatus {
        let (Some(uploader), Some(session)) = (self.archive.as_ref(), self.session.as_ref()) else {
            return ArchiveStatus::Disabled;
        };

        let artifact = ArchiveArtifact::transcript_csv(session.respondent_id(), session.messages());
        match uploader.upload(&artifact) {
            Ok(location) => ArchiveStatus::Uploaded { location },
            Err(error) => {
                tracing::warn!(
                    respondent_id = session.respondent_id(),
                    %error,
                    "archive upload failed"
                );
                presenter.warn(&format!("The transcript could not be archived remotely: {error}"));
                ArchiveStatus::Failed {
                    reason: error.to_string(),
                }
            }
        }
    }
}
