use model_gateway::{Message, Role};
use time::OffsetDateTime;
use transcript_store::SessionSnapshot;

use crate::codes::CodeKind;

/// Why a session reached its terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationReason {
    /// A completion marker already existed; no session was created.
    AlreadyCompleted,
    /// The model emitted a reserved code.
    Code(CodeKind),
    /// The respondent cancelled.
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    NotStarted,
    Active,
    /// A code matched and the final record is not durable yet.
    Closing(CodeKind),
    /// The respondent cancelled and the final record is not durable yet.
    Cancelling,
    Terminated(TerminationReason),
}

/// One respondent's interview, owned by the controller for its whole lifetime.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    respondent_id: String,
    messages: Vec<Message>,
    started_at: OffsetDateTime,
    active: bool,
}

impl Session {
    pub fn new(
        respondent_id: impl Into<String>,
        messages: Vec<Message>,
        started_at: OffsetDateTime,
    ) -> Self {
        Self {
            respondent_id: respondent_id.into(),
            messages,
            started_at,
            active: true,
        }
    }

    pub fn respondent_id(&self) -> &str {
        &self.respondent_id
    }

    /// Full history in conversation order, priming entry included.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn started_at(&self) -> OffsetDateTime {
        self.started_at
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub(crate) fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Removes the newest entry if it is a respondent message.
    pub(crate) fn rollback_user_turn(&mut self) -> Option<Message> {
        if self.messages.last().map(|message| message.role) == Some(Role::User) {
            self.messages.pop()
        } else {
            None
        }
    }

    pub(crate) fn deactivate(&mut self) {
        self.active = false;
    }

    pub(crate) fn snapshot(&self, now: OffsetDateTime) -> SessionSnapshot<'_> {
        SessionSnapshot {
            respondent_id: &self.respondent_id,
            messages: &self.messages,
            started_at: self.started_at,
            now,
        }
    }
}
