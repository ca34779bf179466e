//! Deterministic mock implementation of the shared `model_gateway` contract.
//!
//! This crate contains no transport logic. Turns are scripted up front and
//! replayed in order, which makes it suitable for local dry runs and for
//! controller-level tests that need to observe what was sent and how much of
//! a stream was read.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use model_gateway::{
    FragmentStream, GatewayError, GatewayProfile, GenerationParams, Message, ModelGateway,
    TurnRequest, PRIMING_USER_TEXT,
};

/// Stable gateway identifier used for explicit startup selection.
pub const MOCK_GATEWAY_ID: &str = "mock";

const FALLBACK_REPLY: &str = "Thank you. Could you tell me a bit more about that?";

/// How the mock seeds a fresh history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimingShape {
    /// `[system(prompt)]`, like chat-completions backends.
    SystemInHistory,
    /// `[user("Hi")]`, like messages backends.
    GreetingOnly,
}

/// One scripted model turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockTurn {
    /// Streams the fragments in order and finishes cleanly.
    Reply(Vec<String>),
    /// Fails before any fragment is produced.
    OpenFailure(String),
    /// Streams the fragments, then fails.
    FailAfter { fragments: Vec<String>, message: String },
}

impl MockTurn {
    /// Scripts a reply split into word-sized fragments.
    pub fn reply(text: &str) -> Self {
        Self::Reply(split_tokens(text))
    }

    /// Scripts a reply with exact fragment boundaries.
    pub fn fragments<I, S>(fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Reply(fragments.into_iter().map(Into::into).collect())
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self::OpenFailure(message.into())
    }

    pub fn fail_after<I, S>(fragments: I, message: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::FailAfter {
            fragments: fragments.into_iter().map(Into::into).collect(),
            message: message.into(),
        }
    }
}

/// Snapshot of one request the mock received.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub messages: Vec<Message>,
    pub system_prompt: String,
    pub params: GenerationParams,
}

/// Scripted gateway used by controller tests and local runs.
#[derive(Debug)]
pub struct MockGateway {
    model_id: String,
    priming: PrimingShape,
    fragment_delay: Duration,
    turns: Mutex<VecDeque<MockTurn>>,
    requests: Mutex<Vec<RecordedRequest>>,
    pulled: Arc<AtomicUsize>,
}

impl MockGateway {
    /// Creates a mock that replays `turns` in order, then falls back to a generic follow-up.
    #[must_use]
    pub fn new(turns: Vec<MockTurn>) -> Self {
        Self {
            model_id: MOCK_GATEWAY_ID.to_string(),
            priming: PrimingShape::SystemInHistory,
            fragment_delay: Duration::ZERO,
            turns: Mutex::new(turns.into()),
            requests: Mutex::new(Vec::new()),
            pulled: Arc::new(AtomicUsize::new(0)),
        }
    }

    #[must_use]
    pub fn with_priming(mut self, priming: PrimingShape) -> Self {
        self.priming = priming;
        self
    }

    #[must_use]
    pub fn with_model_id(mut self, model_id: impl Into<String>) -> Self {
        let model_id = model_id.into();
        let trimmed = model_id.trim();
        if !trimmed.is_empty() {
            self.model_id = trimmed.to_string();
        }
        self
    }

    /// Sleeps between fragments so local runs visibly stream.
    #[must_use]
    pub fn with_fragment_delay(mut self, delay: Duration) -> Self {
        self.fragment_delay = delay;
        self
    }

    /// Requests received so far, oldest first.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        lock_unpoisoned(&self.requests).clone()
    }

    /// Total fragments handed out across all streams.
    pub fn fragments_pulled(&self) -> usize {
        self.pulled.load(Ordering::SeqCst)
    }

    /// Scripted turns not yet consumed.
    pub fn remaining_turns(&self) -> usize {
        lock_unpoisoned(&self.turns).len()
    }

    const LOCAL_FRAGMENT_DELAY_MS: u64 = 40;
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new(vec![
            MockTurn::reply(
                "Hello, and thank you for taking part in this interview. \
                 To start, could you tell me a little about your background?",
            ),
            MockTurn::reply(
                "That is helpful. What would you say has shaped your views on this the most?",
            ),
            MockTurn::reply("Thank you. Is there anything else you would like to add?"),
        ])
        .with_fragment_delay(Duration::from_millis(Self::LOCAL_FRAGMENT_DELAY_MS))
    }
}

impl ModelGateway for MockGateway {
    fn profile(&self) -> GatewayProfile {
        GatewayProfile {
            gateway_id: MOCK_GATEWAY_ID.to_string(),
            model_id: self.model_id.clone(),
        }
    }

    fn prime_history(&self, system_prompt: &str) -> Vec<Message> {
        match self.priming {
            PrimingShape::SystemInHistory => vec![Message::system(system_prompt)],
            PrimingShape::GreetingOnly => vec![Message::user(PRIMING_USER_TEXT)],
        }
    }

    fn stream(&self, request: &TurnRequest<'_>) -> Result<FragmentStream, GatewayError> {
        lock_unpoisoned(&self.requests).push(RecordedRequest {
            messages: request.messages.to_vec(),
            system_prompt: request.system_prompt.to_string(),
            params: *request.params,
        });

        let turn = lock_unpoisoned(&self.turns)
            .pop_front()
            .unwrap_or_else(|| MockTurn::reply(FALLBACK_REPLY));

        let (fragments, failure) = match turn {
            MockTurn::Reply(fragments) => (fragments, None),
            MockTurn::OpenFailure(message) => return Err(GatewayError::new(message)),
            MockTurn::FailAfter { fragments, message } => (fragments, Some(message)),
        };

        Ok(Box::new(ScriptedFragments {
            fragments: fragments.into(),
            failure,
            delay: self.fragment_delay,
            pulled: Arc::clone(&self.pulled),
        }))
    }
}

struct ScriptedFragments {
    fragments: VecDeque<String>,
    failure: Option<String>,
    delay: Duration,
    pulled: Arc<AtomicUsize>,
}

impl Iterator for ScriptedFragments {
    type Item = Result<String, GatewayError>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(fragment) = self.fragments.pop_front() {
            if !self.delay.is_zero() {
                thread::sleep(self.delay);
            }
            self.pulled.fetch_add(1, Ordering::SeqCst);
            return Some(Ok(fragment));
        }

        self.failure.take().map(|message| Err(GatewayError::new(message)))
    }
}

/// Splits text after each space or newline, keeping the separator on the fragment.
fn split_tokens(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut pending = String::new();

    for ch in text.chars() {
        pending.push(ch);
        if matches!(ch, ' ' | '\n') {
            tokens.push(std::mem::take(&mut pending));
        }
    }

    if !pending.is_empty() {
        tokens.push(pending);
    }

    tokens
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
