//! Minimal backend-agnostic contract for one interviewer turn.
//!
//! This crate defines the message history shape, generation options, and the
//! lazy fragment stream every model backend is normalized to. It excludes
//! transport details, wire payloads, and session state.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Synthetic opening user turn for backends that take the system prompt out of band.
pub const PRIMING_USER_TEXT: &str = "Hi";

/// Author of one history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Some(match value {
            "system" => Self::System,
            "user" => Self::User,
            "assistant" => Self::Assistant,
            _ => return None,
        })
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of the ordered conversation history replayed to the model every turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    #[must_use]
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Generation options recognized by every backend.
///
/// `temperature: None` means the option is left out of the wire request so the
/// backend default applies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub max_tokens: u32,
    pub temperature: Option<f32>,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_tokens: 2048,
            temperature: None,
        }
    }
}

/// Input required to produce one interviewer turn.
#[derive(Debug, Clone, Copy)]
pub struct TurnRequest<'a> {
    pub messages: &'a [Message],
    pub system_prompt: &'a str,
    pub params: &'a GenerationParams,
}

/// Immutable metadata describing a gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayProfile {
    pub gateway_id: String,
    pub model_id: String,
}

/// Failure reported by a gateway, either before streaming starts or mid-stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayError {
    message: String,
}

impl GatewayError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for GatewayError {}

impl From<String> for GatewayError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for GatewayError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

/// Lazy, finite, consumer-driven sequence of text fragments for one turn.
///
/// Dropping the stream before it is exhausted abandons the remaining backend
/// output; it never reports an error for doing so.
pub type FragmentStream = Box<dyn Iterator<Item = Result<String, GatewayError>> + Send>;

/// Backend interface every model service is normalized to.
pub trait ModelGateway: Send + Sync + 'static {
    /// Returns gateway/model identity metadata.
    fn profile(&self) -> GatewayProfile;

    /// Returns the history a fresh session starts from.
    ///
    /// Backends that accept a system role in the history open with it; backends
    /// that take the prompt out of band open with a synthetic user greeting.
    fn prime_history(&self, system_prompt: &str) -> Vec<Message>;

    /// Starts one turn and returns its fragment stream.
    fn stream(&self, request: &TurnRequest<'_>) -> Result<FragmentStream, GatewayError>;

    /// Runs one turn to completion and returns the aggregated text.
    fn complete(&self, request: &TurnRequest<'_>) -> Result<String, GatewayError> {
        let mut text = String::new();
        for fragment in self.stream(request)? {
            text.push_str(&fragment?);
        }
        Ok(text)
    }
}
