use std::collections::BTreeMap;
use std::time::Duration;

use crate::url::{DEFAULT_CHAT_COMPLETIONS_BASE_URL, DEFAULT_MESSAGES_BASE_URL};

/// Wire shape spoken by a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiFlavor {
    /// System prompt is the first history entry; deltas arrive under `choices[].delta`.
    ChatCompletions,
    /// System prompt is a top-level field; deltas arrive as `content_block_delta` events.
    Messages,
}

impl ApiFlavor {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ChatCompletions => "chat-completions",
            Self::Messages => "messages",
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            Self::ChatCompletions => DEFAULT_CHAT_COMPLETIONS_BASE_URL,
            Self::Messages => DEFAULT_MESSAGES_BASE_URL,
        }
    }
}

/// Transport configuration for chat backend requests.
#[derive(Debug, Clone)]
pub struct ChatApiConfig {
    pub flavor: ApiFlavor,
    /// Secret passed as bearer token or `x-api-key`, depending on flavor.
    pub api_key: String,
    /// Base URL; the flavor's endpoint path is appended during normalization.
    pub base_url: String,
    /// Optional `User-Agent` override.
    pub user_agent: Option<String>,
    /// Additional headers merged into request headers.
    pub extra_headers: BTreeMap<String, String>,
    /// Optional whole-request timeout, including the streamed body.
    pub timeout: Option<Duration>,
}

impl ChatApiConfig {
    pub fn new(flavor: ApiFlavor, api_key: impl Into<String>) -> Self {
        Self {
            flavor,
            api_key: api_key.into(),
            base_url: flavor.default_base_url().to_string(),
            user_agent: None,
            extra_headers: BTreeMap::new(),
            timeout: None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn insert_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_headers.insert(key.into(), value.into());
        self
    }
}
