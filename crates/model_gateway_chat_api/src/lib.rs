//! Chat API-backed implementations of the shared `model_gateway` contract.
//!
//! Each gateway shapes the history for its wire format and turns the async
//! event stream from `chat_api` into the blocking, pull-based
//! [`FragmentStream`] the session controller consumes.

use std::sync::Arc;
use std::time::Duration;

use chat_api::{
    ApiFlavor, ChatApiClient, ChatApiConfig, ChatApiError, ChatCompletionsRequest,
    ChatEventStream, ChatStreamEvent, MessagesRequest, WireMessage,
};
use model_gateway::{
    FragmentStream, GatewayError, GatewayProfile, Message, ModelGateway, TurnRequest,
    PRIMING_USER_TEXT,
};
use tokio::runtime::Runtime;

/// Gateway identifier for the system-in-history backend shape.
pub const CHAT_COMPLETIONS_GATEWAY_ID: &str = "chat-completions";
/// Gateway identifier for the system-out-of-band backend shape.
pub const MESSAGES_GATEWAY_ID: &str = "messages";

/// Picks the wire shape for a model identifier.
///
/// `gpt` models speak chat-completions, `claude` models speak messages.
pub fn flavor_for_model(model_id: &str) -> Option<ApiFlavor> {
    let lowered = model_id.to_ascii_lowercase();
    if lowered.contains("gpt") {
        Some(ApiFlavor::ChatCompletions)
    } else if lowered.contains("claude") {
        Some(ApiFlavor::Messages)
    } else {
        None
    }
}

/// Runtime configuration shared by both gateways.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatGatewayConfig {
    pub api_key: String,
    pub model_id: String,
    pub base_url: Option<String>,
    pub timeout: Option<Duration>,
}

impl ChatGatewayConfig {
    #[must_use]
    pub fn new(api_key: impl Into<String>, model_id: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model_id: model_id.into(),
            base_url: None,
            timeout: None,
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn into_chat_api_config(self, flavor: ApiFlavor) -> ChatApiConfig {
        let mut config = ChatApiConfig::new(flavor, self.api_key);

        if let Some(base_url) = self.base_url {
            config = config.with_base_url(base_url);
        }

        if let Some(timeout) = self.timeout {
            config = config.with_timeout(timeout);
        }

        config
    }
}

#[derive(Debug, Clone, PartialEq)]
enum WireRequest {
    ChatCompletions(ChatCompletionsRequest),
    Messages(MessagesRequest),
}

type EventIter = Box<dyn Iterator<Item = Result<ChatStreamEvent, ChatApiError>> + Send>;

trait StreamClient: Send + Sync {
    fn open(&self, request: WireRequest) -> Result<EventIter, ChatApiError>;
}

struct DefaultStreamClient {
    client: ChatApiClient,
    runtime: Arc<Runtime>,
}

impl DefaultStreamClient {
    fn new(config: ChatApiConfig) -> Result<Self, GatewayError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|error| {
                GatewayError::new(format!("failed to initialize tokio runtime: {error}"))
            })?;
        let client = ChatApiClient::new(config).map_err(|error| {
            GatewayError::new(format!("failed to initialize chat API client: {error}"))
        })?;

        Ok(Self {
            client,
            runtime: Arc::new(runtime),
        })
    }
}

impl StreamClient for DefaultStreamClient {
    fn open(&self, request: WireRequest) -> Result<EventIter, ChatApiError> {
        let stream = self.runtime.block_on(async {
            match &request {
                WireRequest::ChatCompletions(payload) => self.client.open_stream(payload).await,
                WireRequest::Messages(payload) => self.client.open_stream(payload).await,
            }
        })?;

        Ok(Box::new(BlockingEvents {
            runtime: Arc::clone(&self.runtime),
            stream,
        }))
    }
}

/// Drives an async event stream one event per `next` call.
struct BlockingEvents {
    runtime: Arc<Runtime>,
    stream: ChatEventStream,
}

impl Iterator for BlockingEvents {
    type Item = Result<ChatStreamEvent, ChatApiError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.runtime.block_on(self.stream.next_event())
    }
}

/// Maps normalized wire events to text fragments, stopping at the first terminal event.
struct Fragments {
    gateway_id: &'static str,
    events: EventIter,
    finished: bool,
}

impl Iterator for Fragments {
    type Item = Result<String, GatewayError>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.finished {
            match self.events.next()? {
                Ok(ChatStreamEvent::TextDelta { text }) if !text.is_empty() => {
                    return Some(Ok(text));
                }
                Ok(ChatStreamEvent::TextDelta { .. }) => {}
                // In-band error events already arrive as `Err` from the event stream.
                Ok(ChatStreamEvent::Done { .. } | ChatStreamEvent::Error { .. }) => {
                    self.finished = true;
                }
                Err(error) => {
                    self.finished = true;
                    tracing::error!(gateway = self.gateway_id, %error, "model stream failed");
                    return Some(Err(GatewayError::new(format!(
                        "{} stream failed: {error}",
                        self.gateway_id
                    ))));
                }
            }
        }
        None
    }
}

fn wire_messages(messages: &[Message]) -> Vec<WireMessage> {
    messages
        .iter()
        .map(|message| WireMessage::new(message.role.as_str(), message.content.clone()))
        .collect()
}

fn open_fragments(
    gateway_id: &'static str,
    stream_client: &dyn StreamClient,
    request: WireRequest,
) -> Result<FragmentStream, GatewayError> {
    let events = stream_client.open(request).map_err(|error| {
        tracing::error!(gateway = gateway_id, %error, "model request failed");
        GatewayError::new(format!("{gateway_id} request failed: {error}"))
    })?;

    Ok(Box::new(Fragments {
        gateway_id,
        events,
        finished: false,
    }))
}

/// Gateway for backends that take the system prompt as the first history entry.
pub struct ChatCompletionsGateway {
    model_id: String,
    stream_client: Arc<dyn StreamClient>,
}

impl ChatCompletionsGateway {
    /// Creates a gateway using real HTTP transport.
    pub fn new(config: ChatGatewayConfig) -> Result<Self, GatewayError> {
        let model_id = config.model_id.trim().to_string();
        let stream_client = Arc::new(DefaultStreamClient::new(
            config.into_chat_api_config(ApiFlavor::ChatCompletions),
        )?);

        Ok(Self {
            model_id,
            stream_client,
        })
    }

    #[cfg(test)]
    fn with_stream_client_for_tests(
        model_id: impl Into<String>,
        stream_client: Arc<dyn StreamClient>,
    ) -> Self {
        Self {
            model_id: model_id.into(),
            stream_client,
        }
    }
}

impl ModelGateway for ChatCompletionsGateway {
    fn profile(&self) -> GatewayProfile {
        GatewayProfile {
            gateway_id: CHAT_COMPLETIONS_GATEWAY_ID.to_string(),
            model_id: self.model_id.clone(),
        }
    }

    fn prime_history(&self, system_prompt: &str) -> Vec<Message> {
        vec![Message::system(system_prompt)]
    }

    fn stream(&self, request: &TurnRequest<'_>) -> Result<FragmentStream, GatewayError> {
        let payload = ChatCompletionsRequest::new(
            self.model_id.clone(),
            wire_messages(request.messages),
            request.params.max_tokens,
        )
        .with_temperature(request.params.temperature);

        open_fragments(
            CHAT_COMPLETIONS_GATEWAY_ID,
            self.stream_client.as_ref(),
            WireRequest::ChatCompletions(payload),
        )
    }
}

/// Gateway for backends that take the system prompt as a separate request field.
pub struct MessagesGateway {
    model_id: String,
    stream_client: Arc<dyn StreamClient>,
}

impl MessagesGateway {
    /// Creates a gateway using real HTTP transport.
    pub fn new(config: ChatGatewayConfig) -> Result<Self, GatewayError> {
        let model_id = config.model_id.trim().to_string();
        let stream_client = Arc::new(DefaultStreamClient::new(
            config.into_chat_api_config(ApiFlavor::Messages),
        )?);

        Ok(Self {
            model_id,
            stream_client,
        })
    }

    #[cfg(test)]
    fn with_stream_client_for_tests(
        model_id: impl Into<String>,
        stream_client: Arc<dyn StreamClient>,
    ) -> Self {
        Self {
            model_id: model_id.into(),
            stream_client,
        }
    }
}

impl ModelGateway for MessagesGateway {
    fn profile(&self) -> GatewayProfile {
        GatewayProfile {
            gateway_id: MESSAGES_GATEWAY_ID.to_string(),
            model_id: self.model_id.clone(),
        }
    }

    fn prime_history(&self, _system_prompt: &str) -> Vec<Message> {
        vec![Message::user(PRIMING_USER_TEXT)]
    }

    fn stream(&self, request: &TurnRequest<'_>) -> Result<FragmentStream, GatewayError> {
        let payload = MessagesRequest::new(
            self.model_id.clone(),
            request.system_prompt,
            wire_messages(request.messages),
            request.params.max_tokens,
        )
        .with_temperature(request.params.temperature);

        open_fragments(
            MESSAGES_GATEWAY_ID,
            self.stream_client.as_ref(),
            WireRequest::Messages(payload),
        )
    }
}
