//! Transport-only client primitives for chat model backends.
//!
//! Two wire shapes are supported: the chat-completions shape, where the system
//! prompt travels as the first history entry, and the messages shape, where it
//! is a separate request field. This crate owns request building, SSE parsing,
//! and error-body decoding only. It contains no session or history logic.
//!
//! Requests are never retried here; a failed turn is reported to the caller as is.

pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod headers;
pub mod payload;
pub mod sse;
pub mod url;

pub use client::{ChatApiClient, ChatEventStream};
pub use config::{ApiFlavor, ChatApiConfig};
pub use error::ChatApiError;
pub use events::ChatStreamEvent;
pub use payload::{ChatCompletionsRequest, MessagesRequest, WireMessage};
pub use sse::SseStreamParser;
pub use url::normalize_endpoint;
