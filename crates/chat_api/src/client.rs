use std::collections::VecDeque;

use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Response};
use serde::Serialize;

use crate::config::ChatApiConfig;
use crate::error::{parse_error_message, ChatApiError};
use crate::events::ChatStreamEvent;
use crate::headers::build_headers;
use crate::sse::SseStreamParser;
use crate::url::normalize_endpoint;

#[derive(Debug)]
pub struct ChatApiClient {
    http: Client,
    config: ChatApiConfig,
}

impl ChatApiClient {
    pub fn new(config: ChatApiConfig) -> Result<Self, ChatApiError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(ChatApiError::from)?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ChatApiConfig {
        &self.config
    }

    pub fn normalized_endpoint(&self) -> String {
        normalize_endpoint(self.config.flavor, &self.config.base_url)
    }

    pub fn build_headers(&self, user_agent: Option<&str>) -> Result<HeaderMap, ChatApiError> {
        let headers = build_headers(&self.config, user_agent)?;
        let mut out = HeaderMap::new();
        for (key, value) in headers {
            out.insert(
                HeaderName::from_bytes(key.as_bytes())
                    .map_err(|_| ChatApiError::InvalidHeader(format!("invalid key: {key}")))?,
                HeaderValue::from_str(&value)
                    .map_err(|_| ChatApiError::InvalidHeader(format!("invalid value for {key}")))?,
            );
        }
        Ok(out)
    }

    pub fn build_request<T>(&self, payload: &T) -> Result<reqwest::RequestBuilder, ChatApiError>
    where
        T: Serialize + ?Sized,
    {
        let headers = self.build_headers(self.config.user_agent.as_deref())?;
        Ok(self
            .http
            .post(self.normalized_endpoint())
            .headers(headers)
            .json(payload))
    }

    /// Sends one request and maps non-success statuses to [`ChatApiError::Status`].
    pub async fn send<T>(&self, payload: &T) -> Result<Response, ChatApiError>
    where
        T: Serialize + ?Sized,
    {
        let response = self.build_request(payload)?.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(ChatApiError::Status(status, parse_error_message(status, &body)))
    }

    /// Opens a pull-based event stream for one request.
    pub async fn open_stream<T>(&self, payload: &T) -> Result<ChatEventStream, ChatApiError>
    where
        T: Serialize + ?Sized,
    {
        let response = self.send(payload).await?;
        let bytes = response
            .bytes_stream()
            .map(|chunk| chunk.map(|bytes| bytes.to_vec()))
            .boxed();

        Ok(ChatEventStream {
            bytes,
            parser: SseStreamParser::new(self.config.flavor),
            pending: VecDeque::new(),
            finished: false,
        })
    }

    /// Reads a whole response into a list of events.
    pub async fn collect<T>(&self, payload: &T) -> Result<Vec<ChatStreamEvent>, ChatApiError>
    where
        T: Serialize + ?Sized,
    {
        let mut stream = self.open_stream(payload).await?;
        let mut events = Vec::new();
        while let Some(event) = stream.next_event().await {
            events.push(event?);
        }
        Ok(events)
    }
}

/// Normalized events of one streaming response, read on demand.
///
/// Dropping the stream closes the underlying connection without reading the rest.
pub struct ChatEventStream {
    bytes: BoxStream<'static, Result<Vec<u8>, reqwest::Error>>,
    parser: SseStreamParser,
    pending: VecDeque<ChatStreamEvent>,
    finished: bool,
}

impl ChatEventStream {
    /// Returns the next event, `None` once the response or a terminal event ends it.
    ///
    /// In-band error events surface as [`ChatApiError::StreamFailed`].
    pub async fn next_event(&mut self) -> Option<Result<ChatStreamEvent, ChatApiError>> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                if event.is_terminal() {
                    self.finished = true;
                    self.pending.clear();
                }
                return Some(match stream_failure_from_event(&event) {
                    Some(error) => Err(error),
                    None => Ok(event),
                });
            }

            if self.finished {
                return None;
            }

            match self.bytes.next().await {
                Some(Ok(chunk)) => self.pending.extend(self.parser.feed(&chunk)),
                Some(Err(error)) => {
                    self.finished = true;
                    return Some(Err(ChatApiError::from(error)));
                }
                None => {
                    self.finished = true;
                    return None;
                }
            }
        }
    }
}

fn stream_failure_from_event(event: &ChatStreamEvent) -> Option<ChatApiError> {
    match event {
        ChatStreamEvent::Error { code, message } => Some(ChatApiError::StreamFailed {
            code: code.clone(),
            message: message
                .clone()
                .or_else(|| code.clone())
                .unwrap_or_else(|| "backend reported an error".to_owned()),
        }),
        _ => None,
    }
}
