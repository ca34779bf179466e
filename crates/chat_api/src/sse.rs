use serde_json::Value;

use crate::config::ApiFlavor;
use crate::events::ChatStreamEvent;

/// Incremental parser for SSE byte streams.
///
/// Bytes are buffered until a complete frame arrives, so multi-byte characters
/// split across network chunks decode intact.
#[derive(Debug)]
pub struct SseStreamParser {
    flavor: ApiFlavor,
    buffer: Vec<u8>,
}

impl SseStreamParser {
    pub fn new(flavor: ApiFlavor) -> Self {
        Self {
            flavor,
            buffer: Vec::new(),
        }
    }

    /// Feed arbitrary bytes into the parser and drain complete events.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<ChatStreamEvent> {
        self.buffer.extend_from_slice(bytes);
        let mut events = Vec::new();

        while let Some((end, delimiter_len)) = find_frame_end(&self.buffer) {
            let frame = String::from_utf8_lossy(&self.buffer[..end]).into_owned();
            self.buffer.drain(..end + delimiter_len);

            let Some(payload) = extract_data_payload(&frame) else {
                continue;
            };
            if payload == "[DONE]" {
                continue;
            }

            if let Ok(value) = serde_json::from_str::<Value>(&payload) {
                match self.flavor {
                    ApiFlavor::ChatCompletions => map_chat_completions_event(&value, &mut events),
                    ApiFlavor::Messages => map_messages_event(&value, &mut events),
                }
            }
        }

        events
    }

    /// Parse a complete SSE payload string in one shot.
    pub fn parse_frames(flavor: ApiFlavor, input: &str) -> Vec<ChatStreamEvent> {
        let mut parser = Self::new(flavor);
        parser.feed(input.as_bytes())
    }

    pub fn is_empty_buffer(&self) -> bool {
        self.buffer.iter().all(u8::is_ascii_whitespace)
    }
}

fn find_frame_end(buffer: &[u8]) -> Option<(usize, usize)> {
    let lf = find(buffer, b"\n\n").map(|index| (index, 2));
    let crlf = find(buffer, b"\r\n\r\n").map(|index| (index, 4));
    match (lf, crlf) {
        (Some(lf), Some(crlf)) => Some(if crlf.0 < lf.0 { crlf } else { lf }),
        (found, None) | (None, found) => found,
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn extract_data_payload(frame: &str) -> Option<String> {
    let data_lines: Vec<&str> = frame
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .collect();

    if data_lines.is_empty() {
        None
    } else {
        Some(data_lines.join("\n"))
    }
}

fn map_chat_completions_event(value: &Value, events: &mut Vec<ChatStreamEvent>) {
    if let Some(error) = value.get("error") {
        events.push(error_event(error));
        return;
    }

    let Some(choice) = value
        .get("choices")
        .and_then(|choices| choices.as_array())
        .and_then(|choices| choices.first())
    else {
        return;
    };

    if let Some(text) = choice
        .get("delta")
        .and_then(|delta| delta.get("content"))
        .and_then(|content| content.as_str())
        .filter(|text| !text.is_empty())
    {
        events.push(ChatStreamEvent::TextDelta {
            text: text.to_owned(),
        });
    }

    if let Some(reason) = choice.get("finish_reason").and_then(|value| value.as_str()) {
        events.push(ChatStreamEvent::Done {
            stop_reason: Some(reason.to_owned()),
        });
    }
}

fn map_messages_event(value: &Value, events: &mut Vec<ChatStreamEvent>) {
    let Some(event_type) = value.get("type").and_then(|value| value.as_str()) else {
        return;
    };

    match event_type {
        "content_block_delta" => {
            let delta = value.get("delta");
            let is_text = delta
                .and_then(|delta| delta.get("type"))
                .and_then(|value| value.as_str())
                == Some("text_delta");
            if !is_text {
                return;
            }
            if let Some(text) = delta
                .and_then(|delta| delta.get("text"))
                .and_then(|value| value.as_str())
                .filter(|text| !text.is_empty())
            {
                events.push(ChatStreamEvent::TextDelta {
                    text: text.to_owned(),
                });
            }
        }
        "message_stop" => events.push(ChatStreamEvent::Done { stop_reason: None }),
        "error" => {
            let error = value.get("error").unwrap_or(value);
            events.push(error_event(error));
        }
        _ => {}
    }
}

fn error_event(error: &Value) -> ChatStreamEvent {
    let code = error
        .get("code")
        .or_else(|| error.get("type"))
        .and_then(|value| value.as_str())
        .map(ToString::to_string);
    let message = error
        .get("message")
        .and_then(|value| value.as_str())
        .map(ToString::to_string);
    ChatStreamEvent::Error { code, message }
}
