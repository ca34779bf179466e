use std::fs;
use std::path::Path;

use model_gateway::{Message, Role};
use time::macros::format_description;
use time::OffsetDateTime;

use crate::error::TranscriptStoreError;

/// One `role: content` line per message.
#[must_use]
pub fn render_transcript(messages: &[Message]) -> String {
    let mut out = String::new();
    for message in messages {
        out.push_str(message.role.as_str());
        out.push_str(": ");
        out.push_str(&message.content);
        out.push('\n');
    }
    out
}

/// Start time as `DD/MM/YYYY HH:MM:SS` in the offset it was captured in, then the
/// elapsed minutes to two decimals.
pub fn render_timing(
    started_at: OffsetDateTime,
    now: OffsetDateTime,
) -> Result<String, TranscriptStoreError> {
    let start = started_at
        .format(format_description!(
            "[day]/[month]/[year] [hour]:[minute]:[second]"
        ))
        .map_err(TranscriptStoreError::ClockFormat)?;
    let minutes = (now - started_at).as_seconds_f64().max(0.0) / 60.0;

    Ok(format!(
        "Start time: {start}\nInterview duration (minutes): {minutes:.2}"
    ))
}

/// Parses rendered transcript text back into messages.
///
/// A line that does not begin with a role prefix continues the previous
/// message, so content containing newlines survives the round trip.
///
/// The format is not escaped: a continuation line that itself starts with
/// `system: `, `user: ` or `assistant: ` is read back as a new message.
pub fn parse_transcript(text: &str, path: &Path) -> Result<Vec<Message>, TranscriptStoreError> {
    if text.is_empty() {
        return Ok(Vec::new());
    }
    let body = text.strip_suffix('\n').unwrap_or(text);

    let mut messages: Vec<Message> = Vec::new();
    for (index, line) in body.split('\n').enumerate() {
        if let Some((role, content)) = split_role_prefix(line) {
            messages.push(Message::new(role, content));
            continue;
        }

        match messages.last_mut() {
            Some(previous) => {
                previous.content.push('\n');
                previous.content.push_str(line);
            }
            None => {
                return Err(TranscriptStoreError::MissingRolePrefix {
                    path: path.to_path_buf(),
                    line: index + 1,
                });
            }
        }
    }

    Ok(messages)
}

pub fn read_transcript(path: &Path) -> Result<Vec<Message>, TranscriptStoreError> {
    let text = fs::read_to_string(path)
        .map_err(|source| TranscriptStoreError::io("reading transcript", path, source))?;
    parse_transcript(&text, path)
}

fn split_role_prefix(line: &str) -> Option<(Role, &str)> {
    let (role, content) = line.split_once(": ")?;
    Role::parse(role).map(|role| (role, content))
}
