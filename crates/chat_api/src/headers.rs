use std::collections::BTreeMap;

use crate::config::{ApiFlavor, ChatApiConfig};
use crate::error::ChatApiError;

pub const HEADER_ACCEPT: &str = "accept";
pub const HEADER_CONTENT_TYPE: &str = "content-type";
pub const HEADER_AUTHORIZATION: &str = "authorization";
pub const HEADER_API_KEY: &str = "x-api-key";
pub const HEADER_API_VERSION: &str = "anthropic-version";
pub const HEADER_USER_AGENT: &str = "user-agent";

/// Pinned version for the messages wire shape.
pub const MESSAGES_API_VERSION: &str = "2023-06-01";

/// Build a deterministic header map for one streaming request.
pub fn build_headers(
    config: &ChatApiConfig,
    user_agent: Option<&str>,
) -> Result<BTreeMap<String, String>, ChatApiError> {
    let api_key = config.api_key.trim();
    if api_key.is_empty() {
        return Err(ChatApiError::MissingApiKey);
    }

    let mut headers = BTreeMap::new();
    match config.flavor {
        ApiFlavor::ChatCompletions => {
            headers.insert(
                HEADER_AUTHORIZATION.to_owned(),
                format!("Bearer {api_key}"),
            );
        }
        ApiFlavor::Messages => {
            headers.insert(HEADER_API_KEY.to_owned(), api_key.to_owned());
            headers.insert(
                HEADER_API_VERSION.to_owned(),
                MESSAGES_API_VERSION.to_owned(),
            );
        }
    }
    headers.insert(HEADER_ACCEPT.to_owned(), "text/event-stream".to_owned());
    headers.insert(
        HEADER_CONTENT_TYPE.to_owned(),
        "application/json".to_owned(),
    );

    let ua = match (user_agent, config.user_agent.as_deref()) {
        (Some(explicit), _) if !explicit.trim().is_empty() => explicit.trim().to_owned(),
        (None, Some(explicit)) if !explicit.trim().is_empty() => explicit.trim().to_owned(),
        _ => default_user_agent(),
    };
    headers.insert(HEADER_USER_AGENT.to_owned(), ua);

    for (key, value) in &config.extra_headers {
        headers.insert(key.trim().to_ascii_lowercase(), value.trim().to_owned());
    }

    Ok(headers)
}

fn default_user_agent() -> String {
    format!(
        "interviewer/{} ({}; {})",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS,
        std::env::consts::ARCH
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_user_agent_names_the_client() {
        assert!(default_user_agent().starts_with("interviewer/"));
    }

    #[test]
    fn blank_api_key_is_rejected_before_any_header_is_built() {
        let config = ChatApiConfig::new(ApiFlavor::Messages, "   ");
        assert!(matches!(
            build_headers(&config, None),
            Err(ChatApiError::MissingApiKey)
        ));
    }
}
