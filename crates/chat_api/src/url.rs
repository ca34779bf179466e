use crate::config::ApiFlavor;

/// Default base URL for chat-completions requests.
pub const DEFAULT_CHAT_COMPLETIONS_BASE_URL: &str = "https://api.openai.com/v1";
/// Default base URL for messages requests.
pub const DEFAULT_MESSAGES_BASE_URL: &str = "https://api.anthropic.com/v1";

/// Normalize a base URL to the flavor's streaming endpoint.
///
/// Normalization rules:
/// 1) an empty base falls back to the flavor default
/// 2) trailing slashes are trimmed
/// 3) the endpoint path is appended unless already present
pub fn normalize_endpoint(flavor: ApiFlavor, input: &str) -> String {
    let base = if input.trim().is_empty() {
        flavor.default_base_url()
    } else {
        input.trim()
    };

    let suffix = match flavor {
        ApiFlavor::ChatCompletions => "/chat/completions",
        ApiFlavor::Messages => "/messages",
    };

    let trimmed = base.trim_end_matches('/');
    if trimmed.ends_with(suffix) {
        return trimmed.to_string();
    }
    format!("{trimmed}{suffix}")
}
