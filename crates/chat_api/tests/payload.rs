use chat_api::{ChatCompletionsRequest, MessagesRequest, WireMessage};

#[test]
fn chat_completions_payload_omits_unset_temperature() {
    let request = ChatCompletionsRequest::new(
        "gpt-4o",
        vec![
            WireMessage::new("system", "prompt"),
            WireMessage::new("user", "hello"),
        ],
        256,
    );

    let value = serde_json::to_value(&request).expect("serialize payload");
    assert_eq!(value["model"], "gpt-4o");
    assert_eq!(value["max_tokens"], 256);
    assert_eq!(value["stream"], true);
    assert_eq!(value["messages"][0]["role"], "system");
    assert!(value.get("temperature").is_none());
}

#[test]
fn chat_completions_payload_carries_explicit_temperature() {
    let request = ChatCompletionsRequest::new("gpt-4o", Vec::new(), 16).with_temperature(Some(0.5));

    let value = serde_json::to_value(&request).expect("serialize payload");
    assert_eq!(value["temperature"], 0.5);
}

#[test]
fn messages_payload_moves_system_out_of_history() {
    let request = MessagesRequest::new(
        "claude-3-5-sonnet",
        "prompt",
        vec![
            WireMessage::new("system", "should not be sent"),
            WireMessage::new("user", "Hi"),
        ],
        1024,
    );

    let value = serde_json::to_value(&request).expect("serialize payload");
    assert_eq!(value["system"], "prompt");
    assert_eq!(value["messages"].as_array().map(Vec::len), Some(1));
    assert_eq!(value["messages"][0]["content"], "Hi");
    assert!(value.get("temperature").is_none());
}

#[test]
fn messages_payload_omits_empty_system() {
    let request = MessagesRequest::new("claude-3-5-sonnet", "", Vec::new(), 8);

    let value = serde_json::to_value(&request).expect("serialize payload");
    assert!(value.get("system").is_none());
}
