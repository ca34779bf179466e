use chat_api::{ApiFlavor, ChatStreamEvent, SseStreamParser};

#[test]
fn chat_completions_framing_parses_deltas_and_finish_reason() {
    let payload = concat!(
        "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"hel\"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"lo\"},\"finish_reason\":\"stop\"}]}\n\n",
        "data: [DONE]\n\n"
    );

    let events = SseStreamParser::parse_frames(ApiFlavor::ChatCompletions, payload);
    assert_eq!(
        events,
        vec![
            ChatStreamEvent::TextDelta {
                text: "hel".to_string(),
            },
            ChatStreamEvent::TextDelta {
                text: "lo".to_string(),
            },
            ChatStreamEvent::Done {
                stop_reason: Some("stop".to_string()),
            },
        ]
    );
}

#[test]
fn chat_completions_error_body_maps_to_error_event() {
    let payload = "data: {\"error\":{\"message\":\"quota\",\"type\":\"insufficient_quota\"}}\n\n";

    let events = SseStreamParser::parse_frames(ApiFlavor::ChatCompletions, payload);
    assert_eq!(
        events,
        vec![ChatStreamEvent::Error {
            code: Some("insufficient_quota".to_string()),
            message: Some("quota".to_string()),
        }]
    );
}

#[test]
fn messages_framing_keeps_text_deltas_and_stop() {
    let payload = concat!(
        "event: message_start\n",
        "data: {\"type\":\"message_start\",\"message\":{\"id\":\"msg_1\"}}\n\n",
        "event: content_block_start\n",
        "data: {\"type\":\"content_block_start\",\"index\":0,\"content_block\":{\"type\":\"text\",\"text\":\"\"}}\n\n",
        "event: ping\n",
        "data: {\"type\":\"ping\"}\n\n",
        "event: content_block_delta\n",
        "data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"Hi there\"}}\n\n",
        "event: content_block_delta\n",
        "data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"input_json_delta\",\"partial_json\":\"{}\"}}\n\n",
        "event: message_stop\n",
        "data: {\"type\":\"message_stop\"}\n\n"
    );

    let events = SseStreamParser::parse_frames(ApiFlavor::Messages, payload);
    assert_eq!(
        events,
        vec![
            ChatStreamEvent::TextDelta {
                text: "Hi there".to_string(),
            },
            ChatStreamEvent::Done { stop_reason: None },
        ]
    );
}

#[test]
fn messages_error_event_carries_type_and_message() {
    let payload = "event: error\ndata: {\"type\":\"error\",\"error\":{\"type\":\"overloaded_error\",\"message\":\"Overloaded\"}}\n\n";

    let events = SseStreamParser::parse_frames(ApiFlavor::Messages, payload);
    assert_eq!(
        events,
        vec![ChatStreamEvent::Error {
            code: Some("overloaded_error".to_string()),
            message: Some("Overloaded".to_string()),
        }]
    );
}

#[test]
fn sse_parser_ignores_malformed_json() {
    let payload = concat!(
        "data: {broken-json\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"x\"}}]}\n\n"
    );

    let events = SseStreamParser::parse_frames(ApiFlavor::ChatCompletions, payload);
    assert_eq!(events.len(), 1);
}

#[test]
fn sse_parser_handles_split_frames_incrementally() {
    let mut parser = SseStreamParser::new(ApiFlavor::ChatCompletions);
    assert!(parser
        .feed(b"data: {\"choices\":[{\"delta\":{\"content\":\"abc\"}}]")
        .is_empty());
    let mut events = parser.feed(b"}\n\n");
    assert_eq!(events.len(), 1);
    assert!(matches!(
        events.pop(),
        Some(ChatStreamEvent::TextDelta { text }) if text == "abc"
    ));
}

#[test]
fn sse_parser_skips_empty_data_frames() {
    let payload = concat!(
        "data: \n\n",
        ": keep-alive comment\n\n",
        "data: {\"type\":\"message_stop\"}\n\n"
    );
    let events = SseStreamParser::parse_frames(ApiFlavor::Messages, payload);
    assert_eq!(events, vec![ChatStreamEvent::Done { stop_reason: None }]);
}

#[test]
fn sse_parser_keeps_incomplete_trailing_bytes() {
    let mut parser = SseStreamParser::new(ApiFlavor::Messages);
    assert!(parser
        .feed(b"data: {\"type\":\"content_block_delta\"")
        .is_empty());
    assert!(!parser.is_empty_buffer());
}
