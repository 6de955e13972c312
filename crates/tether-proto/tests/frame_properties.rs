//! Property-based tests for frame decoding
//!
//! The decoder sits directly behind the network. It must never panic, and an
//! unknown tag must never be treated as a decode failure.

use proptest::prelude::*;
use serde_json::{Value, json};
use tether_proto::{FrameError, InboundFrame};

const KNOWN_TAGS: [&str; 7] =
    ["connected", "response", "agent_progress", "send", "error", "pong", "agent_info"];

/// Strategy for tags that are not part of the protocol.
fn unknown_tag() -> impl Strategy<Value = String> {
    "[a-z_]{1,16}".prop_filter("tag must be unknown", |tag| !KNOWN_TAGS.contains(&tag.as_str()))
}

/// Strategy for arbitrary flat JSON objects.
fn arbitrary_fields() -> impl Strategy<Value = Vec<(String, i64)>> {
    prop::collection::vec(("[a-zA-Z]{1,8}", any::<i64>()), 0..6)
}

proptest! {
    #[test]
    fn prop_decode_never_panics(text in ".*") {
        let _ = InboundFrame::decode(&text);
    }

    #[test]
    fn prop_unknown_tags_decode_to_unrecognized(tag in unknown_tag(), fields in arbitrary_fields()) {
        let mut object = serde_json::Map::new();
        for (key, value) in fields {
            object.insert(key, json!(value));
        }
        object.insert("type".to_owned(), Value::String(tag.clone()));
        let text = Value::Object(object).to_string();

        match InboundFrame::decode(&text) {
            Ok(InboundFrame::Unrecognized { kind, .. }) => prop_assert_eq!(kind, tag),
            other => prop_assert!(false, "expected Unrecognized, got {:?}", other),
        }
    }

    #[test]
    fn prop_known_tag_with_wrong_shape_is_payload_error(index in 0usize..KNOWN_TAGS.len()) {
        let tag = KNOWN_TAGS[index];
        // `pong` has no required fields, so any shape is accepted.
        prop_assume!(tag != "pong");

        let text = json!({ "type": tag, "sessionId": 5, "message": [], "text": {} }).to_string();
        match InboundFrame::decode(&text) {
            Err(FrameError::Payload { kind, .. }) => prop_assert_eq!(kind, tag),
            Ok(InboundFrame::AgentInfo(_)) => {
                // Every agent_info field is optional.
                prop_assert_eq!(tag, "agent_info");
            },
            other => prop_assert!(false, "expected payload error, got {:?}", other),
        }
    }

    #[test]
    fn prop_non_objects_are_rejected(number in any::<i64>(), text in "[a-z]{0,8}") {
        prop_assert!(matches!(
            InboundFrame::decode(&number.to_string()),
            Err(FrameError::NotAnObject)
        ));
        prop_assert!(matches!(
            InboundFrame::decode(&Value::String(text).to_string()),
            Err(FrameError::NotAnObject)
        ));
    }
}

#[test]
fn decode_preserves_delivery_order() {
    let texts = [
        r#"{"type":"agent_progress","message":"a"}"#,
        r#"{"type":"agent_progress","message":"b"}"#,
        r#"{"type":"agent_progress","message":"c"}"#,
    ];

    let decoded: Vec<String> = texts
        .iter()
        .filter_map(|text| match InboundFrame::decode(text) {
            Ok(InboundFrame::AgentProgress(progress)) => Some(progress.message),
            _ => None,
        })
        .collect();

    assert_eq!(decoded, vec!["a", "b", "c"]);
}
