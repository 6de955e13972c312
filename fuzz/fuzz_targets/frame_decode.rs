//! Fuzz target for InboundFrame::decode
//!
//! Decoding runs on every text message a server sends, so it must reject
//! garbage without panicking.
//!
//! # Invariants
//!
//! - Arbitrary text never panics, only returns Err
//! - A decoded frame reports the same kind as its `type` field
//! - A malformed frame never poisons later decodes

#![no_main]

use libfuzzer_sys::fuzz_target;
use tether_proto::InboundFrame;

const PONG: &str = r#"{"type":"pong"}"#;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(frame) = InboundFrame::decode(text) {
        let value: serde_json::Value = serde_json::from_str(text).expect("decoded frames are JSON");
        assert_eq!(Some(frame.kind()), value["type"].as_str());
    }

    assert!(matches!(InboundFrame::decode(PONG), Ok(InboundFrame::Pong)));
});
