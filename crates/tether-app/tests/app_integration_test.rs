//! Integration tests for App frame dispatch and session handling.
//!
//! # Oracle Pattern
//!
//! Tests end with oracle checks that verify:
//! - Session state reflects the frames seen
//! - Operator output matches the dispatch table
//! - Frames sent back to the server are the expected ones

use std::time::Duration;

use tether_app::{App, AppAction, AppConfig, AppEvent, ConnectionState, LineKind, OutputLine};
use tether_core::env::test_utils::MockEnv;
use tether_proto::OutboundFrame;

const ACK: &str = r#"{"type":"connected","sessionId":"s1","domains":[{"id":"cli"}]}"#;

fn app() -> App<MockEnv> {
    App::new(MockEnv::new(1_700_000_000_000), AppConfig::default())
}

/// Create an App that has completed its first handshake.
fn connected_app() -> App<MockEnv> {
    let mut app = app();
    app.handle(AppEvent::Connecting { attempt: 1 });
    app.handle(AppEvent::Connected { attempt: 1 });
    app.handle(AppEvent::Frame(ACK.to_string()));
    app
}

fn printed(actions: &[AppAction]) -> Vec<&OutputLine> {
    actions
        .iter()
        .filter_map(|a| match a {
            AppAction::Print(line) => Some(line),
            _ => None,
        })
        .collect()
}

fn frame(app: &mut App<MockEnv>, text: &str) -> Vec<AppAction> {
    app.handle(AppEvent::Frame(text.to_string()))
}

#[test]
fn connected_frame_records_session_and_summarizes() {
    let mut app = app();
    app.handle(AppEvent::Connected { attempt: 1 });

    let actions = frame(
        &mut app,
        r#"{"type":"connected","sessionId":"s1","domains":[{"id":"cli","name":"Command line"}],
            "agent":{"title":"Helper","tools":[{"name":"search"}]}}"#,
    );

    assert_eq!(actions[0], AppAction::RecordSession("s1".into()));
    let lines: Vec<&str> = printed(&actions).iter().map(|l| l.text.as_str()).collect();
    assert_eq!(lines, vec![
        "connected (session s1)",
        "domains: Command line",
        "agent: Helper (1 tools)"
    ]);

    // Oracle
    assert_eq!(app.session().session_id.as_deref(), Some("s1"));
    assert_eq!(app.session().connects, 1);
}

#[test]
fn reconnect_gets_single_notice_and_keeps_thread() {
    let mut app = connected_app();
    let thread = app.session().thread_id.clone();

    app.handle(AppEvent::Disconnected {
        reason: "reset".into(),
        retry_in: Duration::from_secs(1),
        retry: 1,
    });
    app.handle(AppEvent::Connecting { attempt: 2 });
    app.handle(AppEvent::Connected { attempt: 2 });
    let actions =
        frame(&mut app, r#"{"type":"connected","sessionId":"s2","domains":[{"id":"cli"}]}"#);

    let lines = printed(&actions);
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].text, "reconnected (session s2)");

    // Oracle
    assert_eq!(app.session().thread_id, thread);
    assert_eq!(app.session().session_id.as_deref(), Some("s2"));
    assert_eq!(app.connection_state(), &ConnectionState::Connected { attempt: 2 });
}

#[test]
fn monitor_mode_is_restored_after_reconnect() {
    let mut app = connected_app();
    app.handle(AppEvent::Line("/monitor".into()));

    let actions =
        frame(&mut app, r#"{"type":"connected","sessionId":"s2","domains":[{"id":"cli"}]}"#);

    let resent = actions.iter().any(|a| {
        matches!(a, AppAction::Send(OutboundFrame::Command(c))
            if c.command == "monitor" && c.args == Some(serde_json::json!({ "enabled": true })))
    });
    assert!(resent);
}

#[test]
fn response_clears_pending_with_attribution() {
    let mut app = connected_app();
    app.handle(AppEvent::Line("hello".into()));
    assert!(app.session().pending);

    let actions = frame(&mut app, r#"{"type":"response","text":"hi there","from":"helper"}"#);

    assert_eq!(printed(&actions), vec![&OutputLine::reply("helper: hi there")]);
    assert!(!app.session().pending);
}

#[test]
fn greeting_echo_is_suppressed() {
    let mut app = connected_app();
    app.handle(AppEvent::Line("hello".into()));

    let actions = frame(&mut app, r#"{"type":"response","text":"Connected to agent server"}"#);

    assert!(actions.is_empty());
    assert!(app.session().pending, "greeting is not a reply");
}

#[test]
fn progress_is_transient() {
    let mut app = connected_app();

    let actions =
        frame(&mut app, r#"{"type":"agent_progress","status":"searching","tool":"web"}"#);
    assert_eq!(actions, vec![AppAction::Progress("web: searching".into())]);
}

#[test]
fn send_frame_clears_pending() {
    let mut app = connected_app();
    app.handle(AppEvent::Line("hello".into()));

    let actions = frame(&mut app, r#"{"type":"send","text":"done"}"#);
    assert_eq!(printed(&actions), vec![&OutputLine::reply("done")]);
    assert!(!app.session().pending);
}

#[test]
fn error_frame_clears_pending_and_keeps_connection() {
    let mut app = connected_app();
    app.handle(AppEvent::Line("hello".into()));

    let actions = frame(&mut app, r#"{"type":"error","message":"boom"}"#);

    let lines = printed(&actions);
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].kind, LineKind::Error);
    assert!(lines[0].text.contains("boom"));

    // Oracle
    assert!(!app.session().pending);
    assert_eq!(app.connection_state(), &ConnectionState::Connected { attempt: 1 });
}

#[test]
fn error_code_may_be_text_or_number() {
    let mut app = connected_app();

    let numeric = frame(&mut app, r#"{"type":"error","message":"slow down","code":429}"#);
    assert_eq!(printed(&numeric)[0].text, "error [429]: slow down");

    let symbolic = frame(&mut app, r#"{"type":"error","message":"nope","code":"E_AUTH"}"#);
    assert_eq!(printed(&symbolic)[0].text, "error [E_AUTH]: nope");
}

#[test]
fn agent_info_lists_first_tools() {
    let mut app = connected_app();

    let actions = frame(
        &mut app,
        r#"{"type":"agent_info","name":"helper","tools":[
            {"name":"a"},{"name":"b"},{"name":"c"},{"name":"d"},{"name":"e"},{"name":"f"},{"name":"g"}
        ]}"#,
    );

    let lines: Vec<&str> = printed(&actions).iter().map(|l| l.text.as_str()).collect();
    assert_eq!(lines, vec!["agent: helper (7 tools)", "tools: a, b, c, d, e +2 more"]);
}

#[test]
fn pong_is_silent() {
    let mut app = connected_app();
    assert!(frame(&mut app, r#"{"type":"pong"}"#).is_empty());
}

#[test]
fn unknown_tags_only_show_in_monitor_mode() {
    let mut app = connected_app();
    assert!(frame(&mut app, r#"{"type":"telemetry","load":3}"#).is_empty());

    app.handle(AppEvent::Line("/m".into()));
    let actions = frame(&mut app, r#"{"type":"telemetry","load":3}"#);
    assert_eq!(printed(&actions), vec![&OutputLine::diagnostic(
        r#"[monitor] telemetry: {"type":"telemetry","load":3}"#
    )]);
}

#[test]
fn monitor_mode_traces_before_handler_output() {
    let mut app = connected_app();
    app.handle(AppEvent::Line("/m".into()));

    let actions = frame(&mut app, r#"{"type":"send","text":"done"}"#);
    let kinds: Vec<LineKind> = printed(&actions).iter().map(|l| l.kind).collect();
    assert_eq!(kinds, vec![LineKind::Diagnostic, LineKind::Reply]);
}

#[test]
fn malformed_frames_yield_one_diagnostic_and_do_not_stick() {
    let mut app = connected_app();

    for bad in ["{not json", "[1,2]", r#"{"text":"no tag"}"#, r#"{"type":"error"}"#] {
        let actions = frame(&mut app, bad);
        let lines = printed(&actions);
        assert_eq!(lines.len(), 1, "{bad}");
        assert_eq!(lines[0].kind, LineKind::Diagnostic);
    }

    // Subsequent frames are unaffected
    let actions = frame(&mut app, r#"{"type":"send","text":"still here"}"#);
    assert_eq!(printed(&actions), vec![&OutputLine::reply("still here")]);
}

#[test]
fn disconnected_before_first_ack_reports_retry() {
    let mut app = app();
    app.handle(AppEvent::Connecting { attempt: 1 });

    let actions = app.handle(AppEvent::Disconnected {
        reason: "refused".into(),
        retry_in: Duration::from_millis(2000),
        retry: 2,
    });

    assert_eq!(printed(&actions), vec![&OutputLine::notice(
        "connection failed: refused; retry 2 in 2.0s"
    )]);
}
