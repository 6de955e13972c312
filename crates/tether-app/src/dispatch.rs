//! Inbound frame dispatch.
//!
//! One handler per frame tag. Handlers only update local state and describe
//! output; none of them perform I/O. Frames are handled strictly in the order
//! the supervisor delivers them.
//!
//! Undecodable frames produce one diagnostic and are dropped. They never
//! affect the connection or later frames.

use serde_json::json;
use tether_core::Environment;
use tether_proto::{AgentDescriptor, AgentProgress, Connected, ErrorFrame, InboundFrame, Reply};

use crate::{App, AppAction, OutputLine};

/// Tool names listed before the summary collapses to "+N more".
pub const TOOL_PREVIEW: usize = 5;

/// Server greetings echoed back as `response` frames. Not shown.
const BOILERPLATE_PREFIXES: &[&str] = &["Connected to ", "Welcome"];

/// Whether a reply is the server's connection greeting rather than content.
pub fn is_boilerplate(text: &str) -> bool {
    let text = text.trim_start();
    text.is_empty() || BOILERPLATE_PREFIXES.iter().any(|prefix| text.starts_with(prefix))
}

/// One-line summary of an agent's tools: the first [`TOOL_PREVIEW`] names,
/// then a count of the rest.
pub fn tool_summary(agent: &AgentDescriptor) -> String {
    let names: Vec<&str> =
        agent.tools.iter().take(TOOL_PREVIEW).map(|tool| tool.name.as_str()).collect();
    let hidden = agent.tools.len().saturating_sub(TOOL_PREVIEW);

    let mut summary = names.join(", ");
    if hidden > 0 {
        summary.push_str(&format!(" +{hidden} more"));
    }
    summary
}

impl<E: Environment> App<E> {
    /// Decode and handle one inbound frame.
    pub(crate) fn dispatch(&mut self, text: &str) -> Vec<AppAction> {
        let frame = match InboundFrame::decode(text) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!(error = %e, kind = e.kind(), "dropping malformed frame");
                return vec![AppAction::Print(OutputLine::diagnostic(format!(
                    "malformed frame dropped: {e}"
                )))];
            },
        };

        tracing::debug!(kind = frame.kind(), "frame received");
        let mut actions = Vec::new();
        if self.session.monitor {
            actions.push(AppAction::Print(OutputLine::diagnostic(format!(
                "[monitor] {}: {}",
                frame.kind(),
                text.trim()
            ))));
        }

        match frame {
            InboundFrame::Connected(connected) => self.on_connected(connected, &mut actions),
            InboundFrame::Response(reply) => self.on_response(reply, &mut actions),
            InboundFrame::AgentProgress(progress) => on_progress(&progress, &mut actions),
            InboundFrame::Send(reply) => self.on_send(reply, &mut actions),
            InboundFrame::Error(error) => self.on_error(&error, &mut actions),
            InboundFrame::AgentInfo(agent) => on_agent_info(&agent, &mut actions),
            // Traced above in monitor mode, dropped otherwise
            InboundFrame::Pong | InboundFrame::Unrecognized { .. } => {},
        }
        actions
    }

    fn on_connected(&mut self, connected: Connected, actions: &mut Vec<AppAction>) {
        self.session.session_id = Some(connected.session_id.clone());
        self.session.connects += 1;
        actions.push(AppAction::RecordSession(connected.session_id.clone()));

        if self.session.is_reconnect() {
            tracing::info!(session_id = %connected.session_id, "session re-established");
            actions.push(AppAction::Print(OutputLine::notice(format!(
                "reconnected (session {})",
                connected.session_id
            ))));
        } else {
            tracing::info!(session_id = %connected.session_id, "session established");
            actions.extend(capability_summary(&connected));
        }

        // The server forgets per-connection settings.
        if self.session.monitor {
            actions
                .push(AppAction::Send(self.command_frame("monitor", Some(json!({ "enabled": true })))));
        }
    }

    fn on_response(&mut self, reply: Reply, actions: &mut Vec<AppAction>) {
        if is_boilerplate(&reply.text) {
            tracing::debug!("suppressing greeting echo");
            return;
        }
        self.session.pending = false;
        actions.push(AppAction::Print(OutputLine::reply(attributed(reply))));
    }

    fn on_send(&mut self, reply: Reply, actions: &mut Vec<AppAction>) {
        self.session.pending = false;
        actions.push(AppAction::Print(OutputLine::reply(attributed(reply))));
    }

    fn on_error(&mut self, error: &ErrorFrame, actions: &mut Vec<AppAction>) {
        self.session.pending = false;
        let text = match &error.code {
            Some(code) => format!("error [{code}]: {}", error.message),
            None => format!("error: {}", error.message),
        };
        actions.push(AppAction::Print(OutputLine::error(text)));
    }
}

fn on_progress(progress: &AgentProgress, actions: &mut Vec<AppAction>) {
    let text = match &progress.tool {
        Some(tool) => format!("{tool}: {}", progress.message),
        None => progress.message.clone(),
    };
    actions.push(AppAction::Progress(text));
}

fn on_agent_info(agent: &AgentDescriptor, actions: &mut Vec<AppAction>) {
    actions.push(AppAction::Print(OutputLine::notice(format!(
        "agent: {} ({} tools)",
        agent.display_title(),
        agent.tools.len()
    ))));
    if !agent.tools.is_empty() {
        actions.push(AppAction::Print(OutputLine::notice(format!("tools: {}", tool_summary(agent)))));
    }
}

fn capability_summary(connected: &Connected) -> Vec<AppAction> {
    let mut lines = vec![format!("connected (session {})", connected.session_id)];

    let domains: Vec<&str> = connected
        .domains
        .iter()
        .map(|domain| domain.name.as_deref().unwrap_or(&domain.id))
        .collect();
    if !domains.is_empty() {
        lines.push(format!("domains: {}", domains.join(", ")));
    }

    if let Some(agent) = &connected.agent {
        lines.push(format!("agent: {} ({} tools)", agent.display_title(), agent.tools.len()));
    }

    lines.into_iter().map(|line| AppAction::Print(OutputLine::notice(line))).collect()
}

fn attributed(reply: Reply) -> String {
    match reply.from {
        Some(from) if !from.is_empty() => format!("{from}: {}", reply.text),
        _ => reply.text,
    }
}
