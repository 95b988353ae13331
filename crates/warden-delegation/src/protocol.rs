//! Delegation socket protocol: one JSON object per line, agent-facing.

use serde::{Deserialize, Serialize};

/// A command sent by the agent over the delegation socket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DelegationCommand {
    /// Ranked semantic (or substring-fallback) search for candidate agents.
    Search {
        /// Free-text query.
        query: String,
    },
    /// Unfiltered top-N list from the discovery collaborator.
    SearchAll,
    /// Spawn a nested agent session from a bundle URL.
    Run {
        /// Sub-agent bundle URL.
        agent_url: String,
    },
    /// Forward a message into a nested session, streaming the reply back.
    Message {
        /// Nested session id.
        session_id: String,
        /// Message content.
        content: String,
    },
    /// Return the current output ring of a nested session.
    Monitor {
        /// Nested session id.
        session_id: String,
    },
    /// Shut down and drop a nested session.
    Stop {
        /// Nested session id.
        session_id: String,
    },
}

impl DelegationCommand {
    /// Parse one line of the delegation socket protocol.
    #[must_use]
    pub fn parse_line(line: &str) -> Option<Self> {
        serde_json::from_str(line.trim()).ok()
    }
}

/// A command forwarded by the in-sandbox proxy to the host, tagged with the
/// per-connection request id the proxy assigned under its id lock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaggedCommand {
    /// Request id assigned by the in-sandbox proxy.
    pub request_id: u64,
    /// The validated command.
    #[serde(flatten)]
    pub command: DelegationCommand,
}

/// One discovery match as returned to the agent: up to five ranked
/// candidates per search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchMatch {
    /// Matching bundle URL.
    pub agent_url: String,
    /// Match score (semantic similarity, or token-overlap count as a
    /// substring-match fallback).
    pub score: f32,
}

/// A response line written back to the agent over the delegation socket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DelegationResponse {
    /// Up to five ranked discovery matches (spec §4.4: "up to five best
    /// matches").
    SearchResults {
        /// Assigned request id.
        request_id: u64,
        /// Ranked candidates, best match first.
        agents: Vec<SearchMatch>,
    },
    /// A nested session was spawned.
    Run {
        /// Assigned request id.
        request_id: u64,
        /// Opaque nested session id.
        session_id: String,
    },
    /// One streamed event forwarded from a nested session.
    StreamEvent {
        /// Assigned request id.
        request_id: u64,
        /// Event payload, mirroring the agent process protocol.
        event: serde_json::Value,
        /// Whether this is the terminal event for the command.
        done: bool,
    },
    /// The current output ring of a nested session.
    Monitor {
        /// Assigned request id.
        request_id: u64,
        /// Ring buffer lines, oldest first.
        lines: Vec<String>,
    },
    /// A nested session was stopped.
    Stopped {
        /// Assigned request id.
        request_id: u64,
    },
    /// The command could not be completed.
    Error {
        /// Assigned request id.
        request_id: u64,
        /// Human-readable error text.
        message: String,
    },
}

impl DelegationResponse {
    /// The request id this response answers.
    #[must_use]
    pub fn request_id(&self) -> u64 {
        match self {
            DelegationResponse::SearchResults { request_id, .. }
            | DelegationResponse::Run { request_id, .. }
            | DelegationResponse::StreamEvent { request_id, .. }
            | DelegationResponse::Monitor { request_id, .. }
            | DelegationResponse::Stopped { request_id, .. }
            | DelegationResponse::Error { request_id, .. } => *request_id,
        }
    }

    /// Whether this is the last response for its request id.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, DelegationResponse::StreamEvent { done: false, .. })
    }

    /// Parse one line of the delegation socket protocol.
    #[must_use]
    pub fn parse_line(line: &str) -> Option<Self> {
        serde_json::from_str(line.trim()).ok()
    }
}

impl TaggedCommand {
    /// Parse one line of the host-facing proxy-forwarding protocol.
    #[must_use]
    pub fn parse_line(line: &str) -> Option<Self> {
        serde_json::from_str(line.trim()).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_run_command() {
        let cmd = DelegationCommand::parse_line(r#"{"type":"run","agent_url":"https://x/y"}"#)
            .unwrap();
        assert!(matches!(cmd, DelegationCommand::Run { agent_url } if agent_url == "https://x/y"));
    }

    #[test]
    fn unknown_command_type_fails_to_parse() {
        assert!(DelegationCommand::parse_line(r#"{"type":"frobnicate"}"#).is_none());
    }

    #[test]
    fn error_response_serializes_with_tag() {
        let resp = DelegationResponse::Error {
            request_id: 1,
            message: "unknown command".to_owned(),
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains(r#""type":"error""#));
    }

    #[test]
    fn tagged_command_round_trips_through_json() {
        let tagged = TaggedCommand {
            request_id: 42,
            command: DelegationCommand::Run {
                agent_url: "https://x/y".to_owned(),
            },
        };
        let json = serde_json::to_string(&tagged).unwrap();
        let parsed = TaggedCommand::parse_line(&json).unwrap();
        assert_eq!(parsed.request_id, 42);
        assert!(matches!(parsed.command, DelegationCommand::Run { .. }));
    }

    #[test]
    fn stream_event_not_done_is_not_terminal() {
        let resp = DelegationResponse::StreamEvent {
            request_id: 1,
            event: serde_json::json!({}),
            done: false,
        };
        assert!(!resp.is_terminal());
        assert_eq!(resp.request_id(), 1);
    }

    #[test]
    fn stopped_response_is_terminal() {
        let resp = DelegationResponse::Stopped { request_id: 3 };
        assert!(resp.is_terminal());
    }
}
