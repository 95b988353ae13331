//! Agent process protocol: one JSON object per line over stdin/stdout.

use serde::{Deserialize, Serialize};

/// A message the supervisor sends to the agent's standard input.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutgoingMessage {
    /// Deliver content to the agent, tagged with a caller-assigned id.
    Message {
        /// Message body.
        content: String,
        /// Caller-assigned correlation id.
        message_id: String,
    },
    /// Instruct the agent to shut down. Always the last message sent.
    Shutdown,
}

/// A line the agent emits on its standard output.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IncomingMessage {
    /// Sent once, after the agent has finished initializing.
    Ready,
    /// A (possibly partial) response to a prior message.
    Response {
        /// Response content.
        content: String,
        /// Correlation id of the message this responds to, if any.
        #[serde(default)]
        message_id: Option<String>,
        /// Whether this is the final chunk of the response.
        #[serde(default)]
        done: bool,
    },
    /// The agent is performing a visible action (tool use, etc).
    Activity {
        /// Tool or action name.
        tool: String,
        /// Human-readable description.
        description: String,
        /// Correlation id, if any.
        #[serde(default)]
        message_id: Option<String>,
    },
    /// The agent reports an error.
    Error {
        /// Error text.
        error: String,
        /// Correlation id, if any.
        #[serde(default)]
        message_id: Option<String>,
    },
}

impl IncomingMessage {
    /// Whether this line is the `ready` sentinel.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self, IncomingMessage::Ready)
    }

    /// Parse a single line of agent output.
    ///
    /// Returns `None` for lines that are not valid JSON or do not match the
    /// known message shapes — the reader task silently drops these.
    #[must_use]
    pub fn parse_line(line: &str) -> Option<Self> {
        serde_json::from_str(line.trim()).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ready_line() {
        let msg = IncomingMessage::parse_line(r#"{"type":"ready"}"#).unwrap();
        assert!(msg.is_ready());
    }

    #[test]
    fn parses_response_line() {
        let msg = IncomingMessage::parse_line(
            r#"{"type":"response","content":"hi","message_id":"m1","done":true}"#,
        )
        .unwrap();
        match msg {
            IncomingMessage::Response { content, done, .. } => {
                assert_eq!(content, "hi");
                assert!(done);
            }
            _ => panic!("expected a response"),
        }
    }

    #[test]
    fn non_json_line_is_dropped() {
        assert!(IncomingMessage::parse_line("stray log output").is_none());
    }

    #[test]
    fn outgoing_message_serializes_with_tag() {
        let msg = OutgoingMessage::Message {
            content: "hello".to_owned(),
            message_id: "abc".to_owned(),
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains(r#""type":"message""#));
    }
}
