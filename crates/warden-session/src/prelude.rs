//! Convenience re-exports for consumers of `warden-session`.

pub use crate::error::{SessionError, SessionResult};
pub use crate::protocol::{IncomingMessage, OutgoingMessage};
pub use crate::session::AgentSession;
pub use crate::terminal::TerminalSession;
