//! Warden Session - agent session (duplex JSON) and terminal session (PTY).
//!
//! An [`AgentSession`] wraps one running agent process, decoding its
//! standard output line by line under a dedicated reader thread and writing
//! the agent process protocol to its standard input. A [`TerminalSession`]
//! is the PTY-backed variant used for interactive sessions: raw bytes, no
//! JSON framing, plus resize support.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod error;
pub mod prelude;
pub mod protocol;
pub mod session;
pub mod terminal;

pub use error::{SessionError, SessionResult};
pub use protocol::{IncomingMessage, OutgoingMessage};
pub use session::AgentSession;
pub use terminal::TerminalSession;
