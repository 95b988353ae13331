//! Agent/terminal session errors.

use thiserror::Error;

/// Errors that can occur while running an agent or terminal session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// I/O error writing to or reading from the child process.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The agent process exited before a `ready` line was observed.
    #[error("agent exited before becoming ready")]
    ExitedBeforeReady,

    /// `wait_ready` or `receive` timed out.
    #[error("timed out waiting for the agent")]
    Timeout,

    /// A PTY could not be opened or resized.
    #[error("pty error: {0}")]
    Pty(String),
}

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;
