//! Workspace and snapshot errors.

use thiserror::Error;

/// Errors from session state directory or snapshot operations.
#[derive(Debug, Error)]
pub enum WorkspaceError {
    /// I/O error reading, writing, or packing a state directory.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A tar member rejected by the allowlist-restore filter: an absolute
    /// path, a `..` segment, or a symlink/hardlink.
    #[error("rejected snapshot member '{path}': {reason}")]
    RejectedMember {
        /// The offending member's path as recorded in the tar.
        path: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The uncompressed snapshot would exceed the configured size cap.
    #[error("snapshot for {agent}/{session} exceeds the {limit_bytes} byte cap")]
    SnapshotTooLarge {
        /// Owning agent name.
        agent: String,
        /// Owning session name.
        session: String,
        /// Configured cap.
        limit_bytes: u64,
    },

    /// Hardening a sandbox (remounting `/proc` with `hidepid=2`) failed.
    #[error("sandbox hardening failed: {0}")]
    HardeningFailed(String),
}

/// Result type for workspace operations.
pub type WorkspaceResult<T> = Result<T, WorkspaceError>;
