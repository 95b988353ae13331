//! Delegation proxy/handler errors.

use thiserror::Error;

/// Errors that can occur in the delegation proxy or delegation handler.
#[derive(Debug, Error)]
pub enum DelegationError {
    /// I/O error on the delegation socket or a nested session's stdio.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// `run` was called with a bundle URL the parent manifest does not allow.
    #[error("agent url not in allowed_agents: {0}")]
    AgentNotAllowed(String),

    /// The requested nested session id has no entry in the session table.
    #[error("unknown nested session: {0}")]
    UnknownSession(String),

    /// The sub-manifest failed to load or validate.
    #[error("sub-manifest error: {0}")]
    Manifest(#[from] warden_manifest::ManifestError),

    /// Spawning the nested session failed.
    #[error("failed to spawn nested session: {0}")]
    SpawnFailed(String),

    /// A required credential for the sub-agent was not available and the
    /// input hook declined to supply one.
    #[error("missing credential for provider: {0}")]
    MissingCredential(String),
}

/// Result type for delegation operations.
pub type DelegationResult<T> = Result<T, DelegationError>;
