//! Supervisor errors.

use thiserror::Error;

use crate::provider::ProviderError;

/// Errors that can occur while starting or running a supervised session.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// The manifest failed to load or validate.
    #[error("manifest invalid: {0}")]
    ManifestInvalid(#[from] warden_manifest::ManifestError),

    /// The vault could not be opened or a declared credential could not be
    /// retrieved.
    #[error("vault error: {0}")]
    Vault(#[from] warden_vault::VaultError),

    /// The external sandbox provider refused or failed an operation.
    #[error("sandbox provider error: {0}")]
    Provider(#[from] ProviderError),

    /// `/proc` could not be remounted with `hidepid=2` and the manifest has
    /// at least one key requirement.
    #[error("sandbox hardening failed: /proc hidepid remount did not succeed and the manifest declares key requirements")]
    SandboxHardeningFailed,

    /// The credential proxy did not start listening within the configured
    /// deadline.
    #[error("credential proxy failed to start: {0}")]
    CredentialProxyStartFailed(String),

    /// The declared setup command exited non-zero.
    #[error("setup command failed with exit code {exit_code}: {stderr_excerpt}")]
    SetupCommandFailed {
        /// Process exit code.
        exit_code: i32,
        /// Bounded excerpt of the command's stderr.
        stderr_excerpt: String,
    },

    /// No `{type:"ready"}` was observed within the configured deadline.
    #[error("agent did not become ready within the configured timeout")]
    AgentNotReady,

    /// The agent session reported an I/O error.
    #[error("agent session error: {0}")]
    Session(#[from] warden_session::SessionError),

    /// Snapshotting or restoring session state failed.
    #[error("state snapshot error: {0}")]
    Workspace(#[from] warden_workspace::WorkspaceError),

    /// A delegation subsystem error.
    #[error("delegation error: {0}")]
    Delegation(#[from] warden_delegation::DelegationError),

    /// An I/O error not otherwise classified.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for supervisor operations.
pub type SupervisorResult<T> = Result<T, SupervisorError>;
