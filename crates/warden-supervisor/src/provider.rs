//! The sandbox provider: an opaque collaborator the supervisor drives but
//! does not implement. Concrete remote-microVM backends live outside this
//! crate and plug in through this trait.

use std::collections::HashMap;
use std::time::Duration;

use thiserror::Error;

/// Errors a sandbox provider implementation may report.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider refused or timed out provisioning a sandbox.
    #[error("sandbox provisioning failed: {0}")]
    ProvisionFailed(String),
    /// A file operation against the sandbox failed.
    #[error("sandbox file operation failed: {0}")]
    FileOperation(String),
    /// A command invocation inside the sandbox failed to start or complete.
    #[error("sandbox command failed: {0}")]
    CommandFailed(String),
    /// A PTY operation inside the sandbox failed.
    #[error("sandbox pty operation failed: {0}")]
    PtyFailed(String),
}

/// Result type for sandbox provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Outbound network policy requested at sandbox creation time.
#[derive(Debug, Clone, Default)]
pub struct NetworkPolicy {
    /// CIDRs denied outbound. `["0.0.0.0/0"]` for deny-all-by-default.
    pub deny_out: Vec<String>,
    /// FQDNs allow-listed for outbound egress.
    pub allow_out: Vec<String>,
}

impl NetworkPolicy {
    /// No restriction: egress is unrestricted.
    #[must_use]
    pub fn unrestricted() -> Self {
        Self::default()
    }

    /// Deny all egress except the given allow-listed domains.
    #[must_use]
    pub fn restricted(allow_out: Vec<String>) -> Self {
        Self {
            deny_out: vec!["0.0.0.0/0".to_owned()],
            allow_out,
        }
    }

    /// Whether this policy denies by default (as opposed to unrestricted).
    #[must_use]
    pub fn is_restricted(&self) -> bool {
        !self.deny_out.is_empty()
    }
}

/// Options for a single in-sandbox command invocation.
#[derive(Debug, Clone, Default)]
pub struct CommandOptions {
    /// User to run the command as. `None` means the provider's default.
    pub user: Option<String>,
    /// Run detached, without blocking for completion.
    pub background: bool,
    /// Bytes to write to the command's standard input immediately.
    pub stdin: Option<Vec<u8>>,
    /// Wall-clock deadline for the command.
    pub timeout: Option<Duration>,
}

/// Requested pseudo-terminal geometry.
#[derive(Debug, Clone, Copy)]
pub struct PtySizeSpec {
    /// Terminal rows.
    pub rows: u16,
    /// Terminal columns.
    pub cols: u16,
}

/// A running or completed in-sandbox command.
pub trait CommandHandle: Send {
    /// The provider's process id for this command.
    fn pid(&self) -> u32;

    /// Block until the command completes, invoking `on_stdout`/`on_stderr`
    /// for each chunk observed, and return the exit code.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::CommandFailed`] if waiting fails.
    fn wait(
        &mut self,
        on_stdout: &mut dyn FnMut(&[u8]),
        on_stderr: &mut dyn FnMut(&[u8]),
    ) -> ProviderResult<i32>;

    /// The exit code, if the command has already completed.
    fn exit_code(&self) -> Option<i32>;

    /// Accumulated standard output observed so far.
    fn stdout(&self) -> &[u8];

    /// Accumulated standard error observed so far.
    fn stderr(&self) -> &[u8];
}

/// A pseudo-terminal allocated inside the sandbox.
pub trait PtyHandle: Send {
    /// Write raw bytes to the pty's input side.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::PtyFailed`] on a provider-side I/O failure.
    fn send_stdin(&self, bytes: &[u8]) -> ProviderResult<()>;

    /// Resize the pty.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::PtyFailed`] on a provider-side I/O failure.
    fn resize(&self, size: PtySizeSpec) -> ProviderResult<()>;
}

/// A provisioned sandbox instance.
pub trait Sandbox: Send + Sync {
    /// Write `bytes` to `path` inside the sandbox, optionally as `user`.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::FileOperation`] on failure.
    fn write_file(&self, path: &str, bytes: &[u8], user: Option<&str>) -> ProviderResult<()>;

    /// Read the full contents of `path` inside the sandbox.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::FileOperation`] on failure.
    fn read_file(&self, path: &str) -> ProviderResult<Vec<u8>>;

    /// Run `command` inside the sandbox under `opts`.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::CommandFailed`] if the command cannot be
    /// started.
    fn run_command(&self, command: &str, opts: CommandOptions) -> ProviderResult<Box<dyn CommandHandle>>;

    /// Write `bytes` to a running command's standard input.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::CommandFailed`] on failure.
    fn send_stdin(&self, pid: u32, bytes: &[u8]) -> ProviderResult<()>;

    /// Allocate a pseudo-terminal inside the sandbox.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::PtyFailed`] on failure.
    fn create_pty(
        &self,
        size: PtySizeSpec,
        user: Option<&str>,
        cwd: Option<&str>,
    ) -> ProviderResult<Box<dyn PtyHandle>>;

    /// Tear the sandbox down. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::ProvisionFailed`] if teardown fails.
    fn kill(&self) -> ProviderResult<()>;
}

/// The external remote-microVM backend. Implemented outside this crate.
pub trait SandboxProvider: Send + Sync {
    /// Provision a sandbox from `template`, seeded with exactly `envs` and
    /// governed by `network_policy`.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::ProvisionFailed`] if the provider refuses or
    /// times out within `timeout`.
    fn create(
        &self,
        template: &str,
        envs: &HashMap<String, String>,
        network_policy: &NetworkPolicy,
        timeout: Duration,
    ) -> ProviderResult<Box<dyn Sandbox>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unrestricted_policy_has_no_deny_rules() {
        assert!(!NetworkPolicy::unrestricted().is_restricted());
    }

    #[test]
    fn restricted_policy_denies_everything_by_default() {
        let policy = NetworkPolicy::restricted(vec!["api.anthropic.com".to_owned()]);
        assert!(policy.is_restricted());
        assert_eq!(policy.deny_out, vec!["0.0.0.0/0".to_owned()]);
        assert_eq!(policy.allow_out, vec!["api.anthropic.com".to_owned()]);
    }
}
