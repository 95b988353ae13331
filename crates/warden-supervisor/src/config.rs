//! Supervisor-wide configuration and timeouts.

use std::time::Duration;

/// Host env vars forwarded at sandbox provisioning time. Every other host
/// env var — including every credential the vault might return — is never
/// sent to the provider's `create` call.
pub const PROVISION_ENV_ALLOWLIST: &[&str] = &[
    "PATH", "HOME", "USER", "SHELL", "LANG", "LC_ALL", "LC_CTYPE", "TERM", "TZ", "PYTHONPATH",
    "NODE_PATH",
];

/// Domains allow-listed whenever a manifest declares a `setup_command`, so
/// package installation during setup can reach public registries.
pub const PACKAGE_REGISTRY_DOMAINS: &[&str] = &[
    "pypi.org",
    "files.pythonhosted.org",
    "registry.npmjs.org",
];

/// Timeouts and paths governing one supervisor's sessions.
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    /// Deadline for sandbox provisioning.
    pub provision_timeout: Duration,
    /// Deadline for the credential proxy's first route to accept
    /// connections.
    pub credential_proxy_timeout: Duration,
    /// Deadline for the delegation proxy to report ready.
    pub delegation_proxy_timeout: Duration,
    /// Deadline for the declared setup command.
    pub setup_command_timeout: Duration,
    /// Deadline for the agent's `{type:"ready"}` line.
    pub ready_timeout: Duration,
    /// Cap on a state snapshot's uncompressed size.
    pub max_snapshot_bytes: u64,
    /// Agent user name inside the sandbox.
    pub agent_user: String,
    /// Privileged user name inside the sandbox (runs the proxies).
    pub privileged_user: String,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            provision_timeout: Duration::from_secs(120),
            credential_proxy_timeout: Duration::from_secs(10),
            delegation_proxy_timeout: Duration::from_secs(10),
            setup_command_timeout: Duration::from_secs(600),
            ready_timeout: Duration::from_secs(20 * 60),
            max_snapshot_bytes: warden_workspace::DEFAULT_MAX_SNAPSHOT_BYTES,
            agent_user: "agent".to_owned(),
            privileged_user: "root".to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_ready_timeout_is_twenty_minutes() {
        assert_eq!(SupervisorConfig::default().ready_timeout, Duration::from_secs(1200));
    }

    #[test]
    fn provision_allowlist_excludes_credentials() {
        assert!(!PROVISION_ENV_ALLOWLIST.contains(&"ANTHROPIC_API_KEY"));
    }
}
