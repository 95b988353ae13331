//! Manifest types.
//!
//! Every type here is self-contained and carries no dependency on other
//! Warden crates — the manifest format is a stable contract independent of
//! how the supervisor, proxy, or vault happen to be implemented.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A validated, immutable agent manifest.
///
/// Constructed only by [`crate::loader::load_dir`] or
/// [`crate::loader::load_file`], both of which run it through
/// [`crate::validate::validate`] before returning it. There is no public
/// constructor that bypasses validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Manifest {
    /// Agent identity (name, version, description). Flattened at the TOML
    /// top level — a bundle's manifest has `name`, `display_name`, etc. as
    /// sibling keys of `runtime`/`permissions`/`keys`, not nested under an
    /// `identity` table.
    #[serde(flatten)]
    pub identity: Identity,
    /// How the agent is invoked inside the sandbox.
    pub runtime: Runtime,
    /// Resource caps enforced by the sandbox provider.
    pub resources: Resources,
    /// Network and delegation permissions.
    pub permissions: Permissions,
    /// Credentials this agent requires.
    pub keys: Vec<KeyRequirement>,
}

impl Default for Manifest {
    fn default() -> Self {
        Self {
            identity: Identity::default(),
            runtime: Runtime::default(),
            resources: Resources::default(),
            permissions: Permissions::default(),
            keys: Vec::new(),
        }
    }
}

/// Agent identity fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Identity {
    /// Unique agent name. Matches `^[a-z][a-z0-9-]*[a-z0-9]$`, length 3-40.
    pub name: String,
    /// Human-readable display name, defaults to `name` if empty.
    pub display_name: String,
    /// Semantic version of this manifest's agent.
    pub version: String,
    /// One-line description shown to operators.
    pub description: String,
}

impl Default for Identity {
    fn default() -> Self {
        Self {
            name: String::new(),
            display_name: String::new(),
            version: "0.1.0".to_owned(),
            description: String::new(),
        }
    }
}

/// Runtime invocation fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Runtime {
    /// Language tag (e.g. `"python"`, `"node"`), informational.
    pub language: String,
    /// Command run once before the agent starts, if any.
    pub setup_command: Option<String>,
    /// Programmatic entry point (e.g. a module path), mutually satisfiable
    /// alongside `run_command` — at least one of the two must be set.
    pub entry_point: Option<String>,
    /// Shell command used to launch the agent process.
    pub run_command: Option<String>,
    /// Sandbox template tag; must be in the built-in allowlist.
    pub sandbox_template: String,
    /// Default model identifier passed through to the agent's environment.
    pub default_model: Option<String>,
    /// Path, relative to the bundle root, of a dependency manifest (e.g.
    /// `requirements.txt`). Must resolve to a readable file if set.
    pub dependencies: Option<String>,
}

impl Default for Runtime {
    fn default() -> Self {
        Self {
            language: String::new(),
            setup_command: None,
            entry_point: None,
            run_command: None,
            sandbox_template: "default".to_owned(),
            default_model: None,
            dependencies: None,
        }
    }
}

/// Resource caps requested of the sandbox provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Resources {
    /// Memory cap in megabytes.
    pub memory_mb: u32,
    /// Virtual CPU count.
    pub cpu_count: u32,
    /// Maximum total session duration, in seconds.
    pub max_duration_secs: u64,
}

impl Default for Resources {
    fn default() -> Self {
        Self {
            memory_mb: 1024,
            cpu_count: 1,
            max_duration_secs: 3600,
        }
    }
}

/// A single allowed outbound network destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkPermission {
    /// FQDN the agent may reach.
    pub domain: String,
    /// Human-readable justification, surfaced to operators during review.
    pub reason: String,
}

/// Delegation (sub-agent spawning) permissions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DelegationPermission {
    /// Whether this agent may spawn sub-agents at all.
    pub enabled: bool,
    /// Substring allowlist of sub-agent URLs. Empty means delegation is
    /// unusable even if `enabled` is true.
    pub allowed_agents: Vec<String>,
}

/// Network and delegation permissions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Permissions {
    /// Explicitly allowed outbound domains.
    pub network: Vec<NetworkPermission>,
    /// If true, outbound network is unrestricted and `network` is ignored
    /// for policy purposes (though still recorded for audit).
    pub unrestricted: bool,
    /// Whether the agent may read/write its session state directory.
    pub workspace_access: bool,
    /// Sub-agent delegation permissions.
    pub delegation: DelegationPermission,
}

impl Default for Permissions {
    fn default() -> Self {
        Self {
            network: Vec::new(),
            unrestricted: false,
            workspace_access: true,
            delegation: DelegationPermission::default(),
        }
    }
}

/// How the credential proxy expects the agent to authenticate with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthStyle {
    /// `Authorization: Bearer <token>`.
    Bearer,
    /// A named header carrying the token, e.g. `x-api-key`.
    Header(String),
}

impl Default for AuthStyle {
    fn default() -> Self {
        Self::Bearer
    }
}

/// A single credential this agent requires.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyRequirement {
    /// Provider identifier (e.g. `"anthropic"`).
    pub provider: String,
    /// Overridden env-var name for the injected token. Defaults to the
    /// provider's conventional `<PROVIDER>_API_KEY` form.
    pub env_var: Option<String>,
    /// Whether session start fails if no credential is available.
    pub required: bool,
    /// Upstream domain to route to. Ignored and replaced by the built-in
    /// value for known providers.
    pub domain: Option<String>,
    /// Env-var name under which the loopback base URL is injected.
    pub base_url_env_var: Option<String>,
    /// How the agent must authenticate to the in-sandbox proxy route.
    pub auth_style: AuthStyle,
    /// If true, the real key is passed through unmodified rather than
    /// rewritten by the proxy (reserved for providers whose SDK signs
    /// requests client-side).
    pub passthrough: bool,
}

impl Default for KeyRequirement {
    fn default() -> Self {
        Self {
            provider: String::new(),
            env_var: None,
            required: true,
            domain: None,
            base_url_env_var: None,
            auth_style: AuthStyle::default(),
            passthrough: false,
        }
    }
}

impl KeyRequirement {
    /// The env-var name this requirement injects the token under.
    #[must_use]
    pub fn token_env_var(&self) -> String {
        self.env_var.clone().unwrap_or_else(|| {
            format!("{}_API_KEY", self.provider.to_uppercase().replace('-', "_"))
        })
    }

}

/// A known provider's built-in routing metadata. Manifest declarations
/// for these providers cannot override the upstream domain.
#[derive(Debug, Clone, Copy)]
pub struct KnownProvider {
    /// Provider identifier as it appears in manifests.
    pub id: &'static str,
    /// Fixed upstream FQDN; cannot be redirected by a manifest.
    pub domain: &'static str,
    /// Conventional env-var name for the token.
    pub env_var: &'static str,
    /// Conventional env-var name for the base URL, if the provider's SDK
    /// honors one.
    pub base_url_env_var: Option<&'static str>,
    /// Header style the provider's own upstream API expects.
    pub auth_style: KnownAuthStyle,
}

/// Auth style for a known provider's *upstream* API (as opposed to the
/// loopback proxy route, which always uses [`AuthStyle`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KnownAuthStyle {
    /// `Authorization: Bearer <key>`.
    Bearer,
    /// A named header, e.g. Anthropic's `x-api-key`.
    Header(&'static str),
}

/// Map of env-var name to owning provider id, used to detect collisions
/// between requirements when deciding which env-vars are already claimed.
pub(crate) type EnvVarClaims = HashMap<String, String>;
