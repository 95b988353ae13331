//! The Sandbox Supervisor: orchestrates one session's lifecycle from
//! provisioning through shutdown.
//!
//! Step ordering below is security-critical and must not be reordered —
//! see the module-level invariants each step documents.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::RngCore;
use warden_core::dirs::WardenHome;
use warden_core::ids::SessionId;
use warden_delegation::{DelegationBridge, DelegationHandler};
use warden_manifest::types::{AuthStyle as ManifestAuthStyle, KnownAuthStyle, Manifest};
use warden_manifest::{known_providers, loader};
use warden_proxy::route::{AuthStyle as ProxyAuthStyle, Route, RouteTable};
use warden_vault::Vault;
use warden_workspace::{boundaries, snapshot};

use crate::config::{SupervisorConfig, PACKAGE_REGISTRY_DOMAINS, PROVISION_ENV_ALLOWLIST};
use crate::error::{SupervisorError, SupervisorResult};
use crate::provider::{CommandOptions, NetworkPolicy, Sandbox, SandboxProvider};
use crate::remote_session::RemoteAgentSession;

/// Generate a fresh per-session token the agent sees in place of any real
/// credential.
fn generate_session_token() -> String {
    let mut bytes = [0u8; 16];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    format!("sk-ant-proxy01-{}", hex::encode(bytes))
}

/// A started session: the live sandbox, its agent conversation, and the
/// bookkeeping needed to run the shutdown sequence exactly once.
pub struct SupervisedSession {
    session_id: SessionId,
    manifest: Manifest,
    sandbox: Arc<dyn Sandbox>,
    agent: RemoteAgentSession,
    delegation: Option<(DelegationBridge, Arc<DelegationHandler>)>,
    proxy_pid: Option<u32>,
    state_dir: PathBuf,
    config: SupervisorConfig,
    shut_down: bool,
}

impl SupervisedSession {
    /// Send a message to the agent.
    ///
    /// # Errors
    ///
    /// Returns [`SupervisorError::Provider`] if the write fails.
    pub fn send_message(&self, content: &str, message_id: &str) -> SupervisorResult<()> {
        self.agent.send_message(content, message_id)
    }

    /// Return the next decoded agent line, or `None` on timeout.
    #[must_use]
    pub fn receive(&self, timeout: Duration) -> Option<warden_session::IncomingMessage> {
        self.agent.receive(timeout)
    }

    /// Whether the agent process is still alive.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.agent.is_alive()
    }

    /// The credential proxy's in-sandbox process id, for diagnostics.
    #[must_use]
    pub fn credential_proxy_pid(&self) -> Option<u32> {
        self.proxy_pid
    }

    /// This session's id.
    #[must_use]
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// Run the full shutdown sequence: delegation teardown, state
    /// snapshot, proxy kill, sandbox destroy. Idempotent.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;

        if let Some((mut bridge, handler)) = self.delegation.take() {
            if let Err(e) = handler.shutdown() {
                tracing::warn!(error = %e, "delegation handler shutdown failed");
            }
            bridge.shutdown();
        }

        self.agent.shutdown();

        if let Err(e) = self.snapshot_state() {
            tracing::warn!(error = %e, "state snapshot failed during shutdown");
        }

        // The credential proxy has no dedicated kill primitive; sandbox
        // teardown below takes it down along with everything else.
        if let Err(e) = self.sandbox.kill() {
            tracing::warn!(error = %e, "sandbox destroy failed during shutdown");
        }
    }

    /// Ask the sandbox to tar up the allowlisted subdirectories in place,
    /// then pull the resulting archive back through [`Sandbox::read_file`]
    /// and write it to this session's persisted state path. The opaque
    /// sandbox surface has no directory-listing primitive, so the archive
    /// is built remotely rather than file-by-file.
    fn snapshot_state(&self) -> SupervisorResult<()> {
        let agent_home = format!("/home/{}", self.config.agent_user);
        let remote_archive = format!("{agent_home}/.warden-snapshot.tar.gz");
        let subdirs = snapshot::ALLOWED_SUBDIRS.join(" ");
        let tar_command =
            format!("tar czf {remote_archive} -C {agent_home} --ignore-failed-read {subdirs}");

        let mut handle = self.sandbox.run_command(
            &tar_command,
            CommandOptions {
                user: Some(self.config.agent_user.clone()),
                ..CommandOptions::default()
            },
        )?;
        let exit_code = handle.wait(&mut |_| {}, &mut |_| {})?;
        if exit_code != 0 {
            tracing::warn!(exit_code, "remote snapshot tar command failed");
            return Ok(());
        }

        let bytes = self.sandbox.read_file(&remote_archive)?;
        if bytes.len() as u64 > self.config.max_snapshot_bytes {
            return Err(SupervisorError::Workspace(warden_workspace::WorkspaceError::SnapshotTooLarge {
                agent: self.manifest.identity.name.clone(),
                session: self.session_id.to_string(),
                limit_bytes: self.config.max_snapshot_bytes,
            }));
        }

        std::fs::create_dir_all(&self.state_dir)?;
        std::fs::write(self.state_dir.join("state.tar.gz"), bytes)?;
        Ok(())
    }
}

impl Drop for SupervisedSession {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Orchestrates the session-start sequence against a concrete sandbox
/// provider.
pub struct Supervisor {
    provider: Arc<dyn SandboxProvider>,
    home: WardenHome,
    config: SupervisorConfig,
}

impl Supervisor {
    /// Construct a supervisor bound to `provider` and `home`.
    #[must_use]
    pub fn new(provider: Arc<dyn SandboxProvider>, home: WardenHome, config: SupervisorConfig) -> Self {
        Self { provider, home, config }
    }

    /// Run the full session-start sequence for the manifest at
    /// `bundle_dir`, using `vault` to resolve declared credentials.
    ///
    /// # Errors
    ///
    /// Returns [`SupervisorError::ManifestInvalid`] if the manifest fails
    /// to load, or any of the lifecycle-stage errors documented on
    /// [`SupervisorError`] if a later step fails. Every failure after the
    /// sandbox is created runs a best-effort destroy before returning.
    pub fn start_session(
        &self,
        bundle_dir: &Path,
        session_name: &str,
        vault: &mut Vault,
    ) -> SupervisorResult<SupervisedSession> {
        let manifest = loader::load_dir(bundle_dir)?;
        let session_id = SessionId::new();

        // Step 1: provision with an allowlisted env subset only.
        let provision_envs = allowlisted_host_envs();
        let network_policy = compute_network_policy(&manifest); // Step 2
        let sandbox: Arc<dyn Sandbox> = Arc::from(self.provider.create(
            &manifest.runtime.sandbox_template,
            &provision_envs,
            &network_policy,
            self.config.provision_timeout,
        )?);

        match self.continue_session_start(&manifest, session_id, session_name, Arc::clone(&sandbox), bundle_dir, vault)
        {
            Ok(session) => Ok(session),
            Err(e) => {
                let _ = sandbox.kill();
                Err(e)
            }
        }
    }

    fn continue_session_start(
        &self,
        manifest: &Manifest,
        session_id: SessionId,
        session_name: &str,
        sandbox: Arc<dyn Sandbox>,
        bundle_dir: &Path,
        vault: &mut Vault,
    ) -> SupervisorResult<SupervisedSession> {
        // Step 3: upload the agent bundle.
        upload_bundle(sandbox.as_ref(), bundle_dir)?;

        // Step 4: restore state, if a prior snapshot exists.
        let state_dir = boundaries::state_dir(&self.home, &manifest.identity.name, session_name);
        restore_state(sandbox.as_ref(), &state_dir, &self.config.agent_user)?;

        // Step 5: harden.
        harden_sandbox(sandbox.as_ref(), manifest, &self.config)?;

        // Step 6: start the credential proxy.
        let (route_table, session_token, env_bindings) = build_route_table(manifest, vault)?;
        let proxy_pid = start_credential_proxy(sandbox.as_ref(), &route_table, &self.config)?;

        // Step 7: start the delegation proxy, if enabled.
        let delegation = if manifest.permissions.delegation.enabled {
            Some(start_delegation_proxy(manifest, &self.home, session_id)?)
        } else {
            None
        };

        // Step 8: run the setup command.
        if let Some(setup_command) = &manifest.runtime.setup_command {
            run_setup_command(sandbox.as_ref(), setup_command, &self.config)?;
        }

        // Step 9: start the agent process.
        let agent_command = start_agent_process(sandbox.as_ref(), manifest, &env_bindings, session_token, &self.config)?;
        let agent = RemoteAgentSession::spawn(Arc::clone(&sandbox), agent_command);
        agent.wait_ready(self.config.ready_timeout)?;

        Ok(SupervisedSession {
            session_id,
            manifest: manifest.clone(),
            sandbox,
            agent,
            delegation,
            proxy_pid: Some(proxy_pid),
            state_dir,
            config: self.config.clone(),
            shut_down: false,
        })
    }
}

fn allowlisted_host_envs() -> HashMap<String, String> {
    let mut envs = HashMap::new();
    for name in PROVISION_ENV_ALLOWLIST {
        if let Ok(value) = std::env::var(name) {
            envs.insert((*name).to_owned(), value);
        }
    }
    envs
}

/// Step 2: deny-all-by-default plus the union of declared domains,
/// package-registry domains (if `setup_command` is present), and
/// known-provider upstream domains. Custom domains for unknown providers
/// are never auto-allowed.
fn compute_network_policy(manifest: &Manifest) -> NetworkPolicy {
    if manifest.permissions.unrestricted {
        return NetworkPolicy::unrestricted();
    }

    let mut allow = Vec::new();
    for permission in &manifest.permissions.network {
        allow.push(permission.domain.clone());
    }
    if manifest.runtime.setup_command.is_some() {
        allow.extend(PACKAGE_REGISTRY_DOMAINS.iter().map(|d| (*d).to_owned()));
    }
    for key in &manifest.keys {
        if let Some(provider) = known_providers::lookup(&key.provider) {
            allow.push(provider.domain.to_owned());
        }
    }
    allow.sort();
    allow.dedup();
    NetworkPolicy::restricted(allow)
}

fn upload_bundle(sandbox: &dyn Sandbox, bundle_dir: &Path) -> SupervisorResult<()> {
    for entry in walk_files(bundle_dir)? {
        let relative = entry
            .strip_prefix(bundle_dir)
            .expect("walked entry is under bundle_dir")
            .to_string_lossy()
            .replace('\\', "/");
        let bytes = std::fs::read(&entry)?;
        sandbox.write_file(&format!("bundle/{relative}"), &bytes, None)?;
    }
    Ok(())
}

fn walk_files(root: &Path) -> SupervisorResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
            } else {
                files.push(path);
            }
        }
    }
    Ok(files)
}

/// Unpack a previously saved `state.tar.gz`, if one exists, into a local
/// staging directory (rejecting path-traversing or symlink members via
/// [`snapshot::restore_snapshot`]), then upload the result into the
/// sandbox and extract it there.
fn restore_state(sandbox: &dyn Sandbox, state_dir: &Path, agent_user: &str) -> SupervisorResult<()> {
    let archive_path = state_dir.join("state.tar.gz");
    if !archive_path.is_file() {
        return Ok(());
    }

    let staging = state_dir.join("staging");
    if staging.is_dir() {
        std::fs::remove_dir_all(&staging)?;
    }
    snapshot::restore_snapshot(&archive_path, &staging)?;

    for subdir in snapshot::ALLOWED_SUBDIRS {
        let local = staging.join(subdir);
        if !local.is_dir() {
            continue;
        }
        for file in walk_files(&local)? {
            let relative = file
                .strip_prefix(&staging)
                .expect("walked entry is under the staging dir")
                .to_string_lossy()
                .replace('\\', "/");
            let bytes = std::fs::read(&file)?;
            sandbox.write_file(&format!("/home/{agent_user}/{relative}"), &bytes, Some(agent_user))?;
        }
    }
    Ok(())
}

fn harden_sandbox(sandbox: &dyn Sandbox, manifest: &Manifest, config: &SupervisorConfig) -> SupervisorResult<()> {
    for command in warden_workspace::hardening::strip_privileged_commands(&config.agent_user) {
        run_and_discard(sandbox, &command, &config.privileged_user)?;
    }

    let remount = run_and_discard(
        sandbox,
        &warden_workspace::hardening::remount_proc_hidepid_command(),
        &config.privileged_user,
    );
    if remount.is_err() {
        if manifest.keys.is_empty() {
            tracing::warn!("/proc hidepid remount failed; manifest has no keys, continuing");
        } else {
            return Err(SupervisorError::SandboxHardeningFailed);
        }
    }
    Ok(())
}

fn run_and_discard(sandbox: &dyn Sandbox, command: &str, user: &str) -> SupervisorResult<()> {
    let mut handle = sandbox.run_command(
        command,
        CommandOptions {
            user: Some(user.to_owned()),
            ..CommandOptions::default()
        },
    )?;
    let exit_code = handle.wait(&mut |_| {}, &mut |_| {})?;
    if exit_code != 0 {
        return Err(SupervisorError::SandboxHardeningFailed);
    }
    Ok(())
}

/// One resolved key requirement: the env-var names [`start_agent_process`]
/// must inject for it, keyed by the route's own loopback port rather than
/// the requirement's position in `manifest.keys` (optional, missing keys
/// are skipped in [`build_route_table`], so positions and routes can
/// diverge).
struct EnvBinding {
    loopback_port: u16,
    token_env_var: String,
    base_url_env_var: Option<String>,
}

/// Step 6: build the route table from declared key requirements, resolving
/// real credentials from the vault and generating the session's shared
/// token.
fn build_route_table(
    manifest: &Manifest,
    vault: &mut Vault,
) -> SupervisorResult<(RouteTable, String, Vec<EnvBinding>)> {
    let session_token = generate_session_token();
    let mut routes = Vec::new();
    let mut bindings = Vec::new();
    let mut next_port = 9001u16;

    for key in &manifest.keys {
        let Some(real_key) = vault.get(&key.provider, None)? else {
            if key.required {
                return Err(SupervisorError::CredentialProxyStartFailed(format!(
                    "no vault credential for required provider {}",
                    key.provider
                )));
            }
            continue;
        };

        let known = known_providers::lookup(&key.provider);

        let upstream_host = known
            .map(|p| p.domain.to_owned())
            .or_else(|| key.domain.clone())
            .unwrap_or_default();

        // A known provider's upstream expects its own fixed auth style;
        // the manifest cannot override it (only unknown providers fall
        // back to the manifest's declared style).
        let auth_style = match known {
            Some(provider) => match provider.auth_style {
                KnownAuthStyle::Bearer => ProxyAuthStyle::Bearer,
                KnownAuthStyle::Header(name) => ProxyAuthStyle::Header { name: name.to_owned() },
            },
            None => match &key.auth_style {
                ManifestAuthStyle::Bearer => ProxyAuthStyle::Bearer,
                ManifestAuthStyle::Header(name) => ProxyAuthStyle::Header { name: name.clone() },
            },
        };

        let loopback_port = next_port;
        next_port += 1;

        routes.push(Route {
            loopback_port,
            upstream_host,
            real_key,
            auth_style,
            session_token: session_token.clone(),
        });
        bindings.push(EnvBinding {
            loopback_port,
            token_env_var: key.token_env_var(),
            base_url_env_var: key.base_url_env_var.clone().or_else(|| {
                known.and_then(|provider| provider.base_url_env_var.map(ToOwned::to_owned))
            }),
        });
    }

    Ok((RouteTable { routes }, session_token, bindings))
}

fn start_credential_proxy(
    sandbox: &dyn Sandbox,
    route_table: &RouteTable,
    config: &SupervisorConfig,
) -> SupervisorResult<u32> {
    let stdin_json = serde_json::to_string(route_table).expect("RouteTable always serializes") + "\n";
    let mut handle = sandbox.run_command(
        "warden-proxy",
        CommandOptions {
            user: Some(config.privileged_user.clone()),
            background: true,
            stdin: Some(stdin_json.into_bytes()),
            timeout: None,
        },
    )?;
    let pid = handle.pid();

    let deadline = Instant::now() + config.credential_proxy_timeout;
    while Instant::now() < deadline {
        if let Some(first) = route_table.routes.first() {
            if std::net::TcpStream::connect_timeout(
                &std::net::SocketAddr::from(([127, 0, 0, 1], first.loopback_port)),
                Duration::from_millis(200),
            )
            .is_ok()
            {
                return Ok(pid);
            }
        } else {
            return Ok(pid);
        }
        std::thread::sleep(Duration::from_millis(100));
    }
    let _ = handle.wait(&mut |_| {}, &mut |_| {});
    Err(SupervisorError::CredentialProxyStartFailed(
        "timed out waiting for the first route to accept connections".to_owned(),
    ))
}

/// Bundles what Step 7 starts: the proxy child process plus the host-side
/// handler driving it.
type DelegationComponents = (DelegationBridge, Arc<DelegationHandler>);

/// Spawns the delegation proxy binary as a bridge-colocated host child
/// process rather than inside the sandbox: [`DelegationBridge`] needs a
/// real `Read`/`Write` pair over the proxy's stdio, which the
/// [`CommandHandle`](crate::provider::CommandHandle) callback model does
/// not expose. A remote-microVM backend would need to adapt the bridge to
/// drive the proxy's stdio through `Sandbox::send_stdin` the same way
/// [`RemoteAgentSession`] does for the agent conversation — until then, a
/// sandboxed agent has no path to this proxy at all, since the Unix-domain
/// socket it binds is opened on the host, not inside the sandbox.
fn start_delegation_proxy(
    manifest: &Manifest,
    home: &WardenHome,
    session_id: SessionId,
) -> SupervisorResult<DelegationComponents> {
    let state_root = home.session_dir(session_id);
    let handler = Arc::new(DelegationHandler::new(
        manifest.permissions.delegation.allowed_agents.clone(),
        Arc::new(UnimplementedSessionSpawner),
        Arc::new(NoDiscoveryClient),
        Arc::new(NoopCredentialPrompt),
        Arc::new(NoopVaultLookup),
        state_root,
    ));

    let mut command = std::process::Command::new("warden-delegation-proxy");
    command.arg(warden_delegation::DEFAULT_SOCKET_PATH);
    let bridge = DelegationBridge::spawn(command, Arc::clone(&handler))?;

    Ok((bridge, handler))
}

/// Placeholder [`warden_delegation::SessionSpawner`] until a concrete
/// nested-session implementation is wired against this crate's own
/// `Supervisor::start_session`.
struct UnimplementedSessionSpawner;

impl warden_delegation::SessionSpawner for UnimplementedSessionSpawner {
    fn resolve_manifest(&self, agent_url: &str) -> warden_delegation::DelegationResult<Manifest> {
        Err(warden_delegation::DelegationError::SpawnFailed(format!(
            "bundle resolution for {agent_url} is not wired to a bundle-fetch collaborator"
        )))
    }

    fn spawn(
        &self,
        agent_url: &str,
        _manifest: &Manifest,
        _state_dir: &Path,
        _credentials: &HashMap<String, String>,
    ) -> warden_delegation::DelegationResult<Box<dyn warden_delegation::NestedSession>> {
        Err(warden_delegation::DelegationError::SpawnFailed(format!(
            "nested spawn for {agent_url} is not wired"
        )))
    }
}

struct NoDiscoveryClient;

impl warden_delegation::DiscoveryClient for NoDiscoveryClient {
    fn search(&self, query: &str) -> warden_delegation::DelegationResult<Vec<warden_delegation::DiscoveryMatch>> {
        let _ = query;
        Ok(Vec::new())
    }

    fn search_all(&self) -> warden_delegation::DelegationResult<Vec<warden_delegation::DiscoveryMatch>> {
        Ok(Vec::new())
    }
}

struct NoopCredentialPrompt;

impl warden_delegation::CredentialPrompt for NoopCredentialPrompt {
    fn prompt(&self, provider: &str) -> Option<String> {
        let _ = provider;
        None
    }
}

struct NoopVaultLookup;

impl warden_delegation::VaultLookup for NoopVaultLookup {
    fn has_credential(&self, provider: &str) -> bool {
        let _ = provider;
        false
    }

    fn store_credential(&self, provider: &str, key: &str) {
        let _ = (provider, key);
    }
}

fn run_setup_command(sandbox: &dyn Sandbox, setup_command: &str, config: &SupervisorConfig) -> SupervisorResult<()> {
    let mut handle = sandbox.run_command(
        setup_command,
        CommandOptions {
            user: Some(config.agent_user.clone()),
            timeout: Some(config.setup_command_timeout),
            ..CommandOptions::default()
        },
    )?;
    let mut stderr_accum = Vec::new();
    let exit_code = handle.wait(&mut |_| {}, &mut |chunk| stderr_accum.extend_from_slice(chunk))?;
    if exit_code != 0 {
        let stderr_excerpt = String::from_utf8_lossy(&stderr_accum);
        let bounded: String = stderr_excerpt.chars().take(2000).collect();
        return Err(SupervisorError::SetupCommandFailed {
            exit_code,
            stderr_excerpt: bounded,
        });
    }
    Ok(())
}

fn start_agent_process(
    sandbox: &dyn Sandbox,
    manifest: &Manifest,
    env_bindings: &[EnvBinding],
    session_token: String,
    config: &SupervisorConfig,
) -> SupervisorResult<Box<dyn crate::provider::CommandHandle>> {
    let run_command = manifest
        .runtime
        .run_command
        .clone()
        .unwrap_or_else(|| manifest.runtime.entry_point.clone().unwrap_or_default());

    let mut env_prefix = String::new();
    for binding in env_bindings {
        env_prefix.push_str(&format!("{}={} ", binding.token_env_var, shell_quote(&session_token)));
        if let Some(base_url_env) = &binding.base_url_env_var {
            let base_url = format!("http://127.0.0.1:{}", binding.loopback_port);
            env_prefix.push_str(&format!("{}={} ", base_url_env, shell_quote(&base_url)));
        }
    }

    let command_line = format!("{env_prefix}{run_command}");

    sandbox
        .run_command(
            &command_line,
            CommandOptions {
                user: Some(config.agent_user.clone()),
                background: true,
                ..CommandOptions::default()
            },
        )
        .map_err(SupervisorError::from)
}

/// Single-quote `value`, escaping embedded single quotes, to defend
/// against shell metacharacters in the generated env prefix.
fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_manifest::types::{DelegationPermission, Identity, KeyRequirement, NetworkPermission, Permissions, Runtime};

    fn manifest_with(permissions: Permissions, keys: Vec<KeyRequirement>) -> Manifest {
        Manifest {
            identity: Identity {
                name: "test-agent".to_owned(),
                ..Identity::default()
            },
            runtime: Runtime::default(),
            resources: warden_manifest::types::Resources::default(),
            permissions,
            keys,
        }
    }

    #[test]
    fn unrestricted_manifest_gets_unrestricted_policy() {
        let manifest = manifest_with(
            Permissions {
                unrestricted: true,
                ..Permissions::default()
            },
            vec![],
        );
        let policy = compute_network_policy(&manifest);
        assert!(!policy.is_restricted());
    }

    #[test]
    fn restricted_policy_includes_declared_and_known_provider_domains() {
        let manifest = manifest_with(
            Permissions {
                network: vec![NetworkPermission {
                    domain: "example.com".to_owned(),
                    reason: "widget API".to_owned(),
                }],
                ..Permissions::default()
            },
            vec![KeyRequirement {
                provider: "anthropic".to_owned(),
                ..KeyRequirement::default()
            }],
        );
        let policy = compute_network_policy(&manifest);
        assert!(policy.is_restricted());
        assert!(policy.allow_out.contains(&"example.com".to_owned()));
        assert!(policy.allow_out.contains(&"api.anthropic.com".to_owned()));
    }

    #[test]
    fn setup_command_presence_allows_package_registries() {
        let manifest = Manifest {
            runtime: Runtime {
                setup_command: Some("pip install -r requirements.txt".to_owned()),
                ..Runtime::default()
            },
            ..manifest_with(Permissions::default(), vec![])
        };
        let policy = compute_network_policy(&manifest);
        assert!(policy.allow_out.contains(&"pypi.org".to_owned()));
    }

    #[test]
    fn unknown_provider_custom_domain_is_not_auto_allowed() {
        let manifest = manifest_with(
            Permissions::default(),
            vec![KeyRequirement {
                provider: "acme-llm".to_owned(),
                domain: Some("api.acme-llm.example".to_owned()),
                ..KeyRequirement::default()
            }],
        );
        let policy = compute_network_policy(&manifest);
        assert!(!policy.allow_out.contains(&"api.acme-llm.example".to_owned()));
    }

    #[test]
    fn shell_quote_escapes_embedded_single_quotes() {
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
    }

    #[test]
    fn delegation_disabled_manifest_has_no_allowed_agents_by_default() {
        let manifest = manifest_with(Permissions::default(), vec![]);
        assert!(!manifest.permissions.delegation.enabled);
        assert!(manifest.permissions.delegation.allowed_agents.is_empty());
        let _ = DelegationPermission::default();
    }
}
