//! Fixtures for common types: manifests, vaults, and home directories.

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use warden_core::dirs::WardenHome;
use warden_manifest::loader;
use warden_manifest::types::Manifest;
use warden_vault::Vault;

/// A sample `warden.toml` body that passes validation: a minimal shell
/// agent with no declared keys or network permissions.
pub const SAMPLE_MANIFEST_TOML: &str = r#"
name = "sample-agent"
display_name = "Sample Agent"
version = "0.1.0"
description = "A fixture agent for tests."

[runtime]
language = "python"
run_command = "python agent.py"
sandbox_template = "default"

[resources]
memory_mb = 512
cpu_count = 1
max_duration_secs = 600

[permissions]
unrestricted = false
workspace_access = true
"#;

/// A bundle directory holding [`SAMPLE_MANIFEST_TOML`], plus the
/// [`TempDir`] guard that must stay alive for the bundle to exist.
#[must_use]
pub fn sample_bundle_dir() -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("failed to create temp bundle dir");
    write_manifest(dir.path(), SAMPLE_MANIFEST_TOML);
    let path = dir.path().to_path_buf();
    (dir, path)
}

/// Write `toml` as `warden.toml` into `bundle_dir`.
pub fn write_manifest(bundle_dir: &Path, toml: &str) {
    std::fs::write(bundle_dir.join("warden.toml"), toml).expect("failed to write fixture manifest");
}

/// Load [`SAMPLE_MANIFEST_TOML`] into a validated [`Manifest`].
#[must_use]
pub fn sample_manifest() -> Manifest {
    let (_guard, bundle_dir) = sample_bundle_dir();
    loader::load_dir(&bundle_dir).expect("sample manifest fixture must validate")
}

/// A manifest declaring one `anthropic` key requirement and delegation to
/// a single allowed agent, still parsed through the real loader/validator.
#[must_use]
pub fn sample_manifest_with_anthropic_key() -> Manifest {
    let toml = format!(
        "{SAMPLE_MANIFEST_TOML}\n[[keys]]\nprovider = \"anthropic\"\nrequired = true\n\n[permissions.delegation]\nenabled = true\nallowed_agents = [\"helper-agent\"]\n"
    );
    let (_guard, bundle_dir) = {
        let dir = tempfile::tempdir().expect("failed to create temp bundle dir");
        write_manifest(dir.path(), &toml);
        let path = dir.path().to_path_buf();
        (dir, path)
    };
    loader::load_dir(&bundle_dir).expect("anthropic-key manifest fixture must validate")
}

/// A fresh [`WardenHome`] rooted at a temp directory, already `ensure()`d.
/// The returned [`TempDir`] must stay alive for the home directory to
/// exist.
#[must_use]
pub fn temp_data_root() -> (TempDir, WardenHome) {
    let dir = tempfile::tempdir().expect("failed to create temp warden home");
    let home = WardenHome::from_path(dir.path());
    home.ensure().expect("failed to initialize temp warden home");
    (dir, home)
}

/// A freshly opened, empty [`Vault`] backed by a temp file, plus its
/// passphrase.
#[must_use]
pub fn temp_vault() -> (TempDir, Vault, &'static str) {
    let dir = tempfile::tempdir().expect("failed to create temp vault dir");
    let passphrase = "test-passphrase-do-not-use-in-prod";
    let vault = Vault::open(dir.path().join("keys.enc"), passphrase).expect("failed to open temp vault");
    (dir, vault, passphrase)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_manifest_loads_and_validates() {
        let manifest = sample_manifest();
        assert_eq!(manifest.identity.name, "sample-agent");
    }

    #[test]
    fn sample_manifest_with_anthropic_key_declares_delegation() {
        let manifest = sample_manifest_with_anthropic_key();
        assert_eq!(manifest.keys.len(), 1);
        assert!(manifest.permissions.delegation.enabled);
        assert_eq!(manifest.permissions.delegation.allowed_agents, vec!["helper-agent".to_owned()]);
    }

    #[test]
    fn temp_data_root_creates_expected_tree() {
        let (_guard, home) = temp_data_root();
        assert!(home.manifests_dir().is_dir());
        assert!(home.sessions_dir().is_dir());
    }

    #[test]
    fn temp_vault_starts_empty() {
        let (_guard, vault, _passphrase) = temp_vault();
        assert!(vault.list().is_empty());
    }
}
