//! Schema-level and cross-field manifest validation.
//!
//! Every check here runs before a sandbox exists. A manifest that fails
//! any of them is rejected wholesale — there is no partial acceptance.

use std::collections::HashMap;
use std::path::Path;

use regex::Regex;
use std::sync::LazyLock;

use crate::error::{ManifestError, ManifestResult};
use crate::known_providers::{self, KNOWN_PROVIDERS};
use crate::types::{AuthStyle, Manifest};

static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z][a-z0-9-]*[a-z0-9]$").unwrap());
static PROVIDER_ID_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-z][a-z0-9-]*$").unwrap());
static ENV_VAR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Z][A-Z0-9_]*$").unwrap());
static HEADER_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9-]+$").unwrap());

/// Built-in sandbox template allowlist.
const SANDBOX_TEMPLATES: &[&str] = &["default", "python-3.12", "node-20", "minimal"];

/// Env-var names no manifest may claim, regardless of provider.
const PROTECTED_ENV_VARS: &[&str] = &[
    "PATH", "HOME", "USER", "SHELL", "LANG", "LC_ALL", "LC_CTYPE", "TERM", "TZ", "PYTHONPATH",
    "NODE_PATH",
];

fn is_protected_env_var(name: &str) -> bool {
    PROTECTED_ENV_VARS.contains(&name) || name.starts_with("LD_")
}

/// Validate a parsed manifest, optionally against a bundle root directory
/// (used to check the `dependencies` file actually exists).
///
/// # Errors
///
/// Returns [`ManifestError::SchemaError`] describing the first failing
/// invariant.
pub fn validate(manifest: &Manifest, bundle_root: Option<&Path>) -> ManifestResult<()> {
    validate_name(manifest)?;
    validate_entry_point(manifest)?;
    validate_dependencies(manifest, bundle_root)?;
    validate_sandbox_template(manifest)?;
    validate_keys(manifest)?;
    Ok(())
}

fn schema_err(message: impl Into<String>) -> ManifestError {
    ManifestError::SchemaError(message.into())
}

/// 1. Agent name matches the identifier regex, length 3-40.
fn validate_name(manifest: &Manifest) -> ManifestResult<()> {
    let name = &manifest.identity.name;
    if !(3..=40).contains(&name.len()) || !NAME_RE.is_match(name) {
        return Err(schema_err(format!(
            "identity.name '{name}' must match ^[a-z][a-z0-9-]*[a-z0-9]$ with length 3-40"
        )));
    }
    Ok(())
}

/// 2. Runtime specifies at least one of entry point or run command.
fn validate_entry_point(manifest: &Manifest) -> ManifestResult<()> {
    if manifest.runtime.entry_point.is_none() && manifest.runtime.run_command.is_none() {
        return Err(schema_err(
            "runtime must specify at least one of entry_point or run_command",
        ));
    }
    Ok(())
}

/// 3. Declared dependencies file exists in the bundle.
fn validate_dependencies(manifest: &Manifest, bundle_root: Option<&Path>) -> ManifestResult<()> {
    let Some(deps) = &manifest.runtime.dependencies else {
        return Ok(());
    };
    let Some(root) = bundle_root else {
        return Ok(());
    };
    let path = root.join(deps);
    if !path.is_file() {
        return Err(schema_err(format!(
            "runtime.dependencies '{deps}' does not resolve to a readable file in the bundle"
        )));
    }
    Ok(())
}

/// 4. Sandbox template is in the built-in allowlist.
fn validate_sandbox_template(manifest: &Manifest) -> ManifestResult<()> {
    let template = manifest.runtime.sandbox_template.as_str();
    if !SANDBOX_TEMPLATES.contains(&template) {
        return Err(schema_err(format!(
            "runtime.sandbox_template '{template}' is not in the allowlist {SANDBOX_TEMPLATES:?}"
        )));
    }
    Ok(())
}

/// 5-8. Per-key-requirement schema checks, plus the cross-requirement
/// collision and known-provider checks.
fn validate_keys(manifest: &Manifest) -> ManifestResult<()> {
    let mut token_claims: HashMap<String, usize> = HashMap::new();
    let mut base_url_claims: HashMap<String, usize> = HashMap::new();

    for (idx, key) in manifest.keys.iter().enumerate() {
        // 5a. provider id shape.
        if !PROVIDER_ID_RE.is_match(&key.provider) {
            return Err(schema_err(format!(
                "keys[{idx}].provider '{}' must match ^[a-z][a-z0-9-]*$",
                key.provider
            )));
        }

        let token_env_var = key.token_env_var();
        if !ENV_VAR_RE.is_match(&token_env_var) || is_protected_env_var(&token_env_var) {
            return Err(schema_err(format!(
                "keys[{idx}] resolved token env-var '{token_env_var}' is malformed or protected"
            )));
        }

        // 5b. upstream domain, for unknown providers only — known providers
        // have theirs forced below regardless of what's declared.
        let is_known = known_providers::lookup(&key.provider).is_some();

        if let Some(base_url_var) = &key.base_url_env_var {
            if !ENV_VAR_RE.is_match(base_url_var) || is_protected_env_var(base_url_var) {
                return Err(schema_err(format!(
                    "keys[{idx}].base_url_env_var '{base_url_var}' is malformed or protected"
                )));
            }
            if !is_known && known_providers::is_reserved_env_var(base_url_var) {
                return Err(schema_err(format!(
                    "keys[{idx}] provider '{}' is unknown but claims base_url_env_var '{base_url_var}', which is reserved by a known provider",
                    key.provider
                )));
            }
        }

        if !is_known {
            if let Some(domain) = &key.domain {
                if !is_valid_fqdn(domain) {
                    return Err(schema_err(format!(
                        "keys[{idx}].domain '{domain}' must be a non-IP FQDN"
                    )));
                }
            }
        }

        // 5c. auth style.
        if let AuthStyle::Header(name) = &key.auth_style {
            if !HEADER_NAME_RE.is_match(name) {
                return Err(schema_err(format!(
                    "keys[{idx}].auth_style header name '{name}' is not a syntactically valid header name"
                )));
            }
        }

        // 6. no two requirements share a token env-var or base-url env-var.
        if let Some(prior) = token_claims.insert(token_env_var.clone(), idx) {
            return Err(schema_err(format!(
                "keys[{idx}] and keys[{prior}] both resolve to token env-var '{token_env_var}'"
            )));
        }
        if let Some(base_url_var) = &key.base_url_env_var {
            if let Some(prior) = base_url_claims.insert(base_url_var.clone(), idx) {
                return Err(schema_err(format!(
                    "keys[{idx}] and keys[{prior}] both resolve to base-url env-var '{base_url_var}'"
                )));
            }
        }

        // 8. unknown providers cannot harvest a known provider's env-var.
        if !is_known && known_providers::is_reserved_env_var(&token_env_var) {
            return Err(schema_err(format!(
                "keys[{idx}] provider '{}' is unknown but claims env-var '{token_env_var}', which is reserved by a known provider",
                key.provider
            )));
        }
    }

    Ok(())
}

/// The effective upstream domain for a key requirement: the manifest's
/// declared domain for unknown providers, or the built-in value for known
/// providers regardless of what the manifest declares.
#[must_use]
pub fn effective_domain(key: &crate::types::KeyRequirement) -> Option<String> {
    if let Some(known) = known_providers::lookup(&key.provider) {
        return Some(known.domain.to_owned());
    }
    key.domain.clone()
}

fn is_valid_fqdn(domain: &str) -> bool {
    if !domain.contains('.') {
        return false;
    }
    if domain.parse::<std::net::IpAddr>().is_ok() {
        return false;
    }
    domain.chars().any(|c| c.is_ascii_alphabetic())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::KeyRequirement;

    fn valid_manifest() -> Manifest {
        let mut m = Manifest::default();
        m.identity.name = "my-agent".to_owned();
        m.runtime.run_command = Some("python3 run.py".to_owned());
        m
    }

    #[test]
    fn valid_manifest_passes() {
        assert!(validate(&valid_manifest(), None).is_ok());
    }

    #[test]
    fn rejects_short_name() {
        let mut m = valid_manifest();
        m.identity.name = "ab".to_owned();
        assert!(validate(&m, None).is_err());
    }

    #[test]
    fn rejects_missing_entry_point_and_run_command() {
        let mut m = valid_manifest();
        m.runtime.run_command = None;
        assert!(validate(&m, None).is_err());
    }

    #[test]
    fn rejects_missing_dependencies_file() {
        let mut m = valid_manifest();
        m.runtime.dependencies = Some("requirements.txt".to_owned());
        let dir = tempfile::tempdir().unwrap();
        assert!(validate(&m, Some(dir.path())).is_err());
    }

    #[test]
    fn accepts_existing_dependencies_file() {
        let mut m = valid_manifest();
        m.runtime.dependencies = Some("requirements.txt".to_owned());
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("requirements.txt"), "anthropic\n").unwrap();
        assert!(validate(&m, Some(dir.path())).is_ok());
    }

    #[test]
    fn rejects_unknown_sandbox_template() {
        let mut m = valid_manifest();
        m.runtime.sandbox_template = "rootkit-special".to_owned();
        assert!(validate(&m, None).is_err());
    }

    #[test]
    fn rejects_colliding_env_vars() {
        let mut m = valid_manifest();
        m.keys.push(KeyRequirement {
            provider: "unknown-a".to_owned(),
            env_var: Some("SHARED_API_KEY".to_owned()),
            ..KeyRequirement::default()
        });
        m.keys.push(KeyRequirement {
            provider: "unknown-b".to_owned(),
            env_var: Some("SHARED_API_KEY".to_owned()),
            ..KeyRequirement::default()
        });
        assert!(validate(&m, None).is_err());
    }

    #[test]
    fn rejects_unknown_provider_claiming_known_env_var() {
        let mut m = valid_manifest();
        m.keys.push(KeyRequirement {
            provider: "evil".to_owned(),
            env_var: Some("ANTHROPIC_API_KEY".to_owned()),
            ..KeyRequirement::default()
        });
        assert!(validate(&m, None).is_err());
    }

    #[test]
    fn rejects_unknown_provider_claiming_known_base_url_env_var() {
        let mut m = valid_manifest();
        m.keys.push(KeyRequirement {
            provider: "evil".to_owned(),
            env_var: Some("EVIL_API_KEY".to_owned()),
            base_url_env_var: Some("ANTHROPIC_BASE_URL".to_owned()),
            ..KeyRequirement::default()
        });
        assert!(validate(&m, None).is_err());
    }

    #[test]
    fn known_provider_domain_override_is_ignored_by_effective_domain() {
        let key = KeyRequirement {
            provider: "anthropic".to_owned(),
            domain: Some("attacker.example".to_owned()),
            ..KeyRequirement::default()
        };
        assert_eq!(effective_domain(&key).as_deref(), Some("api.anthropic.com"));
    }

    #[test]
    fn rejects_ip_literal_domain_for_unknown_provider() {
        let mut m = valid_manifest();
        m.keys.push(KeyRequirement {
            provider: "custom-llm".to_owned(),
            domain: Some("10.0.0.1".to_owned()),
            ..KeyRequirement::default()
        });
        assert!(validate(&m, None).is_err());
    }

    #[test]
    fn rejects_protected_env_var() {
        let mut m = valid_manifest();
        m.keys.push(KeyRequirement {
            provider: "custom-llm".to_owned(),
            env_var: Some("PATH".to_owned()),
            ..KeyRequirement::default()
        });
        assert!(validate(&m, None).is_err());
    }

    #[test]
    fn all_known_providers_are_self_consistent() {
        for provider in KNOWN_PROVIDERS {
            assert!(PROVIDER_ID_RE.is_match(provider.id));
            assert!(ENV_VAR_RE.is_match(provider.env_var));
        }
    }
}
