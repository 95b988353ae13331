//! Vault entry and summary types.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A (provider, id, created-at, last-used-at) tuple, as returned by
/// [`crate::Vault::list`]. Never carries the secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialSummary {
    /// Provider identifier (e.g. `"anthropic"`).
    pub provider: String,
    /// Entry id within the provider (defaults to the provider id itself).
    pub id: String,
    /// When this entry was first added.
    pub created_at: DateTime<Utc>,
    /// When this entry was last read via `get`, if ever.
    pub last_used_at: Option<DateTime<Utc>>,
}

/// The environment variable name a provider's key is materialized under.
///
/// Conventional form: provider id uppercased, hyphens replaced with
/// underscores, suffixed with `_API_KEY`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EnvVarName(String);

impl EnvVarName {
    /// Derive the conventional env-var name for a provider id.
    #[must_use]
    pub fn for_provider(provider: &str) -> Self {
        Self(format!("{}_API_KEY", provider.to_uppercase().replace('-', "_")))
    }

    /// Borrow the env-var name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EnvVarName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An on-disk vault entry: ciphertext plus the bookkeeping metadata that is
/// safe to keep unencrypted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct VaultEntry {
    pub provider: String,
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
    pub sealed: warden_crypto::SealedBox,
}

impl From<&VaultEntry> for CredentialSummary {
    fn from(entry: &VaultEntry) -> Self {
        Self {
            provider: entry.provider.clone(),
            id: entry.id.clone(),
            created_at: entry.created_at,
            last_used_at: entry.last_used_at,
        }
    }
}

/// On-disk vault document: format version, salt, and entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct VaultFile {
    pub version: u32,
    #[serde(with = "hex_salt")]
    pub salt: [u8; warden_crypto::kdf::VAULT_SALT_LEN],
    pub iterations: u32,
    pub entries: Vec<VaultEntry>,
}

/// Current on-disk format version. Bumped whenever the entry or file shape
/// changes in a way that isn't backward compatible.
pub(crate) const CURRENT_VERSION: u32 = 1;

mod hex_salt {
    use serde::{Deserialize, Deserializer, Serializer};
    use warden_crypto::kdf::VAULT_SALT_LEN;

    pub fn serialize<S: Serializer>(
        salt: &[u8; VAULT_SALT_LEN],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(salt))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<[u8; VAULT_SALT_LEN], D::Error> {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(s).map_err(serde::de::Error::custom)?;
        bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("unexpected salt length"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_var_name_uppercases_and_replaces_hyphens() {
        assert_eq!(
            EnvVarName::for_provider("openai-compat").as_str(),
            "OPENAI_COMPAT_API_KEY"
        );
        assert_eq!(EnvVarName::for_provider("anthropic").as_str(), "ANTHROPIC_API_KEY");
    }
}
