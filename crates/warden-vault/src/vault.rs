//! The encrypted credential vault.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::Utc;
use warden_crypto::VaultCipher;
use warden_crypto::kdf::{PBKDF2_MIN_ITERATIONS, VAULT_SALT_LEN, VaultKey};

use crate::error::{VaultError, VaultResult};
use crate::machine_id::read_machine_id;
use crate::types::{CURRENT_VERSION, CredentialSummary, EnvVarName, VaultEntry, VaultFile};

/// Associated data bound into every sealed entry, so a vault entry sealed
/// under one format version can never be mistaken for another.
fn associated_data(version: u32) -> Vec<u8> {
    format!("warden-vault-v{version}").into_bytes()
}

/// The encrypted, append-on-write credential store.
///
/// One `Vault` wraps one file on disk. All operations re-read and
/// re-persist the full entry list; this is the same trade-off the rest of
/// the supervisor makes for its small, infrequently-written state files —
/// simplicity over throughput, since write volume here is "a human adds a
/// key now and then."
pub struct Vault {
    path: PathBuf,
    cipher: VaultCipher,
    version: u32,
    salt: [u8; VAULT_SALT_LEN],
    iterations: u32,
    entries: Vec<VaultEntry>,
}

impl Vault {
    /// Open the vault file at `path`, deriving the decryption key from the
    /// current machine id and `passphrase`. If the file does not exist yet,
    /// a fresh vault is initialized with a new random salt and
    /// [`PBKDF2_MIN_ITERATIONS`] iterations.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::MachineIdUnavailable`] if the machine id
    /// cannot be read, [`VaultError::Corrupt`] if an existing file fails to
    /// parse, or [`VaultError::DecryptionFailed`] if any existing entry
    /// cannot be decrypted with the derived key.
    pub fn open(path: impl Into<PathBuf>, passphrase: &str) -> VaultResult<Self> {
        let path = path.into();
        let machine_id = read_machine_id()?;

        if path.exists() {
            let raw = std::fs::read_to_string(&path)?;
            let file: VaultFile = serde_json::from_str(&raw)
                .map_err(|e| VaultError::Corrupt(e.to_string()))?;
            if file.version != CURRENT_VERSION {
                return Err(VaultError::Corrupt(format!(
                    "unsupported vault format version {}",
                    file.version
                )));
            }
            let key = VaultKey::derive(&machine_id, passphrase, &file.salt, file.iterations)
                .map_err(|_| VaultError::DecryptionFailed)?;
            let cipher = VaultCipher::new(&key);

            // Fail fast on open: a vault whose entries can't be decrypted
            // surfaces the problem immediately rather than on first `get`.
            let aad = associated_data(file.version);
            for entry in &file.entries {
                cipher
                    .open(&entry.sealed, &aad)
                    .map_err(|_| VaultError::DecryptionFailed)?;
            }

            Ok(Self {
                path,
                cipher,
                version: file.version,
                salt: file.salt,
                iterations: file.iterations,
                entries: file.entries,
            })
        } else {
            let mut salt = [0u8; VAULT_SALT_LEN];
            getrandom_fill(&mut salt);
            let iterations = PBKDF2_MIN_ITERATIONS;
            let key = VaultKey::derive(&machine_id, passphrase, &salt, iterations)
                .map_err(|_| VaultError::DecryptionFailed)?;
            Ok(Self {
                path,
                cipher: VaultCipher::new(&key),
                version: CURRENT_VERSION,
                salt,
                iterations,
                entries: Vec::new(),
            })
        }
    }

    /// Upsert an entry keyed by `(provider, id)`; `id` defaults to
    /// `provider`. Persists immediately and sets the file's permissions to
    /// `0600`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn add(&mut self, provider: &str, key: &str, id: Option<&str>) -> VaultResult<()> {
        let id = id.unwrap_or(provider).to_owned();
        let sealed = self.cipher.seal(key.as_bytes(), &associated_data(self.version));
        let now = Utc::now();

        if let Some(existing) = self
            .entries
            .iter_mut()
            .find(|e| e.provider == provider && e.id == id)
        {
            existing.sealed = sealed;
        } else {
            self.entries.push(VaultEntry {
                provider: provider.to_owned(),
                id,
                created_at: now,
                last_used_at: None,
                sealed,
            });
        }

        self.persist()?;
        tracing::info!(provider, "vault entry added");
        Ok(())
    }

    /// Retrieve a plaintext secret, updating `last_used_at`.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::DecryptionFailed`] if the stored ciphertext
    /// cannot be decrypted with the current derived key.
    pub fn get(&mut self, provider: &str, id: Option<&str>) -> VaultResult<Option<String>> {
        let id = id.unwrap_or(provider).to_owned();
        let version = self.version;
        let Some(entry) = self
            .entries
            .iter_mut()
            .find(|e| e.provider == provider && e.id == id)
        else {
            return Ok(None);
        };

        let plaintext = self
            .cipher
            .open(&entry.sealed, &associated_data(version))
            .map_err(|_| {
                tracing::error!(provider, "vault decryption failed");
                VaultError::DecryptionFailed
            })?;
        entry.last_used_at = Some(Utc::now());
        self.persist()?;

        String::from_utf8(plaintext).map(Some).map_err(|_| {
            VaultError::Corrupt("decrypted secret was not valid UTF-8".to_owned())
        })
    }

    /// Remove an entry, returning whether one existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn remove(&mut self, provider: &str, id: Option<&str>) -> VaultResult<bool> {
        let id = id.unwrap_or(provider).to_owned();
        let before = self.entries.len();
        self.entries
            .retain(|e| !(e.provider == provider && e.id == id));
        let removed = self.entries.len() != before;
        if removed {
            self.persist()?;
            tracing::info!(provider, "vault entry removed");
        }
        Ok(removed)
    }

    /// List every entry's metadata. Never includes the secret.
    #[must_use]
    pub fn list(&self) -> Vec<CredentialSummary> {
        self.entries.iter().map(CredentialSummary::from).collect()
    }

    /// Materialize declared providers into `{env-var-name -> secret}`.
    /// Providers with no stored entry are silently omitted.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::DecryptionFailed`] if any declared provider's
    /// entry cannot be decrypted.
    pub fn env_map(&mut self, providers: &[&str]) -> VaultResult<HashMap<String, String>> {
        let mut map = HashMap::new();
        for provider in providers {
            if let Some(secret) = self.get(provider, None)? {
                map.insert(EnvVarName::for_provider(provider).as_str().to_owned(), secret);
            }
        }
        Ok(map)
    }

    fn persist(&self) -> VaultResult<()> {
        let file = VaultFile {
            version: self.version,
            salt: self.salt,
            iterations: self.iterations,
            entries: self.entries.clone(),
        };
        let json = serde_json::to_string_pretty(&file)?;
        std::fs::write(&self.path, json)?;
        set_owner_only_permissions(&self.path)?;
        Ok(())
    }
}

#[cfg(unix)]
fn set_owner_only_permissions(path: &Path) -> VaultResult<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    Ok(())
}

#[cfg(not(unix))]
fn set_owner_only_permissions(_path: &Path) -> VaultResult<()> {
    Ok(())
}

fn getrandom_fill(buf: &mut [u8]) {
    use rand::RngCore;
    rand::rngs::OsRng.fill_bytes(buf);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vault_path() -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keys.enc");
        (dir, path)
    }

    #[test]
    fn add_then_get_roundtrips() {
        let (_dir, path) = vault_path();
        let mut vault = Vault::open(&path, "hunter2").unwrap();
        vault.add("anthropic", "sk-ant-secret", None).unwrap();
        assert_eq!(
            vault.get("anthropic", None).unwrap(),
            Some("sk-ant-secret".to_owned())
        );
    }

    #[test]
    fn get_missing_entry_returns_none() {
        let (_dir, path) = vault_path();
        let mut vault = Vault::open(&path, "hunter2").unwrap();
        assert_eq!(vault.get("nobody", None).unwrap(), None);
    }

    #[test]
    fn add_upserts_existing_entry() {
        let (_dir, path) = vault_path();
        let mut vault = Vault::open(&path, "hunter2").unwrap();
        vault.add("anthropic", "key-one", None).unwrap();
        vault.add("anthropic", "key-two", None).unwrap();
        assert_eq!(vault.list().len(), 1);
        assert_eq!(vault.get("anthropic", None).unwrap(), Some("key-two".to_owned()));
    }

    #[test]
    fn remove_reports_whether_entry_existed() {
        let (_dir, path) = vault_path();
        let mut vault = Vault::open(&path, "hunter2").unwrap();
        vault.add("anthropic", "key", None).unwrap();
        assert!(vault.remove("anthropic", None).unwrap());
        assert!(!vault.remove("anthropic", None).unwrap());
    }

    #[test]
    fn list_never_exposes_secrets() {
        let (_dir, path) = vault_path();
        let mut vault = Vault::open(&path, "hunter2").unwrap();
        vault.add("anthropic", "sk-ant-very-secret", None).unwrap();
        let summaries = vault.list();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].provider, "anthropic");
        let debug = format!("{summaries:?}");
        assert!(!debug.contains("sk-ant-very-secret"));
    }

    #[test]
    fn env_map_uses_conventional_names() {
        let (_dir, path) = vault_path();
        let mut vault = Vault::open(&path, "hunter2").unwrap();
        vault.add("anthropic", "sk-ant", None).unwrap();
        vault.add("openai-compat", "sk-oai", None).unwrap();
        let map = vault.env_map(&["anthropic", "openai-compat", "missing"]).unwrap();
        assert_eq!(map.get("ANTHROPIC_API_KEY"), Some(&"sk-ant".to_owned()));
        assert_eq!(map.get("OPENAI_COMPAT_API_KEY"), Some(&"sk-oai".to_owned()));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn wrong_passphrase_surfaces_decryption_failure_on_open() {
        let (_dir, path) = vault_path();
        {
            let mut vault = Vault::open(&path, "correct-horse").unwrap();
            vault.add("anthropic", "secret", None).unwrap();
        }
        let err = Vault::open(&path, "wrong-passphrase").unwrap_err();
        assert!(matches!(err, VaultError::DecryptionFailed));
    }

    #[test]
    fn reopening_with_same_passphrase_preserves_entries() {
        let (_dir, path) = vault_path();
        {
            let mut vault = Vault::open(&path, "hunter2").unwrap();
            vault.add("anthropic", "secret", None).unwrap();
        }
        let mut reopened = Vault::open(&path, "hunter2").unwrap();
        assert_eq!(reopened.get("anthropic", None).unwrap(), Some("secret".to_owned()));
    }

    #[test]
    fn persisted_entries_never_contain_plaintext() {
        let (_dir, path) = vault_path();
        let mut vault = Vault::open(&path, "hunter2").unwrap();
        vault.add("anthropic", "sk-ant-plaintext-marker", None).unwrap();
        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(!raw.contains("sk-ant-plaintext-marker"));
    }

    #[cfg(unix)]
    #[test]
    fn vault_file_is_mode_0600() {
        use std::os::unix::fs::PermissionsExt;
        let (_dir, path) = vault_path();
        let mut vault = Vault::open(&path, "hunter2").unwrap();
        vault.add("anthropic", "secret", None).unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn custom_id_distinguishes_entries_for_the_same_provider() {
        let (_dir, path) = vault_path();
        let mut vault = Vault::open(&path, "hunter2").unwrap();
        vault.add("anthropic", "key-work", Some("work")).unwrap();
        vault.add("anthropic", "key-personal", Some("personal")).unwrap();
        assert_eq!(vault.list().len(), 2);
        assert_eq!(
            vault.get("anthropic", Some("work")).unwrap(),
            Some("key-work".to_owned())
        );
        assert_eq!(
            vault.get("anthropic", Some("personal")).unwrap(),
            Some("key-personal".to_owned())
        );
    }
}
