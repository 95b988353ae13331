//! Key derivation for the credential vault.
//!
//! The vault's encryption key is derived with PBKDF2-HMAC-SHA256 from
//! `"<machine-id>:<passphrase>"` and a random per-file salt. This ties a
//! vault file to the machine it was created on: copying `keys.enc` to
//! another host without also reproducing its machine id makes every
//! credential unrecoverable even with the right passphrase.

use hmac::Hmac;
use pbkdf2::pbkdf2;
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{CryptoError, CryptoResult};

/// Minimum accepted PBKDF2 iteration count. Below this, a vault file is
/// rejected rather than silently weakened.
pub const PBKDF2_MIN_ITERATIONS: u32 = 600_000;

/// Size in bytes of the derived vault key (AES-128-GCM key size).
pub const VAULT_KEY_LEN: usize = 16;

/// Size in bytes of the random salt stored alongside a vault file.
pub const VAULT_SALT_LEN: usize = 16;

/// A derived vault encryption key. Zeroized on drop.
#[derive(ZeroizeOnDrop)]
pub struct VaultKey([u8; VAULT_KEY_LEN]);

impl VaultKey {
    /// Derive a vault key from a machine id, passphrase, salt, and
    /// iteration count.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::IterationCountTooLow`] if `iterations` is
    /// below [`PBKDF2_MIN_ITERATIONS`].
    pub fn derive(
        machine_id: &str,
        passphrase: &str,
        salt: &[u8; VAULT_SALT_LEN],
        iterations: u32,
    ) -> CryptoResult<Self> {
        if iterations < PBKDF2_MIN_ITERATIONS {
            return Err(CryptoError::IterationCountTooLow {
                actual: iterations,
                minimum: PBKDF2_MIN_ITERATIONS,
            });
        }

        let mut input = format!("{machine_id}:{passphrase}").into_bytes();
        let mut key = [0u8; VAULT_KEY_LEN];
        pbkdf2::<Hmac<Sha256>>(&input, salt, iterations, &mut key)
            .expect("HMAC can be initialized with any key length");
        input.zeroize();

        Ok(Self(key))
    }

    /// Borrow the raw key bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; VAULT_KEY_LEN] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_inputs_derive_the_same_key() {
        let salt = [7u8; VAULT_SALT_LEN];
        let a = VaultKey::derive("machine-1", "hunter2", &salt, PBKDF2_MIN_ITERATIONS).unwrap();
        let b = VaultKey::derive("machine-1", "hunter2", &salt, PBKDF2_MIN_ITERATIONS).unwrap();
        assert_eq!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn different_machine_id_derives_a_different_key() {
        let salt = [7u8; VAULT_SALT_LEN];
        let a = VaultKey::derive("machine-1", "hunter2", &salt, PBKDF2_MIN_ITERATIONS).unwrap();
        let b = VaultKey::derive("machine-2", "hunter2", &salt, PBKDF2_MIN_ITERATIONS).unwrap();
        assert_ne!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn different_passphrase_derives_a_different_key() {
        let salt = [7u8; VAULT_SALT_LEN];
        let a = VaultKey::derive("machine-1", "hunter2", &salt, PBKDF2_MIN_ITERATIONS).unwrap();
        let b = VaultKey::derive("machine-1", "hunter3", &salt, PBKDF2_MIN_ITERATIONS).unwrap();
        assert_ne!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn rejects_weak_iteration_counts() {
        let salt = [7u8; VAULT_SALT_LEN];
        let err = VaultKey::derive("machine-1", "hunter2", &salt, 1_000).unwrap_err();
        assert!(matches!(err, CryptoError::IterationCountTooLow { .. }));
    }
}
