//! Authenticated encryption for the credential vault.
//!
//! Wraps AES-128-GCM: a single authentication tag covers both confidentiality
//! and integrity, so there is no separate HMAC step to get wrong. Any
//! tampering with the ciphertext, the nonce, or the associated data surfaces
//! as [`CryptoError::DecryptionFailed`] rather than silently decrypting to
//! garbage.

use aes_gcm::aead::{Aead, AeadCore, KeyInit};
use aes_gcm::{Aes128Gcm, Nonce};
use rand_core::OsRng;
use serde::{Deserialize, Serialize};

use crate::error::{CryptoError, CryptoResult};
use crate::kdf::VaultKey;

/// Length in bytes of the AES-GCM nonce.
pub const NONCE_LEN: usize = 12;

/// A nonce-prefixed ciphertext, ready to be written to disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SealedBox {
    /// Randomly generated nonce, unique per encryption call.
    #[serde(with = "hex_bytes")]
    pub nonce: [u8; NONCE_LEN],
    /// Ciphertext with the GCM authentication tag appended.
    #[serde(with = "hex_vec")]
    pub ciphertext: Vec<u8>,
}

/// Encrypts and decrypts vault entries with a [`VaultKey`].
pub struct VaultCipher {
    cipher: Aes128Gcm,
}

impl VaultCipher {
    /// Build a cipher from a derived vault key.
    #[must_use]
    pub fn new(key: &VaultKey) -> Self {
        Self {
            cipher: Aes128Gcm::new_from_slice(key.as_bytes())
                .expect("VAULT_KEY_LEN matches AES-128 key size"),
        }
    }

    /// Encrypt `plaintext`, authenticating `associated_data` (e.g. the vault
    /// file's format version) without including it in the ciphertext.
    #[must_use]
    pub fn seal(&self, plaintext: &[u8], associated_data: &[u8]) -> SealedBox {
        let nonce = Aes128Gcm::generate_nonce(&mut OsRng);
        let payload = aes_gcm::aead::Payload {
            msg: plaintext,
            aad: associated_data,
        };
        let ciphertext = self
            .cipher
            .encrypt(&nonce, payload)
            .expect("encryption with a fixed-size key cannot fail");
        SealedBox {
            nonce: nonce.into(),
            ciphertext,
        }
    }

    /// Decrypt a [`SealedBox`], verifying `associated_data` matches what was
    /// sealed.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::DecryptionFailed`] if the key is wrong, the
    /// associated data doesn't match, or the ciphertext was tampered with.
    /// This is deliberately the only error variant so that no partial
    /// information about *why* decryption failed leaks to the caller.
    pub fn open(&self, sealed: &SealedBox, associated_data: &[u8]) -> CryptoResult<Vec<u8>> {
        let nonce = Nonce::from_slice(&sealed.nonce);
        let payload = aes_gcm::aead::Payload {
            msg: &sealed.ciphertext,
            aad: associated_data,
        };
        self.cipher
            .decrypt(nonce, payload)
            .map_err(|_| CryptoError::DecryptionFailed)
    }
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer, const N: usize>(
        bytes: &[u8; N],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>, const N: usize>(
        deserializer: D,
    ) -> Result<[u8; N], D::Error> {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(s).map_err(serde::de::Error::custom)?;
        bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("unexpected byte length"))
    }
}

mod hex_vec {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kdf::PBKDF2_MIN_ITERATIONS;

    fn key() -> VaultKey {
        VaultKey::derive("machine-1", "hunter2", &[3u8; 16], PBKDF2_MIN_ITERATIONS).unwrap()
    }

    #[test]
    fn seal_then_open_roundtrips() {
        let cipher = VaultCipher::new(&key());
        let sealed = cipher.seal(b"super secret", b"v1");
        assert_eq!(cipher.open(&sealed, b"v1").unwrap(), b"super secret");
    }

    #[test]
    fn open_fails_with_wrong_key() {
        let cipher_a = VaultCipher::new(&key());
        let other =
            VaultKey::derive("machine-1", "wrong-pass", &[3u8; 16], PBKDF2_MIN_ITERATIONS).unwrap();
        let cipher_b = VaultCipher::new(&other);
        let sealed = cipher_a.seal(b"super secret", b"v1");
        assert!(matches!(
            cipher_b.open(&sealed, b"v1"),
            Err(CryptoError::DecryptionFailed)
        ));
    }

    #[test]
    fn open_fails_with_mismatched_associated_data() {
        let cipher = VaultCipher::new(&key());
        let sealed = cipher.seal(b"super secret", b"v1");
        assert!(matches!(
            cipher.open(&sealed, b"v2"),
            Err(CryptoError::DecryptionFailed)
        ));
    }

    #[test]
    fn open_fails_on_tampered_ciphertext() {
        let cipher = VaultCipher::new(&key());
        let mut sealed = cipher.seal(b"super secret", b"v1");
        let last = sealed.ciphertext.len() - 1;
        sealed.ciphertext[last] ^= 0xFF;
        assert!(matches!(
            cipher.open(&sealed, b"v1"),
            Err(CryptoError::DecryptionFailed)
        ));
    }

    #[test]
    fn each_seal_uses_a_fresh_nonce() {
        let cipher = VaultCipher::new(&key());
        let a = cipher.seal(b"same plaintext", b"v1");
        let b = cipher.seal(b"same plaintext", b"v1");
        assert_ne!(a.nonce, b.nonce);
    }
}
