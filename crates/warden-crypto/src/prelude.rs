//! Commonly used types for convenient import.

pub use crate::aead::{SealedBox, VaultCipher};
pub use crate::error::{CryptoError, CryptoResult};
pub use crate::hash::ContentHash;
pub use crate::kdf::{PBKDF2_MIN_ITERATIONS, VaultKey};
pub use crate::keypair::{KeyPair, PublicKey};
pub use crate::signature::Signature;
