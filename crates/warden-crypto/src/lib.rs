//! Warden Crypto - cryptographic primitives for the sandbox supervisor.
//!
//! This crate provides:
//! - Content hashing (BLAKE3) for the audit chain
//! - Ed25519 key pairs and signatures for signing audit entries
//! - The key derivation and authenticated encryption used by the
//!   credential vault

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod aead;
pub mod error;
pub mod hash;
pub mod kdf;
pub mod keypair;
pub mod prelude;
pub mod signature;

pub use aead::{SealedBox, VaultCipher};
pub use error::{CryptoError, CryptoResult};
pub use hash::ContentHash;
pub use kdf::{PBKDF2_MIN_ITERATIONS, VaultKey};
pub use keypair::{KeyPair, PublicKey};
pub use signature::Signature;
