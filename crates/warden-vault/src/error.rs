//! Vault error types.

use thiserror::Error;

/// Errors that can occur while operating the credential vault.
#[derive(Debug, Error)]
pub enum VaultError {
    /// I/O error reading or writing the vault file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The vault file exists but its contents are not a valid vault
    /// document (wrong format version, truncated, or corrupt JSON).
    #[error("vault file is corrupt: {0}")]
    Corrupt(String),

    /// The stored ciphertext could not be decrypted with the key derived
    /// from the current machine id and passphrase. Surfaced rather than
    /// masked, per the vault's contract — typically means the file was
    /// moved to a different machine.
    #[error("decryption failed: wrong passphrase, or vault file moved to a different machine")]
    DecryptionFailed,

    /// The platform-specific machine id facility could not be read.
    #[error("could not read machine id: {0}")]
    MachineIdUnavailable(String),

    /// A (de)serialization error while encoding/decoding a vault entry.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for vault operations.
pub type VaultResult<T> = Result<T, VaultError>;
