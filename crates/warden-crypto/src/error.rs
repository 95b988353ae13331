//! Cryptographic error types.

use thiserror::Error;

/// Errors that can occur during cryptographic operations.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Invalid key length.
    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength {
        /// Expected length in bytes.
        expected: usize,
        /// Actual length in bytes.
        actual: usize,
    },

    /// Invalid signature length.
    #[error("invalid signature length: expected {expected}, got {actual}")]
    InvalidSignatureLength {
        /// Expected length in bytes.
        expected: usize,
        /// Actual length in bytes.
        actual: usize,
    },

    /// Signature verification failed.
    #[error("signature verification failed")]
    SignatureVerificationFailed,

    /// Invalid hex encoding.
    #[error("invalid hex encoding")]
    InvalidHexEncoding,

    /// Invalid base64 encoding.
    #[error("invalid base64 encoding")]
    InvalidBase64Encoding,

    /// Authenticated decryption failed: wrong key, wrong passphrase, or the
    /// ciphertext was tampered with. Deliberately does not distinguish these
    /// cases from one another.
    #[error("decryption failed")]
    DecryptionFailed,

    /// The requested PBKDF2 iteration count is below the accepted minimum.
    #[error("iteration count {actual} is below the minimum of {minimum}")]
    IterationCountTooLow {
        /// Iteration count that was requested.
        actual: u32,
        /// Minimum accepted iteration count.
        minimum: u32,
    },
}

/// Result type for cryptographic operations.
pub type CryptoResult<T> = Result<T, CryptoError>;
