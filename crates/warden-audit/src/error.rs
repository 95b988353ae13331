//! Audit logging errors.

use thiserror::Error;

/// Errors that can occur with audit logging.
#[derive(Debug, Error)]
pub enum AuditError {
    /// I/O error appending to or reading the audit log file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A line in the audit log failed to deserialize.
    #[error("corrupt audit log entry: {0}")]
    Corrupt(String),

    /// Chain integrity violation: an entry's `previous_hash` does not match
    /// the content hash of the entry before it.
    #[error("chain integrity violation at entry {entry_id}: {reason}")]
    IntegrityViolation {
        /// The entry where the violation was detected.
        entry_id: String,
        /// Why the chain is invalid.
        reason: String,
    },

    /// An entry's signature does not verify against its recorded runtime
    /// public key.
    #[error("invalid signature on entry {entry_id}")]
    InvalidSignature {
        /// The entry with the invalid signature.
        entry_id: String,
    },

    /// Underlying cryptographic error.
    #[error("crypto error: {0}")]
    Crypto(#[from] warden_crypto::CryptoError),
}

/// Result type for audit operations.
pub type AuditResult<T> = Result<T, AuditError>;
