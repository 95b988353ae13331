//! Convenience re-exports.

pub use crate::error::{VaultError, VaultResult};
pub use crate::types::{CredentialSummary, EnvVarName};
pub use crate::vault::Vault;
