//! Warden Vault - the encrypted credential vault.
//!
//! Stores per-provider API keys on the host and materializes them into a
//! provider-to-env-var map the Sandbox Supervisor injects when it spins up
//! a Credential Proxy. See [`Vault`] for the operations this crate exposes.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod error;
pub mod machine_id;
pub mod prelude;
pub mod types;
pub mod vault;

pub use error::{VaultError, VaultResult};
pub use types::{CredentialSummary, EnvVarName};
pub use vault::Vault;
