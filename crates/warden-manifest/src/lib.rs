//! Warden Manifest - agent manifest parsing and validation.
//!
//! Parses a declarative manifest document from an agent bundle and enforces
//! every schema-level and cross-field invariant before a [`Manifest`] value
//! can exist. Validation is not deferred: there is no code path that
//! constructs a [`Manifest`] without running it through
//! [`validate::validate`] first.
//!
//! ```rust,no_run
//! use warden_manifest::loader;
//!
//! let manifest = loader::load_dir(std::path::Path::new("./my-agent")).unwrap();
//! println!("loaded {}", manifest.identity.name);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod error;
pub mod known_providers;
pub mod loader;
pub mod prelude;
pub mod types;
pub mod validate;

pub use error::{ManifestError, ManifestResult};
pub use types::{
    AuthStyle, DelegationPermission, Identity, KeyRequirement, KnownAuthStyle, KnownProvider,
    Manifest, NetworkPermission, Permissions, Resources, Runtime,
};
