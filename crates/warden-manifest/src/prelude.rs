//! Convenience re-exports.

pub use crate::error::{ManifestError, ManifestResult};
pub use crate::known_providers::{self, KNOWN_PROVIDERS};
pub use crate::loader::{load_dir, load_file};
pub use crate::types::{
    AuthStyle, DelegationPermission, Identity, KeyRequirement, KnownAuthStyle, KnownProvider,
    Manifest, NetworkPermission, Permissions, Resources, Runtime,
};
pub use crate::validate::{effective_domain, validate};
