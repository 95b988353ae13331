//! Convenience re-exports for consumers of `warden-delegation`.

pub use crate::bridge::DelegationBridge;
pub use crate::error::{DelegationError, DelegationResult};
pub use crate::handler::{
    CredentialPrompt, DelegationHandler, DiscoveryClient, DiscoveryMatch, MappingEntry, NestedEvent,
    NestedSession, SessionSpawner, VaultLookup,
};
pub use crate::protocol::{DelegationCommand, DelegationResponse, SearchMatch, TaggedCommand};
pub use crate::proxy::{run as run_proxy, DEFAULT_SOCKET_PATH};
