//! Delegation proxy and delegation handler: agent-to-agent spawning for the
//! Warden sandbox supervisor.
//!
//! The in-sandbox [`proxy`] speaks a fixed JSON-lines command set over a
//! Unix-domain socket; the host-side [`handler`] owns the table of spawned
//! nested sessions and enforces the parent manifest's `allowed_agents` list.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod bridge;
pub mod error;
pub mod handler;
pub mod prelude;
pub mod protocol;
pub mod proxy;

pub use bridge::DelegationBridge;
pub use error::{DelegationError, DelegationResult};
pub use handler::{
    CredentialPrompt, DelegationHandler, DiscoveryClient, DiscoveryMatch, MappingEntry, NestedEvent,
    NestedSession, SessionSpawner, VaultLookup,
};
pub use protocol::{DelegationCommand, DelegationResponse, SearchMatch, TaggedCommand};
pub use proxy::DEFAULT_SOCKET_PATH;
