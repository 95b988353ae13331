//! Warden Supervisor - the ordered sandbox lifecycle: provision, harden,
//! start the in-sandbox proxies, run setup, start the agent, and tear it
//! all back down with a state snapshot.
//!
//! The [`provider::SandboxProvider`] trait is the seam between this crate
//! and whatever remote microVM backend actually runs a sandbox; this crate
//! never spawns a sandbox itself.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod config;
pub mod error;
pub mod prelude;
pub mod provider;
pub mod remote_session;
pub mod supervisor;

pub use config::SupervisorConfig;
pub use error::{SupervisorError, SupervisorResult};
pub use provider::{
    CommandHandle, CommandOptions, NetworkPolicy, ProviderError, ProviderResult, PtyHandle, PtySizeSpec, Sandbox,
    SandboxProvider,
};
pub use remote_session::RemoteAgentSession;
pub use supervisor::{Supervisor, SupervisedSession};
