//! Warden Core - foundation identifiers and directory layout for the sandbox
//! supervisor.
//!
//! This crate provides:
//! - Identifier newtypes shared across every other Warden crate
//! - The on-disk directory layout for supervisor state (`WardenHome`)
//! - A `Timestamp` wrapper used at every serialization boundary

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod dirs;
pub mod ids;
pub mod prelude;

pub use dirs::WardenHome;
pub use ids::{AgentName, RouteId, SessionId, Timestamp};
