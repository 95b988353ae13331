//! Commonly used types for convenient import.
//!
//! `use warden_core::prelude::*;` pulls in the identifiers every other
//! Warden crate builds on.

pub use crate::dirs::WardenHome;
pub use crate::ids::{AgentName, RouteId, SessionId, Timestamp};
