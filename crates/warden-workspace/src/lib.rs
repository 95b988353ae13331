//! Warden Workspace - session state directories, allowlist snapshots, and
//! sandbox hardening commands.
//!
//! State persistence is allowlist-based, not denylist-based: only
//! [`snapshot::ALLOWED_SUBDIRS`] is ever archived out of an agent's home,
//! and restore rejects any tar member that could escape the destination.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod boundaries;
pub mod error;
pub mod hardening;
pub mod prelude;
pub mod snapshot;

pub use boundaries::{sanitize_segment, state_dir};
pub use error::{WorkspaceError, WorkspaceResult};
pub use snapshot::{ALLOWED_SUBDIRS, DEFAULT_MAX_SNAPSHOT_BYTES, create_snapshot, restore_snapshot};
