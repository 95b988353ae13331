//! Convenience re-exports.

pub use crate::boundaries::{is_contained_within, sanitize_segment, state_dir};
pub use crate::error::{WorkspaceError, WorkspaceResult};
pub use crate::hardening::{remount_proc_hidepid_command, strip_privileged_commands};
pub use crate::snapshot::{
    ALLOWED_SUBDIRS, DEFAULT_MAX_SNAPSHOT_BYTES, create_snapshot, restore_snapshot,
};
