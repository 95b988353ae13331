//! Convenience re-exports for consumers of `warden-audit`.

pub use crate::entry::{AuditAction, AuditEntry, AuditOutcome};
pub use crate::error::{AuditError, AuditResult};
pub use crate::log::AuditLog;
