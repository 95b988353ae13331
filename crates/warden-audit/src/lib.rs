//! Warden Audit - chain-linked, signed audit logging.
//!
//! Every security-relevant supervisor operation — sandbox lifecycle,
//! credential resolution, proxy traffic, delegation, state snapshots,
//! manifest validation — is recorded as a signed, chain-linked
//! [`AuditEntry`] appended to a single log file.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod entry;
pub mod error;
pub mod log;
pub mod prelude;

pub use entry::{AuditAction, AuditEntry, AuditOutcome};
pub use error::{AuditError, AuditResult};
pub use log::AuditLog;
