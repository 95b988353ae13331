//! Warden Telemetry - logging and tracing setup for the sandbox supervisor.
//!
//! This crate provides:
//! - Configurable logging setup with multiple output formats
//! - A `RequestContext` span helper for correlating logs across one
//!   supervisor lifecycle
//!
//! # Example
//!
//! ```rust,no_run
//! use warden_telemetry::{LogConfig, LogFormat, setup_logging, RequestContext};
//!
//! # fn main() -> Result<(), warden_telemetry::TelemetryError> {
//! let config = LogConfig::new("info").with_format(LogFormat::Json);
//! setup_logging(&config)?;
//!
//! let ctx = RequestContext::new("supervisor").with_operation("provision");
//! let _guard = ctx.span().entered();
//! tracing::info!("provisioning sandbox");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod context;
mod error;
mod logging;
pub mod prelude;

pub use context::{RequestContext, RequestGuard};
pub use error::{TelemetryError, TelemetryResult};
pub use logging::{LogConfig, LogFormat, setup_default_logging, setup_logging};
