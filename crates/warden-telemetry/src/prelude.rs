//! Commonly used types for convenient import.
//!
//! `use warden_telemetry::prelude::*;` pulls in logging setup and request
//! context types.

pub use crate::{LogConfig, LogFormat, RequestContext, RequestGuard, TelemetryError, TelemetryResult};
pub use crate::{setup_default_logging, setup_logging};
