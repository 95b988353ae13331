//! Convenience re-exports for consumers of `warden-proxy`.

pub use crate::error::{ProxyError, ProxyResult};
pub use crate::route::{AuthStyle, Route, RouteTable};
pub use crate::server::run;
