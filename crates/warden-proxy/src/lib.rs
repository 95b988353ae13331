//! Warden Proxy - in-sandbox credential proxy.
//!
//! Runs inside the sandbox as a privileged user, started after `/proc` is
//! remounted with `hidepid=2`. Accepts plaintext HTTP on a set of loopback
//! ports from the agent, authenticates with a shared session token in
//! place of the real credential, and relays to a fixed upstream host over
//! TLS with the real credential injected.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod error;
pub mod prelude;
pub mod route;
pub mod server;

pub use error::{ProxyError, ProxyResult};
pub use route::{AuthStyle, Route, RouteTable};
