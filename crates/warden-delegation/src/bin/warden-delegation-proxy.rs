//! Entry point for the in-sandbox delegation proxy process.
//!
//! Takes the Unix-domain socket path as its sole argument, then relays
//! agent commands to the host over its own standard input/output until
//! standard input closes.

use std::path::PathBuf;

use warden_delegation::prelude::*;

fn main() {
    tracing_subscriber::fmt::init();

    let Some(socket_path) = std::env::args().nth(1) else {
        tracing::error!("usage: warden-delegation-proxy <socket-path>");
        std::process::exit(1);
    };

    if let Err(e) = run_proxy(&PathBuf::from(socket_path), std::io::stdin(), std::io::stdout()) {
        tracing::error!(error = %e, "delegation proxy exited with an error");
        std::process::exit(1);
    }
}
