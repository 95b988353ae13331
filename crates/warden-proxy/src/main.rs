//! Entry point for the in-sandbox credential proxy process.
//!
//! Reads the route table as a single JSON line on standard input, then
//! serves every route until killed by the supervisor.

use std::io::BufRead;

use warden_proxy::prelude::*;

fn main() {
    tracing_subscriber::fmt::init();

    let mut line = String::new();
    if let Err(e) = std::io::stdin().lock().read_line(&mut line) {
        tracing::error!(error = %e, "failed to read route table from stdin");
        std::process::exit(1);
    }

    let table: RouteTable = match serde_json::from_str(line.trim()) {
        Ok(table) => table,
        Err(e) => {
            tracing::error!(error = %e, "failed to parse route table");
            std::process::exit(1);
        }
    };

    if let Err(e) = run(table) {
        tracing::error!(error = %e, "credential proxy exited with an error");
        std::process::exit(1);
    }
}
