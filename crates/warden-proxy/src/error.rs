//! Credential proxy errors.

use thiserror::Error;

/// Errors that can occur while running the credential proxy.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// I/O error binding a listener or handling a connection.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The route table supplied on stdin was malformed.
    #[error("invalid route table: {0}")]
    InvalidRouteTable(String),

    /// The upstream relay request could not be built or sent.
    #[error("upstream request failed: {0}")]
    Upstream(#[from] reqwest::Error),
}

/// Result type for credential proxy operations.
pub type ProxyResult<T> = Result<T, ProxyError>;
