//! Manifest loading and validation errors.

use thiserror::Error;

/// Errors from loading or validating an agent manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// No manifest file was found at the given path or inside the given
    /// bundle directory.
    #[error("no manifest found at {0}")]
    NotFound(String),

    /// The manifest file exists but is not valid TOML, or does not match
    /// the expected shape.
    #[error("failed to parse manifest {path}: {source}")]
    ParseError {
        /// Path to the file that failed to parse.
        path: String,
        /// Underlying TOML error.
        #[source]
        source: toml::de::Error,
    },

    /// The manifest parsed but failed a schema-level or cross-field
    /// invariant. Fatal to session start; no sandbox is ever created.
    #[error("manifest is invalid: {0}")]
    SchemaError(String),

    /// I/O error while reading the manifest or checking a declared
    /// dependency file.
    #[error("I/O error reading {path}: {source}")]
    Io {
        /// Path that could not be read.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Result type for manifest operations.
pub type ManifestResult<T> = Result<T, ManifestError>;
