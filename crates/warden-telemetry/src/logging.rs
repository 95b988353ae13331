//! Logging configuration and process-wide setup.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

use crate::error::{TelemetryError, TelemetryResult};

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable, multi-line output for local development.
    #[default]
    Pretty,
    /// Single-line structured JSON, for ingestion by a log aggregator.
    Json,
    /// Compact single-line plain text.
    Compact,
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    level: String,
    format: LogFormat,
    directives: Vec<String>,
}

impl LogConfig {
    /// Start from a base level (`"error"`, `"warn"`, `"info"`, `"debug"`,
    /// `"trace"`).
    #[must_use]
    pub fn new(level: impl Into<String>) -> Self {
        Self {
            level: level.into(),
            format: LogFormat::default(),
            directives: Vec::new(),
        }
    }

    /// Set the output format.
    #[must_use]
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Add a per-target filter directive (e.g. `"warden_proxy=trace"`).
    #[must_use]
    pub fn with_directive(mut self, directive: impl Into<String>) -> Self {
        self.directives.push(directive.into());
        self
    }

    fn build_filter(&self) -> TelemetryResult<EnvFilter> {
        let mut filter = EnvFilter::try_new(&self.level)
            .map_err(|e| TelemetryError::InvalidFilter(e.to_string()))?;
        for directive in &self.directives {
            let parsed = directive
                .parse()
                .map_err(|_| TelemetryError::InvalidFilter(directive.clone()))?;
            filter = filter.add_directive(parsed);
        }
        Ok(filter)
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self::new("info")
    }
}

/// Initialize the global tracing subscriber from `config`.
///
/// # Errors
///
/// Returns [`TelemetryError::InvalidFilter`] if the level or a directive
/// fails to parse, or [`TelemetryError::AlreadyInitialized`] if a global
/// subscriber is already set.
pub fn setup_logging(config: &LogConfig) -> TelemetryResult<()> {
    let filter = config.build_filter()?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE);

    let result = match config.format {
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Compact => builder.compact().try_init(),
    };

    result.map_err(|_| TelemetryError::AlreadyInitialized)
}

/// Initialize logging with production defaults: `info` level, JSON output.
///
/// # Errors
///
/// Returns [`TelemetryError::AlreadyInitialized`] if a global subscriber is
/// already set.
pub fn setup_default_logging() -> TelemetryResult<()> {
    setup_logging(&LogConfig::new("info").with_format(LogFormat::Json))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_methods_compose() {
        let config = LogConfig::new("debug")
            .with_format(LogFormat::Json)
            .with_directive("warden_proxy=trace");
        assert_eq!(config.level, "debug");
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.directives, vec!["warden_proxy=trace".to_string()]);
    }

    #[test]
    fn invalid_directive_is_rejected_before_init() {
        let config = LogConfig::new("info").with_directive("not a directive!!");
        assert!(matches!(
            config.build_filter(),
            Err(TelemetryError::InvalidFilter(_))
        ));
    }

    #[test]
    fn default_config_uses_info_and_pretty() {
        let config = LogConfig::default();
        assert_eq!(config.level, "info");
        assert_eq!(config.format, LogFormat::Pretty);
    }
}
