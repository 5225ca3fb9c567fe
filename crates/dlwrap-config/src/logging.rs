//! Structured logging utilities for dlwrap components.
//!
//! Provides consistent logging with component prefixes and structured fields.
//!
//! # Usage
//!
//! ```ignore
//! use dlwrap_config::logging::*;
//!
//! log_parse_warn!("Skipped declaration", line = 12, reason = "no name boundary");
//! log_cli_debug!("Writing output", path = "shim.c");
//! ```

use serde::{Deserialize, Serialize};

/// Env var consulted before `RUST_LOG`
pub const LOG_ENV: &str = "DLWRAP_LOG";

/// Component identifiers for log filtering
pub struct Component;

impl Component {
    pub const PARSE: &'static str = "PARSE";
    pub const EMIT: &'static str = "EMIT";
    pub const CLI: &'static str = "CLI";
}

/// Log levels for runtime configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_filter(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

// === PARSE logging macros ===

#[macro_export]
macro_rules! log_parse_warn {
    ($msg:literal $(, $key:ident = $value:expr)* $(,)?) => {
        tracing::warn!(component = $crate::logging::Component::PARSE, $($key = $value,)* $msg)
    };
}

#[macro_export]
macro_rules! log_parse_debug {
    ($msg:literal $(, $key:ident = $value:expr)* $(,)?) => {
        tracing::debug!(component = $crate::logging::Component::PARSE, $($key = $value,)* $msg)
    };
}

#[macro_export]
macro_rules! log_parse_trace {
    ($msg:literal $(, $key:ident = $value:expr)* $(,)?) => {
        tracing::trace!(component = $crate::logging::Component::PARSE, $($key = $value,)* $msg)
    };
}

// === EMIT logging macros ===

#[macro_export]
macro_rules! log_emit_info {
    ($msg:literal $(, $key:ident = $value:expr)* $(,)?) => {
        tracing::info!(component = $crate::logging::Component::EMIT, $($key = $value,)* $msg)
    };
}

#[macro_export]
macro_rules! log_emit_debug {
    ($msg:literal $(, $key:ident = $value:expr)* $(,)?) => {
        tracing::debug!(component = $crate::logging::Component::EMIT, $($key = $value,)* $msg)
    };
}

// === CLI logging macros ===

#[macro_export]
macro_rules! log_cli_error {
    ($msg:literal $(, $key:ident = $value:expr)* $(,)?) => {
        tracing::error!(component = $crate::logging::Component::CLI, $($key = $value,)* $msg)
    };
}

#[macro_export]
macro_rules! log_cli_debug {
    ($msg:literal $(, $key:ident = $value:expr)* $(,)?) => {
        tracing::debug!(component = $crate::logging::Component::CLI, $($key = $value,)* $msg)
    };
}

/// Initialize logging. `DLWRAP_LOG` wins over `RUST_LOG`, which wins over `level`.
/// Call this once at application startup.
pub fn init_logging(level: LogLevel) {
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(level.as_filter()));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_constants() {
        assert_eq!(Component::PARSE, "PARSE");
        assert_eq!(Component::EMIT, "EMIT");
        assert_eq!(Component::CLI, "CLI");
    }

    #[test]
    fn test_macros_expand_with_component_constants() {
        crate::log_parse_warn!("Skipped declaration", line = 3, reason = "missing '('");
        crate::log_emit_debug!("Rendering shim", declarations = 2);
        crate::log_cli_error!("Generation failed");
    }

    #[test]
    fn test_level_filters() {
        assert_eq!(LogLevel::Warn.as_filter(), "warn");
        assert_eq!(LogLevel::Trace.as_filter(), "trace");
    }
}
