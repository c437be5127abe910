//! Logging utilities for the GOTRS CLI
//!
//! This module provides:
//! - Session ID generation for correlating log lines
//! - Sensitive data redaction
//! - Performance timing spans
//! - Structured logging setup (compact, full, JSON)
//!
//! Records emitted through the `log` facade by `gotrs-core` are bridged into
//! the same subscriber.

use crate::error::{Error, Result};
use std::io::IsTerminal;
use std::sync::OnceLock;
use tracing::{field, Span};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

/// Session ID for the current invocation
static SESSION_ID: OnceLock<String> = OnceLock::new();

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Log level filter
    pub level: String,
    /// Output format: compact, full, json
    pub format: LogFormat,
    /// Colored console output
    pub ansi: bool,
    /// Include thread IDs
    pub thread_ids: bool,
    /// Include file and line numbers
    pub source_location: bool,
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Compact format for everyday use
    Compact,
    /// Full format with all details
    Full,
    /// JSON structured format
    Json,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: LogFormat::Compact,
            ansi: true,
            thread_ids: false,
            source_location: false,
        }
    }
}

impl LoggingConfig {
    /// Create logging config from verbosity level
    pub fn from_verbosity(verbosity: u8) -> Self {
        let mut config = Self::default();

        match verbosity {
            0 => {}
            1 => {
                config.level = "info".to_string();
            }
            2 => {
                config.level = "debug".to_string();
                config.source_location = true;
            }
            _ => {
                config.level = "trace".to_string();
                config.format = LogFormat::Full;
                config.source_location = true;
                config.thread_ids = true;
            }
        }

        config
    }

    /// Apply `RUST_LOG` and `GOTRS_LOG_FORMAT` overrides
    pub fn merge_with_env(&mut self) {
        if let Ok(rust_log) = std::env::var("RUST_LOG") {
            self.level = rust_log;
        }

        if let Ok(format) = std::env::var("GOTRS_LOG_FORMAT") {
            match LogFormat::parse(&format) {
                Some(parsed) => self.format = parsed,
                None => eprintln!("Invalid GOTRS_LOG_FORMAT: {}, using default", format),
            }
        }
    }
}

impl LogFormat {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "compact" => Some(Self::Compact),
            "full" => Some(Self::Full),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Initialize the global logging system
pub fn init_logging(config: LoggingConfig) -> Result<()> {
    let env_filter = EnvFilter::try_new(&config.level)
        .map_err(|e| Error::config(format!("Invalid log filter '{}': {}", config.level, e)))?;
    let ansi = config.ansi && std::io::stderr().is_terminal();

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(config.thread_ids)
        .with_file(config.source_location)
        .with_line_number(config.source_location);

    // Each format is a distinct subscriber type.
    let installed = match config.format {
        LogFormat::Compact => builder.with_ansi(ansi).compact().finish().try_init(),
        LogFormat::Full => builder.with_ansi(ansi).finish().try_init(),
        LogFormat::Json => builder.with_ansi(false).json().finish().try_init(),
    };
    installed.map_err(|e| Error::other(format!("Failed to initialize logging: {}", e)))?;

    let session_id = SESSION_ID.get_or_init(generate_session_id);
    tracing::debug!(session_id = %session_id, format = ?config.format, "Logging initialized");

    Ok(())
}

/// Generate a unique ID for this invocation
pub fn generate_session_id() -> String {
    format!("cli_{}", Uuid::new_v4().simple())
}

/// Get the current session ID
pub fn current_session_id() -> Option<&'static str> {
    SESSION_ID.get().map(|s| s.as_str())
}

/// Create a span with session ID and timing
pub fn create_operation_span(operation: &str, details: Option<&str>) -> Span {
    tracing::info_span!(
        "operation",
        operation = operation,
        session_id = current_session_id().unwrap_or("unknown"),
        details = details.unwrap_or(""),
        duration_ms = field::Empty,
    )
}

/// Sensitive data redaction utilities
pub mod redaction {
    use regex::Regex;
    use serde_json::Value;
    use std::sync::OnceLock;

    static API_KEY_REGEX: OnceLock<Option<Regex>> = OnceLock::new();
    static TOKEN_REGEX: OnceLock<Option<Regex>> = OnceLock::new();

    fn api_key_regex() -> Option<&'static Regex> {
        API_KEY_REGEX
            .get_or_init(|| {
                Regex::new(r#"(?i)(x-api-key|api[_-]?key|apikey)["']?[=:\s]+['"]?([a-zA-Z0-9_.-]{6,})['"]?"#).ok()
            })
            .as_ref()
    }

    fn token_regex() -> Option<&'static Regex> {
        TOKEN_REGEX
            .get_or_init(|| {
                Regex::new(r#"(?i)(token|bearer)["']?[=:\s]+['"]?([a-zA-Z0-9_.-]{6,})['"]?"#).ok()
            })
            .as_ref()
    }

    /// Redact sensitive information from a string
    pub fn redact_sensitive(input: &str) -> String {
        let mut result = input.to_string();

        if let Some(regex) = api_key_regex() {
            result = regex.replace_all(&result, "$1=***").to_string();
        }
        if let Some(regex) = token_regex() {
            result = regex.replace_all(&result, "$1=***").to_string();
        }

        result
    }

    /// Redact sensitive information from JSON values
    pub fn redact_json_value(value: &mut Value) {
        match value {
            Value::Object(map) => {
                for (key, val) in map.iter_mut() {
                    if is_sensitive_key(key) && !val.is_null() {
                        *val = Value::String("***".to_string());
                    } else {
                        redact_json_value(val);
                    }
                }
            }
            Value::Array(arr) => {
                for item in arr.iter_mut() {
                    redact_json_value(item);
                }
            }
            Value::String(s) => {
                *s = redact_sensitive(s);
            }
            _ => {}
        }
    }

    fn is_sensitive_key(key: &str) -> bool {
        let key_lower = key.to_lowercase();
        key_lower.contains("key")
            || key_lower.contains("token")
            || key_lower.contains("secret")
            || key_lower.contains("password")
            || key_lower == "authorization"
    }
}

/// Performance timing utilities
pub mod timing {
    use std::time::Instant;
    use tracing::Span;

    /// A timer that logs its duration when dropped
    pub struct Timer {
        start: Instant,
        span: Span,
        operation: String,
    }

    impl Timer {
        pub fn new(operation: &str) -> Self {
            Self::start(operation, None)
        }

        pub fn with_details(operation: &str, details: &str) -> Self {
            Self::start(operation, Some(details))
        }

        fn start(operation: &str, details: Option<&str>) -> Self {
            Self {
                start: Instant::now(),
                span: super::create_operation_span(operation, details),
                operation: operation.to_string(),
            }
        }
    }

    impl Drop for Timer {
        fn drop(&mut self) {
            let duration = self.start.elapsed();
            self.span.record("duration_ms", duration.as_millis() as u64);

            tracing::debug!(
                operation = %self.operation,
                duration_ms = duration.as_millis() as u64,
                "Operation completed"
            );
        }
    }
}
