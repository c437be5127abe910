//! Error types and handling for the CLI
//!
//! This module provides error types and utilities for handling
//! various failure modes in the CLI application.

use std::io;
use std::path::PathBuf;

use colored::Colorize;

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for CLI operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error (file operations, etc.)
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Error returned by the GOTRS client
    #[error("{0}")]
    Api(#[from] gotrs_core::Error),

    /// File not found
    #[error("File not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    /// Invalid file format
    #[error("Invalid file format for {}: expected {}", path.display(), expected)]
    InvalidFormat { path: PathBuf, expected: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid argument combination
    #[error("Invalid arguments: {0}")]
    InvalidArgs(String),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// TOML deserialization error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Generic error with context
    #[error("{message}")]
    Other { message: String },
}

impl Error {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create an invalid arguments error
    pub fn invalid_args(message: impl Into<String>) -> Self {
        Self::InvalidArgs(message.into())
    }

    /// Create a generic error with message
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }

    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Io(_) => 1,
            Self::Api(api) => api_exit_code(api),
            Self::FileNotFound { .. } => 3,
            Self::InvalidFormat { .. } => 4,
            Self::Config(_) => 5,
            Self::InvalidArgs(_) => 6,
            Self::Json(_) => 12,
            Self::Yaml(_) | Self::Toml(_) => 13,
            Self::Other { .. } => 99,
        }
    }

    /// Check if this error should display usage help
    pub fn should_show_help(&self) -> bool {
        matches!(self, Self::InvalidArgs(_))
    }
}

fn api_exit_code(error: &gotrs_core::Error) -> i32 {
    use gotrs_core::Error as Api;

    match error {
        Api::NotFound(_) => 7,
        Api::Configuration(_) => 5,
        _ if error.is_authentication_error() => 9,
        Api::Network { .. } => 10,
        Api::Timeout { .. } => 11,
        _ => 2,
    }
}

/// Format an error for display to the user
pub fn format_error(error: &Error, use_color: bool) -> String {
    let mut lines = vec![if use_color {
        format!("{} {}", "Error:".red().bold(), error)
    } else {
        format!("Error: {}", error)
    }];

    if let Error::Api(api) = error {
        if let Some(code) = api.code() {
            lines.push(format!("  code: {}", code));
        }
        if let Some(retry_after) = api.retry_after() {
            lines.push(format!("  retry after: {}s", retry_after));
        }
        if let gotrs_core::Error::Network { operation, url, .. } = api {
            lines.push(format!("  request: {} {}", operation, url));
        }
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use gotrs_core::ErrorContext;

    #[test]
    fn test_exit_codes() {
        assert_eq!(Error::config("bad").exit_code(), 5);
        assert_eq!(Error::invalid_args("bad").exit_code(), 6);

        let not_found = Error::Api(gotrs_core::Error::not_found(ErrorContext::new("missing")));
        assert_eq!(not_found.exit_code(), 7);

        let forbidden = Error::Api(gotrs_core::Error::forbidden(ErrorContext::new("no")));
        assert_eq!(forbidden.exit_code(), 9);

        let timeout = Error::Api(gotrs_core::Error::timeout(std::time::Duration::from_secs(1)));
        assert_eq!(timeout.exit_code(), 11);

        let server = Error::Api(gotrs_core::Error::server(ErrorContext::new("boom"), 502));
        assert_eq!(server.exit_code(), 2);
    }

    #[test]
    fn test_format_error_without_color() {
        let error = Error::Api(gotrs_core::Error::rate_limited(
            ErrorContext::new("slow down"),
            Some(30),
        ));
        let rendered = format_error(&error, false);
        assert!(rendered.starts_with("Error: HTTP 429: slow down"));
        assert!(rendered.contains("code: RATE_LIMITED"));
        assert!(rendered.contains("retry after: 30s"));
    }

    #[test]
    fn test_should_show_help() {
        assert!(Error::invalid_args("x").should_show_help());
        assert!(!Error::other("x").should_show_help());
    }
}
