//! Error taxonomy for the GOTRS client
//!
//! Every failure that leaves the client is exactly one of the kinds in
//! [`Error`]. Kinds that originate from an HTTP response carry the status
//! code, the service's machine code and the raw payload for diagnostics;
//! the remaining kinds are raised locally (validation, transport, refresh).

use std::fmt;
use std::time::Duration;

use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

/// Machine code carried by [`Error::NotFound`]
pub const CODE_NOT_FOUND: &str = "NOT_FOUND";
/// Machine code carried by [`Error::Unauthorized`]
pub const CODE_UNAUTHORIZED: &str = "UNAUTHORIZED";
/// Machine code carried by [`Error::Forbidden`]
pub const CODE_FORBIDDEN: &str = "FORBIDDEN";
/// Machine code carried by [`Error::RateLimited`]
pub const CODE_RATE_LIMITED: &str = "RATE_LIMITED";
/// Default machine code for [`Error::Server`]
pub const CODE_SERVER_ERROR: &str = "SERVER_ERROR";

/// Context shared by every error kind
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ErrorContext {
    /// Human-readable message
    pub message: String,
    /// HTTP status code, present for errors built from a response
    pub status_code: Option<u16>,
    /// Short machine-readable identifier
    pub code: Option<String>,
    /// Additional free-text details
    pub details: Option<String>,
    /// Raw response payload kept for diagnostics
    pub response_data: Option<Value>,
}

impl ErrorContext {
    /// Create a context holding only a message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }

    /// Set the HTTP status code
    pub fn with_status(mut self, status_code: u16) -> Self {
        self.status_code = Some(status_code);
        self
    }

    /// Set the machine code
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Set the details; empty strings are treated as absent
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        let details = details.into();
        self.details = (!details.is_empty()).then_some(details);
        self
    }

    /// Attach the raw response payload
    pub fn with_response_data(mut self, data: Value) -> Self {
        self.response_data = Some(data);
        self
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(status) = self.status_code {
            write!(f, "HTTP {}: ", status)?;
        }
        write!(f, "{}", self.message)?;
        if let Some(details) = &self.details {
            write!(f, " - {}", details)?;
        }
        Ok(())
    }
}

/// Main error type for GOTRS client operations
#[derive(Error, Debug)]
pub enum Error {
    /// Unclassified API failure, or a `success: false` envelope
    #[error("{0}")]
    Api(ErrorContext),

    /// 404 Not Found
    #[error("{0}")]
    NotFound(ErrorContext),

    /// 401 Unauthorized
    #[error("{0}")]
    Unauthorized(ErrorContext),

    /// 403 Forbidden
    #[error("{0}")]
    Forbidden(ErrorContext),

    /// 429 Too Many Requests
    #[error("{context}")]
    RateLimited {
        context: ErrorContext,
        /// Seconds from the `Retry-After` header, when it parsed
        retry_after: Option<u64>,
    },

    /// Any 5xx response
    #[error("{0}")]
    Server(ErrorContext),

    /// Input or response data failed validation
    #[error("{context}")]
    Validation {
        context: ErrorContext,
        /// Offending field, when known
        field: Option<String>,
        /// Offending value, when known
        value: Option<Value>,
        #[source]
        source: Option<serde_json::Error>,
    },

    /// The transport failed before a response was obtained
    #[error("{context}")]
    Network {
        context: ErrorContext,
        /// HTTP method of the failed operation
        operation: String,
        /// Target URL of the failed operation
        url: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    /// The request exceeded the configured timeout
    #[error("{context}")]
    Timeout {
        context: ErrorContext,
        /// The timeout that elapsed
        timeout: Duration,
    },

    /// Credentials could not be produced or refreshed
    #[error("{0}")]
    Authentication(ErrorContext),

    /// The client was configured incorrectly
    #[error("{0}")]
    Configuration(ErrorContext),

    /// Reserved for streaming extensions
    #[error("{0}")]
    WebSocket(ErrorContext),
}

/// Convenience type alias for Results using our Error type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Generic API error with a message
    pub fn api(message: impl Into<String>) -> Self {
        Error::Api(ErrorContext::new(message))
    }

    /// Not-found error; status and code are fixed
    pub fn not_found(context: ErrorContext) -> Self {
        Error::NotFound(context.with_status(404).with_code(CODE_NOT_FOUND))
    }

    /// Unauthorized error; status and code are fixed
    pub fn unauthorized(context: ErrorContext) -> Self {
        Error::Unauthorized(context.with_status(401).with_code(CODE_UNAUTHORIZED))
    }

    /// Forbidden error; status and code are fixed
    pub fn forbidden(context: ErrorContext) -> Self {
        Error::Forbidden(context.with_status(403).with_code(CODE_FORBIDDEN))
    }

    /// Rate-limit error; status and code are fixed
    pub fn rate_limited(context: ErrorContext, retry_after: Option<u64>) -> Self {
        Error::RateLimited {
            context: context.with_status(429).with_code(CODE_RATE_LIMITED),
            retry_after,
        }
    }

    /// Server error for the given 5xx status; keeps a code already set
    pub fn server(mut context: ErrorContext, status_code: u16) -> Self {
        if context.code.is_none() {
            context.code = Some(CODE_SERVER_ERROR.to_string());
        }
        Error::Server(context.with_status(status_code))
    }

    /// Validation error for a field and its offending value
    pub fn validation(
        message: impl Into<String>,
        field: Option<String>,
        value: Option<Value>,
    ) -> Self {
        Error::Validation {
            context: ErrorContext::new(message),
            field,
            value,
            source: None,
        }
    }

    /// Network error for an operation against a URL
    pub fn network(
        message: impl Into<String>,
        operation: impl Into<String>,
        url: impl Into<String>,
        source: Option<reqwest::Error>,
    ) -> Self {
        Error::Network {
            context: ErrorContext::new(message),
            operation: operation.into(),
            url: url.into(),
            source,
        }
    }

    /// Timeout error for the elapsed timeout
    pub fn timeout(timeout: Duration) -> Self {
        Error::Timeout {
            context: ErrorContext::new(format!(
                "Request timed out after {}s",
                timeout.as_secs_f64()
            )),
            timeout,
        }
    }

    /// Authentication error with a message
    pub fn authentication(message: impl Into<String>) -> Self {
        Error::Authentication(ErrorContext::new(message))
    }

    /// Configuration error with a message
    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration(ErrorContext::new(message))
    }

    /// Streaming error with a message
    pub fn websocket(message: impl Into<String>) -> Self {
        Error::WebSocket(ErrorContext::new(message))
    }

    /// Classify a failed HTTP response
    pub fn from_response(status: StatusCode, headers: &HeaderMap, body: &str) -> Self {
        let payload = match serde_json::from_str::<Value>(body) {
            Ok(value @ Value::Object(_)) => value,
            _ => {
                let text = if body.is_empty() { "Unknown error" } else { body };
                serde_json::json!({ "error": text })
            }
        };

        let message = string_field(&payload, "message")
            .or_else(|| string_field(&payload, "error"))
            .unwrap_or_else(|| "Unknown error".to_string());

        let mut context = ErrorContext::new(message);
        if let Some(code) = string_field(&payload, "code").filter(|c| !c.is_empty()) {
            context = context.with_code(code);
        }
        if let Some(details) = details_field(&payload) {
            context = context.with_details(details);
        }
        let context = context.with_response_data(payload);

        let status_code = status.as_u16();
        match status_code {
            404 => Error::not_found(context),
            401 => Error::unauthorized(context),
            403 => Error::forbidden(context),
            429 => Error::rate_limited(context, parse_retry_after(headers)),
            500..=599 => Error::server(context, status_code),
            _ => Error::Api(context.with_status(status_code)),
        }
    }

    /// Classify an envelope that reported `success: false`
    pub fn from_envelope(status: StatusCode, envelope: &Value) -> Self {
        let message = string_field(envelope, "error")
            .or_else(|| string_field(envelope, "message"))
            .unwrap_or_else(|| "API request failed".to_string());

        let mut context = ErrorContext::new(message).with_status(status.as_u16());
        if let Some(code) = string_field(envelope, "code").filter(|c| !c.is_empty()) {
            context = context.with_code(code);
        }
        if let Some(details) = details_field(envelope) {
            context = context.with_details(details);
        }
        Error::Api(context.with_response_data(envelope.clone()))
    }

    /// Map a transport failure; raw `reqwest` errors never leave the client
    pub fn from_transport(
        error: reqwest::Error,
        operation: &str,
        url: &str,
        timeout: Duration,
    ) -> Self {
        if error.is_timeout() {
            return Error::timeout(timeout);
        }
        Error::network(
            format!("Network error: {}", error),
            operation,
            url,
            Some(error),
        )
    }

    /// Shared context of this error
    pub fn context(&self) -> &ErrorContext {
        match self {
            Error::Api(context)
            | Error::NotFound(context)
            | Error::Unauthorized(context)
            | Error::Forbidden(context)
            | Error::Server(context)
            | Error::Authentication(context)
            | Error::Configuration(context)
            | Error::WebSocket(context) => context,
            Error::RateLimited { context, .. }
            | Error::Validation { context, .. }
            | Error::Network { context, .. }
            | Error::Timeout { context, .. } => context,
        }
    }

    /// Mutable access to the shared context
    pub fn context_mut(&mut self) -> &mut ErrorContext {
        match self {
            Error::Api(context)
            | Error::NotFound(context)
            | Error::Unauthorized(context)
            | Error::Forbidden(context)
            | Error::Server(context)
            | Error::Authentication(context)
            | Error::Configuration(context)
            | Error::WebSocket(context) => context,
            Error::RateLimited { context, .. }
            | Error::Validation { context, .. }
            | Error::Network { context, .. }
            | Error::Timeout { context, .. } => context,
        }
    }

    /// Human-readable message without status or details
    pub fn message(&self) -> &str {
        &self.context().message
    }

    /// HTTP status code, if the error came from a response
    pub fn status_code(&self) -> Option<u16> {
        self.context().status_code
    }

    /// Machine-readable code
    pub fn code(&self) -> Option<&str> {
        self.context().code.as_deref()
    }

    /// Additional details
    pub fn details(&self) -> Option<&str> {
        self.context().details.as_deref()
    }

    /// Raw response payload
    pub fn response_data(&self) -> Option<&Value> {
        self.context().response_data.as_ref()
    }

    /// Seconds the service asked us to wait, for rate-limit errors
    pub fn retry_after(&self) -> Option<u64> {
        match self {
            Error::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// Unauthorized and Forbidden are also authentication errors
    pub fn is_authentication_error(&self) -> bool {
        matches!(
            self,
            Error::Authentication(_) | Error::Unauthorized(_) | Error::Forbidden(_)
        )
    }

    /// Whether the retry loop may try again after this error
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::RateLimited { .. } | Error::Server(_) | Error::Network { .. } | Error::Timeout { .. }
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Validation {
            context: ErrorContext::new(format!("Response validation failed: {}", err)),
            field: None,
            value: None,
            source: Some(err),
        }
    }
}

fn string_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_string)
}

fn details_field(value: &Value) -> Option<String> {
    match value.get("details")? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Parse an integer `Retry-After`; anything else is ignored
fn parse_retry_after(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
}
