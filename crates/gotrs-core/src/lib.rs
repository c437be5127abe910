//! GOTRS Core - Authenticated transport for the GOTRS ticketing API
//!
//! This crate provides the client-side plumbing every GOTRS API call goes
//! through: credentials, request construction, retries and response decoding.
//!
//! # Main Components
//!
//! - **Authentication**: API key, JWT and OAuth2 strategies with lazy, collapsed refresh
//! - **Error Handling**: A closed error taxonomy using `thiserror`
//! - **Transport**: Verbs, upload and download with exponential backoff retries
//! - **Response Normalization**: Envelope unwrapping and typed deserialization
//!
//! # Example
//!
//! ```no_run
//! use gotrs_core::{HttpClient, Result};
//! use serde_json::Value;
//!
//! async fn example() -> Result<()> {
//!     let client = HttpClient::with_api_key("https://tickets.example.com", "my-key")?;
//!     client.ping().await?;
//!     let tickets: Vec<Value> = client.get("/api/v1/tickets").await?;
//!     println!("{} tickets", tickets.len());
//!     client.close();
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod error;
pub mod http;

// Re-export main types for convenience
pub use auth::{
    ApiKeyAuth, AuthType, Authenticator, Credentials, JwtAuth, NoAuth, OAuth2Auth, TokenRefresh,
    TokenRefresher,
};
pub use error::{Error, ErrorContext, Result};
pub use http::{ClientConfig, FileUpload, HttpClient, RequestOptions, RetryPolicy};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
