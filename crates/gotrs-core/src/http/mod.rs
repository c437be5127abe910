//! HTTP transport for the GOTRS API
//!
//! This module provides:
//! - Client configuration with validation and environment loading
//! - URL and header construction with auth headers applied last
//! - Retry logic with exponential backoff
//! - Envelope unwrapping and typed hydration of responses
//! - The client verbs, file upload and download

pub mod builder;
pub mod client;
pub mod config;
pub mod normalizer;
pub mod retry;

pub use builder::{RequestBuilder, RequestOptions};
pub use client::{FileUpload, HttpClient, HEALTH_PATH};
pub use config::ClientConfig;
pub use retry::{RetryDecision, RetryPolicy};

// Re-export commonly used types
pub use reqwest::{Method, StatusCode};
