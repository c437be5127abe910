//! Request construction for the GOTRS API
//!
//! Joins paths onto the base URL, encodes query parameters and assembles
//! request headers in a fixed precedence order.

use std::collections::HashMap;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::Url;
use serde::Serialize;
use serde_json::Value;

use super::config::normalize_base_url;
use crate::error::{Error, Result};

/// Per-request options: query parameters, JSON body and extra headers
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub(crate) query: Vec<(String, Value)>,
    pub(crate) body: Option<Value>,
    pub(crate) headers: HashMap<String, String>,
}

impl RequestOptions {
    /// Create empty options
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one query parameter; `null` values are omitted, arrays are comma-joined
    pub fn param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Add every field of a serializable mapping as query parameters
    pub fn query<T: Serialize + ?Sized>(mut self, params: &T) -> Result<Self> {
        match serde_json::to_value(params)? {
            Value::Object(map) => {
                self.query.extend(map);
                Ok(self)
            }
            Value::Null => Ok(self),
            other => Err(Error::validation(
                "Query parameters must serialize to a mapping",
                Some("query".to_string()),
                Some(other),
            )),
        }
    }

    /// Set a JSON body from a serializable value
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    /// Set a JSON body
    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Add an extra request header
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Add several extra request headers
    pub fn headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers.extend(headers);
        self
    }

    /// Query parameters in insertion order
    pub fn query_params(&self) -> &[(String, Value)] {
        &self.query
    }

    /// JSON body, if any
    pub fn json_body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    /// Extra request headers
    pub fn extra_headers(&self) -> &HashMap<String, String> {
        &self.headers
    }
}

/// Builder for URLs and headers against one base URL
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    base_url: String,
}

impl RequestBuilder {
    /// Create for a base URL; trailing slashes are stripped
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: normalize_base_url(base_url),
        }
    }

    /// Base URL without trailing slash
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build the full URL for a path
    ///
    /// The base URL is always treated as a directory and a leading slash on
    /// the path is ignored, so `/a/b` and `a/b` resolve identically.
    pub fn build_url(&self, path: &str, query: &[(String, Value)]) -> Result<Url> {
        let joined = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let mut url = Url::parse(&joined).map_err(|e| {
            Error::validation(
                format!("Invalid request URL {}: {}", joined, e),
                Some("path".to_string()),
                Some(Value::String(path.to_string())),
            )
        })?;

        let pairs = encode_query(query);
        if !pairs.is_empty() {
            url.query_pairs_mut().extend_pairs(pairs);
        }

        Ok(url)
    }

    /// Assemble request headers
    ///
    /// Starts from `Content-Type: application/json`, overlays `extra`, then
    /// overlays `auth`; later layers win on conflicting names.
    pub fn merge_headers(
        &self,
        extra: &HashMap<String, String>,
        auth: &HashMap<String, String>,
    ) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        for (name, value) in extra.iter().chain(auth.iter()) {
            let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                Error::validation(
                    format!("Invalid header name {}: {}", name, e),
                    Some(name.clone()),
                    None,
                )
            })?;
            let header_value = HeaderValue::from_str(value).map_err(|e| {
                Error::validation(format!("Invalid value for header {}: {}", name, e), Some(name.clone()), None)
            })?;
            headers.insert(header_name, header_value);
        }

        Ok(headers)
    }
}

/// Flatten query parameters into string pairs
///
/// Absent (`null`) values are dropped, arrays become comma-joined strings and
/// everything else is stringified directly.
pub fn encode_query(params: &[(String, Value)]) -> Vec<(String, String)> {
    params
        .iter()
        .filter_map(|(key, value)| match value {
            Value::Null => None,
            Value::Array(items) => Some((
                key.clone(),
                items.iter().map(stringify).collect::<Vec<_>>().join(","),
            )),
            other => Some((key.clone(), stringify(other))),
        })
        .collect()
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
