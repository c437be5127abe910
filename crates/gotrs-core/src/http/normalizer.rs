//! Response normalization
//!
//! Successful bodies may arrive wrapped in an envelope of the form
//! `{"success": bool, "data": ..., "error": ...}`. Unwrapping happens here,
//! before anything is deserialized into a caller type.

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{Error, Result};

/// Parse a successful response body
///
/// Non-JSON bodies are kept as a JSON string; an empty body becomes `null`.
pub fn parse_body(body: &str) -> Value {
    if body.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_string()))
}

/// Unwrap the response envelope
///
/// A mapping with a `success` key is an envelope. `success: false` fails with
/// the envelope's `error` text; otherwise the `data` field is returned, or
/// the whole body when `data` is absent. Anything that is not an envelope is
/// returned unchanged.
pub fn unwrap_envelope(status: StatusCode, body: Value) -> Result<Value> {
    let Value::Object(mut map) = body else {
        return Ok(body);
    };

    match map.get("success") {
        None => Ok(Value::Object(map)),
        Some(Value::Bool(false)) => Err(Error::from_envelope(status, &Value::Object(map))),
        Some(_) => match map.remove("data") {
            Some(data) => Ok(data),
            None => Ok(Value::Object(map)),
        },
    }
}

/// Deserialize a payload into the caller's type
pub fn hydrate<T: DeserializeOwned>(payload: Value) -> Result<T> {
    serde_json::from_value(payload).map_err(Error::from)
}

/// Full pipeline for a successful response body
pub fn normalize<T: DeserializeOwned>(status: StatusCode, body: &str) -> Result<T> {
    let payload = unwrap_envelope(status, parse_body(body))?;
    hydrate(payload)
}
