//! Authentication strategies for the GOTRS API
//!
//! Supports a closed set of schemes:
//! - No authentication
//! - Static API key (`X-API-Key` header)
//! - JWT bearer tokens with refresh
//! - OAuth2 access tokens with refresh and a configurable token type
//!
//! Token-based schemes refresh lazily: the client asks [`Authenticator::is_expired`]
//! before every request and calls [`Authenticator::refresh`] when needed.
//! Concurrent refreshes are collapsed so only one caller hits the refresh
//! procedure.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use arc_swap::ArcSwap;
use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;

use crate::error::{Error, Result};

/// Header used by API-key authentication
pub const API_KEY_HEADER: &str = "X-API-Key";
/// Header used by bearer-style authentication
pub const AUTHORIZATION_HEADER: &str = "Authorization";
/// Credentials are treated as expired this long before their expiry time
pub const EXPIRY_BUFFER_SECS: i64 = 60;

/// Tag identifying the authentication scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthType {
    None,
    ApiKey,
    Jwt,
    #[serde(rename = "oauth2")]
    OAuth2,
}

impl fmt::Display for AuthType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthType::None => write!(f, "none"),
            AuthType::ApiKey => write!(f, "api-key"),
            AuthType::Jwt => write!(f, "jwt"),
            AuthType::OAuth2 => write!(f, "oauth2"),
        }
    }
}

/// Capability set shared by every authentication scheme
#[async_trait]
pub trait Authenticator: Send + Sync + fmt::Debug {
    /// The scheme this authenticator implements
    fn auth_type(&self) -> AuthType;

    /// Headers to attach to a request. Never blocks.
    fn auth_headers(&self) -> HashMap<String, String>;

    /// Whether the credentials are expired at `now`, including the safety buffer
    fn is_expired_at(&self, now: DateTime<Utc>) -> bool;

    /// Whether the credentials are expired right now
    fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Exchange the refresh token for new credentials
    async fn refresh(&self) -> Result<()>;
}

/// Authenticator that sends no credentials
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAuth;

#[async_trait]
impl Authenticator for NoAuth {
    fn auth_type(&self) -> AuthType {
        AuthType::None
    }

    fn auth_headers(&self) -> HashMap<String, String> {
        HashMap::new()
    }

    fn is_expired_at(&self, _now: DateTime<Utc>) -> bool {
        false
    }

    async fn refresh(&self) -> Result<()> {
        Ok(())
    }
}

/// Static API key sent in the `X-API-Key` header
#[derive(Clone)]
pub struct ApiKeyAuth {
    api_key: String,
}

impl ApiKeyAuth {
    /// Create with an explicit API key
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
        }
    }
}

impl fmt::Debug for ApiKeyAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKeyAuth").finish_non_exhaustive()
    }
}

#[async_trait]
impl Authenticator for ApiKeyAuth {
    fn auth_type(&self) -> AuthType {
        AuthType::ApiKey
    }

    fn auth_headers(&self) -> HashMap<String, String> {
        HashMap::from([(API_KEY_HEADER.to_string(), self.api_key.clone())])
    }

    fn is_expired_at(&self, _now: DateTime<Utc>) -> bool {
        false
    }

    async fn refresh(&self) -> Result<()> {
        Err(Error::authentication(
            "API key authentication does not support refresh",
        ))
    }
}

/// Credentials returned by a refresh procedure
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TokenRefresh {
    /// New access token
    pub access_token: String,
    /// New refresh token; the previous one is kept when absent
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// New expiry; absent means the token never expires
    #[serde(default, deserialize_with = "deserialize_expiry")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl TokenRefresh {
    /// Create with only an access token
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            expires_at: None,
        }
    }

    /// Set the new refresh token
    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    /// Set the new expiry
    pub fn with_expires_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Parse a refresh response mapping
    ///
    /// `access_token` is required; `expires_at` may be an RFC 3339 string
    /// (with `Z` or an offset) or integer Unix seconds.
    pub fn from_value(value: Value) -> Result<Self> {
        serde_json::from_value(value)
            .map_err(|e| Error::authentication(format!("Invalid refresh response: {}", e)))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ExpiryRepr {
    Text(String),
    UnixSeconds(i64),
}

fn deserialize_expiry<'de, D>(deserializer: D) -> std::result::Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error as _;

    match Option::<ExpiryRepr>::deserialize(deserializer)? {
        None => Ok(None),
        Some(ExpiryRepr::Text(text)) => parse_expiry(&text).map(Some).map_err(D::Error::custom),
        Some(ExpiryRepr::UnixSeconds(secs)) => Utc
            .timestamp_opt(secs, 0)
            .single()
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("timestamp out of range: {}", secs))),
    }
}

/// Parse an ISO-8601 expiry; offsets are normalized to UTC, naive times are taken as UTC
fn parse_expiry(text: &str) -> std::result::Result<DateTime<Utc>, String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|e| format!("invalid expires_at '{}': {}", text, e))
}

/// Caller-supplied procedure exchanging a refresh token for new credentials
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh(&self, refresh_token: String) -> Result<TokenRefresh>;
}

#[async_trait]
impl<F, Fut> TokenRefresher for F
where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = Result<TokenRefresh>> + Send,
{
    async fn refresh(&self, refresh_token: String) -> Result<TokenRefresh> {
        (self)(refresh_token).await
    }
}

/// Snapshot of token credentials
#[derive(Clone, PartialEq)]
pub struct Credentials {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

impl Credentials {
    fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => now + Duration::seconds(EXPIRY_BUFFER_SECS) >= expires_at,
            None => false,
        }
    }
}

/// Refreshable token state shared by the JWT and OAuth2 schemes
///
/// Reads are lock-free; `refresh_lock` serializes refreshes and is held
/// across the refresh procedure so at most one caller performs it.
struct TokenState {
    credentials: ArcSwap<Credentials>,
    refresher: Option<Arc<dyn TokenRefresher>>,
    refresh_lock: Mutex<()>,
}

impl TokenState {
    fn new(access_token: String) -> Self {
        Self {
            credentials: ArcSwap::from_pointee(Credentials {
                access_token,
                refresh_token: None,
                expires_at: None,
            }),
            refresher: None,
            refresh_lock: Mutex::new(()),
        }
    }

    fn update(&self, f: impl FnOnce(&mut Credentials)) {
        let mut next = Credentials::clone(&self.credentials.load());
        f(&mut next);
        self.credentials.store(Arc::new(next));
    }

    fn snapshot(&self) -> Credentials {
        Credentials::clone(&self.credentials.load())
    }

    fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.credentials.load().is_expired_at(now)
    }

    async fn refresh(&self) -> Result<()> {
        let refresher = match (&self.refresher, &self.credentials.load().refresh_token) {
            (Some(refresher), Some(_)) => Arc::clone(refresher),
            _ => {
                return Err(Error::authentication(
                    "No refresh token or refresh procedure configured",
                ))
            }
        };

        let _guard = self.refresh_lock.lock().await;

        // Another caller may have refreshed while we waited for the lock.
        if !self.is_expired_at(Utc::now()) {
            log::debug!("Credentials already refreshed by a concurrent caller");
            return Ok(());
        }

        let current = self.credentials.load_full();
        let previous_refresh_token = current
            .refresh_token
            .clone()
            .ok_or_else(|| Error::authentication("No refresh token configured"))?;

        log::info!("Refreshing access token");
        let refreshed = refresher
            .refresh(previous_refresh_token.clone())
            .await
            .map_err(|e| match e {
                Error::Authentication(_) => e,
                other => Error::authentication(format!("Token refresh failed: {}", other)),
            })?;

        if refreshed.access_token.is_empty() {
            return Err(Error::authentication(
                "Refresh procedure returned an empty access token",
            ));
        }

        self.credentials.store(Arc::new(Credentials {
            access_token: refreshed.access_token,
            refresh_token: refreshed.refresh_token.or(Some(previous_refresh_token)),
            expires_at: refreshed.expires_at,
        }));
        log::debug!("Access token refreshed");
        Ok(())
    }
}

/// JWT bearer authentication with optional refresh
pub struct JwtAuth {
    state: TokenState,
}

impl JwtAuth {
    /// Create with an access token that never expires
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            state: TokenState::new(access_token.into()),
        }
    }

    /// Set the refresh token
    pub fn with_refresh_token(self, refresh_token: impl Into<String>) -> Self {
        let refresh_token = refresh_token.into();
        self.state.update(|c| c.refresh_token = Some(refresh_token));
        self
    }

    /// Set the expiry of the access token
    pub fn with_expires_at(self, expires_at: DateTime<Utc>) -> Self {
        self.state.update(|c| c.expires_at = Some(expires_at));
        self
    }

    /// Set the refresh procedure
    pub fn with_refresher(mut self, refresher: impl TokenRefresher + 'static) -> Self {
        self.state.refresher = Some(Arc::new(refresher));
        self
    }

    /// Current credentials
    pub fn credentials(&self) -> Credentials {
        self.state.snapshot()
    }
}

impl fmt::Debug for JwtAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtAuth")
            .field("credentials", &self.state.snapshot())
            .field("has_refresher", &self.state.refresher.is_some())
            .finish()
    }
}

#[async_trait]
impl Authenticator for JwtAuth {
    fn auth_type(&self) -> AuthType {
        AuthType::Jwt
    }

    fn auth_headers(&self) -> HashMap<String, String> {
        let credentials = self.state.credentials.load();
        HashMap::from([(
            AUTHORIZATION_HEADER.to_string(),
            format!("Bearer {}", credentials.access_token),
        )])
    }

    fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.state.is_expired_at(now)
    }

    async fn refresh(&self) -> Result<()> {
        self.state.refresh().await
    }
}

/// OAuth2 access-token authentication with optional refresh
pub struct OAuth2Auth {
    state: TokenState,
    token_type: String,
}

impl OAuth2Auth {
    /// Create with an access token and the default `Bearer` token type
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            state: TokenState::new(access_token.into()),
            token_type: "Bearer".to_string(),
        }
    }

    /// Set the token type used as the `Authorization` scheme
    pub fn with_token_type(mut self, token_type: impl Into<String>) -> Self {
        self.token_type = token_type.into();
        self
    }

    /// Set the refresh token
    pub fn with_refresh_token(self, refresh_token: impl Into<String>) -> Self {
        let refresh_token = refresh_token.into();
        self.state.update(|c| c.refresh_token = Some(refresh_token));
        self
    }

    /// Set the expiry of the access token
    pub fn with_expires_at(self, expires_at: DateTime<Utc>) -> Self {
        self.state.update(|c| c.expires_at = Some(expires_at));
        self
    }

    /// Set the refresh procedure
    pub fn with_refresher(mut self, refresher: impl TokenRefresher + 'static) -> Self {
        self.state.refresher = Some(Arc::new(refresher));
        self
    }

    /// Current credentials
    pub fn credentials(&self) -> Credentials {
        self.state.snapshot()
    }

    /// Token type used as the `Authorization` scheme
    pub fn token_type(&self) -> &str {
        &self.token_type
    }
}

impl fmt::Debug for OAuth2Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuth2Auth")
            .field("token_type", &self.token_type)
            .field("credentials", &self.state.snapshot())
            .field("has_refresher", &self.state.refresher.is_some())
            .finish()
    }
}

#[async_trait]
impl Authenticator for OAuth2Auth {
    fn auth_type(&self) -> AuthType {
        AuthType::OAuth2
    }

    fn auth_headers(&self) -> HashMap<String, String> {
        let credentials = self.state.credentials.load();
        HashMap::from([(
            AUTHORIZATION_HEADER.to_string(),
            format!("{} {}", self.token_type, credentials.access_token),
        )])
    }

    fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.state.is_expired_at(now)
    }

    async fn refresh(&self) -> Result<()> {
        self.state.refresh().await
    }
}
