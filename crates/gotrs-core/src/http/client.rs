//! Unified HTTP client orchestrating all components
//!
//! Provides a high-level interface for making authenticated, retryable
//! requests against the GOTRS API. One client owns one connection pool and
//! is meant to be shared; every method takes `&self`.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::multipart::{Form, Part};
use reqwest::{Client as ReqwestClient, Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::auth::{ApiKeyAuth, Authenticator, JwtAuth, NoAuth};
use crate::error::{Error, Result};
use crate::http::{
    builder::{RequestBuilder, RequestOptions},
    config::ClientConfig,
    normalizer,
    retry::{execute_with_retry, RetryPolicy},
};

/// Path probed by [`HttpClient::ping`]
pub const HEALTH_PATH: &str = "/api/v1/health";

/// Default content type for uploaded files
const DEFAULT_UPLOAD_CONTENT_TYPE: &str = "application/octet-stream";

/// A file to send as a multipart upload
#[derive(Debug, Clone)]
pub struct FileUpload {
    data: Vec<u8>,
    filename: String,
    content_type: Option<String>,
    fields: HashMap<String, String>,
}

impl FileUpload {
    /// Create an upload for raw bytes
    pub fn new(data: impl Into<Vec<u8>>, filename: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            filename: filename.into(),
            content_type: None,
            fields: HashMap::new(),
        }
    }

    /// Set the content type of the file part
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Add an extra form field
    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Add several extra form fields
    pub fn fields(mut self, fields: HashMap<String, String>) -> Self {
        self.fields.extend(fields);
        self
    }

    /// File name sent with the file part
    pub fn filename(&self) -> &str {
        &self.filename
    }

    // Forms are consumed by the transport, so every attempt builds its own.
    fn to_form(&self) -> Result<Form> {
        let content_type = self
            .content_type
            .as_deref()
            .unwrap_or(DEFAULT_UPLOAD_CONTENT_TYPE);
        let part = Part::bytes(self.data.clone())
            .file_name(self.filename.clone())
            .mime_str(content_type)
            .map_err(|e| {
                Error::validation(
                    format!("Invalid content type {}: {}", content_type, e),
                    Some("content_type".to_string()),
                    Some(Value::String(content_type.to_string())),
                )
            })?;

        let form = self
            .fields
            .iter()
            .fold(Form::new(), |form, (name, value)| form.text(name.clone(), value.clone()));
        Ok(form.part("file", part))
    }
}

#[derive(Clone, Copy)]
enum Payload<'a> {
    Empty,
    Json(&'a Value),
    Multipart(&'a FileUpload),
}

/// Unified HTTP client for the GOTRS API
pub struct HttpClient {
    /// Underlying reqwest client
    client: ReqwestClient,
    /// Request builder for URLs and headers
    request_builder: RequestBuilder,
    /// Active authenticator
    auth: Arc<dyn Authenticator>,
    /// Client configuration
    config: ClientConfig,
    /// Retry policy derived from the configuration
    retry_policy: RetryPolicy,
}

impl HttpClient {
    /// Create a client from configuration and an authenticator
    pub fn new(config: ClientConfig, auth: Arc<dyn Authenticator>) -> Result<Self> {
        config.validate()?;

        let mut default_headers = HeaderMap::new();
        default_headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = ReqwestClient::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.as_str())
            .default_headers(default_headers)
            .connection_verbose(config.debug)
            .build()
            .map_err(|e| Error::configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            request_builder: RequestBuilder::new(&config.base_url),
            auth,
            retry_policy: RetryPolicy::from_config(&config),
            config,
        })
    }

    /// Create an unauthenticated client with default settings
    pub fn unauthenticated(base_url: &str) -> Result<Self> {
        Self::new(ClientConfig::new(base_url), Arc::new(NoAuth))
    }

    /// Create a client using API-key authentication
    pub fn with_api_key(base_url: &str, api_key: impl Into<String>) -> Result<Self> {
        Self::new(ClientConfig::new(base_url), Arc::new(ApiKeyAuth::new(api_key)))
    }

    /// Create a client using JWT authentication
    ///
    /// Without a refresher the token cannot be renewed; use [`HttpClient::set_auth`]
    /// with a [`JwtAuth`] carrying one for long-lived sessions.
    pub fn with_jwt(
        base_url: &str,
        token: impl Into<String>,
        refresh_token: Option<String>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<Self> {
        let mut auth = JwtAuth::new(token);
        if let Some(refresh_token) = refresh_token {
            auth = auth.with_refresh_token(refresh_token);
        }
        if let Some(expires_at) = expires_at {
            auth = auth.with_expires_at(expires_at);
        }
        Self::new(ClientConfig::new(base_url), Arc::new(auth))
    }

    /// Replace the active authenticator
    pub fn set_auth(&mut self, auth: Arc<dyn Authenticator>) {
        log::debug!("Switching authentication to {}", auth.auth_type());
        self.auth = auth;
    }

    /// The active authenticator
    pub fn auth(&self) -> &Arc<dyn Authenticator> {
        &self.auth
    }

    /// Client configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Release the connection pool
    ///
    /// Dropping the client has the same effect; this only makes the release
    /// point explicit.
    pub fn close(self) {
        log::debug!("Closing HTTP client for {}", self.config.base_url);
    }

    /// GET a resource
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.get_with(path, RequestOptions::new()).await
    }

    /// GET a resource with query parameters or extra headers
    pub async fn get_with<T: DeserializeOwned>(&self, path: &str, options: RequestOptions) -> Result<T> {
        self.request(Method::GET, path, options).await
    }

    /// POST a JSON body
    pub async fn post<T, B>(&self, path: &str, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.post_with(path, RequestOptions::new().json(body)?).await
    }

    /// POST with full request options
    pub async fn post_with<T: DeserializeOwned>(&self, path: &str, options: RequestOptions) -> Result<T> {
        self.request(Method::POST, path, options).await
    }

    /// PUT a JSON body
    pub async fn put<T, B>(&self, path: &str, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.put_with(path, RequestOptions::new().json(body)?).await
    }

    /// PUT with full request options
    pub async fn put_with<T: DeserializeOwned>(&self, path: &str, options: RequestOptions) -> Result<T> {
        self.request(Method::PUT, path, options).await
    }

    /// PATCH a JSON body
    pub async fn patch<T, B>(&self, path: &str, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.patch_with(path, RequestOptions::new().json(body)?).await
    }

    /// PATCH with full request options
    pub async fn patch_with<T: DeserializeOwned>(&self, path: &str, options: RequestOptions) -> Result<T> {
        self.request(Method::PATCH, path, options).await
    }

    /// DELETE a resource
    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.delete_with(path, RequestOptions::new()).await
    }

    /// DELETE with full request options
    pub async fn delete_with<T: DeserializeOwned>(&self, path: &str, options: RequestOptions) -> Result<T> {
        self.request(Method::DELETE, path, options).await
    }

    /// Send a request with any method and decode the unwrapped response
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        options: RequestOptions,
    ) -> Result<T> {
        let payload = match &options.body {
            Some(body) => Payload::Json(body),
            None => Payload::Empty,
        };
        let (status, body) = self.execute(method, path, &options, payload).await?;
        normalizer::normalize(status, &String::from_utf8_lossy(&body))
    }

    /// Upload a file as `multipart/form-data` under the form name `file`
    pub async fn upload_file<T: DeserializeOwned>(&self, path: &str, upload: FileUpload) -> Result<T> {
        self.upload_file_with(path, upload, RequestOptions::new()).await
    }

    /// Upload a file with query parameters or extra headers
    ///
    /// A JSON body in `options` is ignored; the multipart form is the body.
    pub async fn upload_file_with<T: DeserializeOwned>(
        &self,
        path: &str,
        upload: FileUpload,
        options: RequestOptions,
    ) -> Result<T> {
        let (status, body) = self
            .execute(Method::POST, path, &options, Payload::Multipart(&upload))
            .await?;
        normalizer::normalize(status, &String::from_utf8_lossy(&body))
    }

    /// Download raw bytes; no envelope unwrapping is applied
    pub async fn download_file(&self, path: &str) -> Result<Vec<u8>> {
        self.download_file_with(path, RequestOptions::new()).await
    }

    /// Download raw bytes with query parameters or extra headers
    pub async fn download_file_with(&self, path: &str, options: RequestOptions) -> Result<Vec<u8>> {
        let (_, body) = self.execute(Method::GET, path, &options, Payload::Empty).await?;
        Ok(body)
    }

    /// Check service health
    ///
    /// A failed response keeps its classification but is reported as
    /// "Health check failed", with the service's own message as details.
    pub async fn ping(&self) -> Result<()> {
        match self
            .execute(Method::GET, HEALTH_PATH, &RequestOptions::new(), Payload::Empty)
            .await
        {
            Ok(_) => Ok(()),
            Err(mut error) if error.status_code().is_some() => {
                let context = error.context_mut();
                let original = std::mem::replace(&mut context.message, "Health check failed".to_string());
                if context.details.is_none() {
                    context.details = Some(original);
                }
                Err(error)
            }
            Err(error) => Err(error),
        }
    }

    /// Headers for one logical request, refreshing credentials first if needed
    async fn prepare_headers(&self, extra: &HashMap<String, String>) -> Result<HeaderMap> {
        if self.auth.is_expired() {
            log::info!("Credentials expired, refreshing {} token", self.auth.auth_type());
            self.auth.refresh().await?;
        }
        self.request_builder.merge_headers(extra, &self.auth.auth_headers())
    }

    /// Run the retry loop for one logical request and return the success body
    async fn execute(
        &self,
        method: Method,
        path: &str,
        options: &RequestOptions,
        payload: Payload<'_>,
    ) -> Result<(StatusCode, Vec<u8>)> {
        let url = self.request_builder.build_url(path, &options.query)?;
        let mut headers = self.prepare_headers(&options.headers).await?;
        if let Payload::Multipart(_) = payload {
            headers.remove(CONTENT_TYPE);
        }

        log::debug!("{} {}", method, url);

        let client = &self.client;
        let method = &method;
        let url = &url;
        let headers = &headers;
        let timeout = self.config.timeout;

        execute_with_retry(&self.retry_policy, move |_attempt| async move {
            let request = client
                .request(method.clone(), url.clone())
                .headers(headers.clone());
            let request = match payload {
                Payload::Empty => request,
                Payload::Json(body) => request.json(body),
                Payload::Multipart(upload) => request.multipart(upload.to_form()?),
            };

            let response = request
                .send()
                .await
                .map_err(|e| Error::from_transport(e, method.as_str(), url.as_str(), timeout))?;
            read_response(response, method, url, timeout).await
        })
        .await
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("base_url", &self.config.base_url)
            .field("auth", &self.auth)
            .field("retry_policy", &self.retry_policy)
            .finish()
    }
}

/// Read a response, classifying non-success statuses
async fn read_response(
    response: reqwest::Response,
    method: &Method,
    url: &Url,
    timeout: std::time::Duration,
) -> Result<(StatusCode, Vec<u8>)> {
    let status = response.status();
    if status.is_success() {
        let body = response
            .bytes()
            .await
            .map_err(|e| Error::from_transport(e, method.as_str(), url.as_str(), timeout))?;
        return Ok((status, body.to_vec()));
    }

    let headers = response.headers().clone();
    let body = response.text().await.unwrap_or_default();
    let error = Error::from_response(status, &headers, &body);
    log::debug!("{} {} failed: {}", method, url, error);
    Err(error)
}
