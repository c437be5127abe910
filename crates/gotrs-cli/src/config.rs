//! Configuration management for the CLI
//!
//! This module handles loading and merging configuration from:
//! - Default values
//! - Configuration files (YAML/JSON/TOML)
//! - Environment variables (including a `.env` file)
//! - Command-line arguments
//!
//! Later sources win.

use crate::cli::Cli;
use crate::error::{Error, Result};
use gotrs_core::{ApiKeyAuth, Authenticator, ClientConfig, JwtAuth, NoAuth, OAuth2Auth};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the GOTRS server
    pub base_url: Option<String>,

    /// Request timeout in seconds
    pub timeout: Option<f64>,

    /// Retries after the first attempt
    pub max_retries: Option<u32>,

    /// User agent override
    pub user_agent: Option<String>,

    /// Log retries at warn level
    pub debug: bool,

    /// Credentials
    pub auth: AuthConfig,

    /// Headers added to every request
    pub headers: HashMap<String, String>,
}

/// Credential settings; at most one scheme is used
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// API key sent as `X-API-Key`
    pub api_key: Option<String>,

    /// Access token sent in the `Authorization` header
    pub token: Option<String>,

    /// OAuth2 token type; when set the token is treated as an OAuth2 token
    pub token_type: Option<String>,
}

impl Config {
    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::FileNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path)?;
        let config = match path.extension().and_then(|s| s.to_str()) {
            Some("yaml") | Some("yml") => serde_yaml::from_str(&content)?,
            Some("toml") => toml::from_str(&content)?,
            _ => serde_json::from_str(&content)?,
        };

        Ok(config)
    }

    /// Load configuration from default locations
    pub fn load() -> Result<Self> {
        for path in Self::default_config_paths() {
            if path.exists() {
                match Self::from_file(&path) {
                    Ok(config) => {
                        tracing::debug!(path = %path.display(), "Loaded configuration file");
                        return Ok(config);
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", path.display(), e);
                    }
                }
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file or default locations
    pub fn load_with_file(file: Option<&Path>) -> Result<Self> {
        match file {
            Some(path) => Self::from_file(path),
            None => Self::load(),
        }
    }

    /// Get default configuration file paths to check
    fn default_config_paths() -> Vec<PathBuf> {
        let mut paths = vec![
            PathBuf::from(".gotrs.yaml"),
            PathBuf::from(".gotrs.json"),
            PathBuf::from(".gotrs.toml"),
        ];

        if let Some(config_dir) = dirs::config_dir() {
            let gotrs_dir = config_dir.join("gotrs");
            paths.push(gotrs_dir.join("config.yaml"));
            paths.push(gotrs_dir.join("config.json"));
            paths.push(gotrs_dir.join("config.toml"));
        }

        paths
    }

    /// Overlay `GOTRS_*` variables not covered by command-line flags
    pub fn apply_env(&mut self) -> Result<()> {
        if let Ok(value) = std::env::var("GOTRS_MAX_RETRIES") {
            self.max_retries = Some(
                value
                    .trim()
                    .parse()
                    .map_err(|_| Error::config(format!("Invalid GOTRS_MAX_RETRIES: {}", value)))?,
            );
        }
        if let Ok(value) = std::env::var("GOTRS_TIMEOUT_SECS") {
            self.timeout = Some(
                value
                    .trim()
                    .parse()
                    .map_err(|_| Error::config(format!("Invalid GOTRS_TIMEOUT_SECS: {}", value)))?,
            );
        }
        if let Ok(value) = std::env::var("GOTRS_USER_AGENT") {
            self.user_agent = Some(value);
        }
        if let Ok(value) = std::env::var("GOTRS_DEBUG") {
            self.debug = matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on");
        }
        Ok(())
    }

    /// Overlay command-line flags; clap already folded their env fallbacks in
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(base_url) = &cli.base_url {
            self.base_url = Some(base_url.clone());
        }
        if let Some(timeout) = cli.timeout {
            self.timeout = Some(timeout);
        }
        if let Some(retries) = cli.retries {
            self.max_retries = Some(retries);
        }
        if let Some(api_key) = &cli.api_key {
            self.auth = AuthConfig {
                api_key: Some(api_key.clone()),
                ..Default::default()
            };
        }
        if let Some(token) = &cli.token {
            self.auth.api_key = None;
            self.auth.token = Some(token.clone());
        }
    }

    /// Build the client configuration
    pub fn client_config(&self) -> Result<ClientConfig> {
        let base_url = self.base_url.as_deref().ok_or_else(|| {
            Error::config("No base URL configured. Set --base-url, GOTRS_BASE_URL or base_url in the config file")
        })?;

        let mut config = ClientConfig::new(base_url).with_debug(self.debug);
        if let Some(timeout) = self.timeout {
            let timeout = Duration::try_from_secs_f64(timeout)
                .map_err(|e| Error::config(format!("Invalid timeout {}: {}", timeout, e)))?;
            config = config.with_timeout(timeout);
        }
        if let Some(max_retries) = self.max_retries {
            config = config.with_max_retries(max_retries);
        }
        if let Some(user_agent) = &self.user_agent {
            config = config.with_user_agent(user_agent.clone());
        }

        config.validate()?;
        Ok(config)
    }

    /// Build the authenticator for the configured credentials
    pub fn authenticator(&self) -> Arc<dyn Authenticator> {
        match (&self.auth.api_key, &self.auth.token, &self.auth.token_type) {
            (Some(key), _, _) => Arc::new(ApiKeyAuth::new(key.clone())),
            (None, Some(token), Some(token_type)) => {
                Arc::new(OAuth2Auth::new(token.clone()).with_token_type(token_type.clone()))
            }
            (None, Some(token), None) => Arc::new(JwtAuth::new(token.clone())),
            (None, None, _) => Arc::new(NoAuth),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use gotrs_core::AuthType;
    use std::io::Write;

    #[test]
    fn test_yaml_config_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            "base_url: https://tickets.example.com/\ntimeout: 5\nmax_retries: 1\nauth:\n  api_key: abc123\nheaders:\n  X-Tenant: acme"
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.base_url.as_deref(), Some("https://tickets.example.com/"));
        assert_eq!(config.headers.get("X-Tenant").map(String::as_str), Some("acme"));

        let client_config = config.client_config().unwrap();
        assert_eq!(client_config.base_url, "https://tickets.example.com");
        assert_eq!(client_config.timeout, Duration::from_secs(5));
        assert_eq!(client_config.max_retries, 1);
        assert_eq!(config.authenticator().auth_type(), AuthType::ApiKey);
    }

    #[test]
    fn test_json_and_toml_config_files() {
        let mut json = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(json, r#"{{"base_url": "https://x.test", "auth": {{"token": "t", "token_type": "MAC"}}}}"#).unwrap();
        let config = Config::from_file(json.path()).unwrap();
        assert_eq!(config.authenticator().auth_type(), AuthType::OAuth2);

        let mut toml_file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        write!(toml_file, "base_url = \"https://x.test\"\n[auth]\ntoken = \"t\"\n").unwrap();
        let config = Config::from_file(toml_file.path()).unwrap();
        assert_eq!(config.authenticator().auth_type(), AuthType::Jwt);
    }

    #[test]
    fn test_missing_file() {
        let err = Config::from_file(Path::new("/definitely/not/here.yaml")).unwrap_err();
        assert!(matches!(err, Error::FileNotFound { .. }));
    }

    #[test]
    fn test_missing_base_url() {
        let err = Config::default().client_config().unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_cli_flags_override_file() {
        let mut config = Config {
            base_url: Some("https://file.test".to_string()),
            max_retries: Some(5),
            auth: AuthConfig {
                api_key: Some("file-key".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        let cli = Cli::try_parse_from([
            "gotrs",
            "--base-url",
            "https://flag.test",
            "--retries",
            "0",
            "--token",
            "flag-token",
            "ping",
        ])
        .unwrap();

        config.apply_cli(&cli);
        assert_eq!(config.base_url.as_deref(), Some("https://flag.test"));
        assert_eq!(config.max_retries, Some(0));
        assert_eq!(config.authenticator().auth_type(), AuthType::Jwt);
    }

    #[test]
    fn test_no_credentials_means_no_auth() {
        assert_eq!(Config::default().authenticator().auth_type(), AuthType::None);
    }
}
