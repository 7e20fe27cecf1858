//! Server configuration: backend client settings and the optional TOML file.
//!
//! Precedence is CLI flag > environment > file > default. The API key itself
//! only ever comes from the environment; the file may name the variable that
//! holds it with `${VAR}` syntax.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ServerError;

/// Production PagerDuty REST endpoint.
pub const DEFAULT_API_HOST: &str = "https://api.pagerduty.com";

/// Fixed per-request timeout for backend calls.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Environment variable holding the default API credential.
pub const ENV_API_KEY: &str = "PAGERDUTY_USER_API_KEY";
/// Environment variable overriding the API host.
pub const ENV_API_HOST: &str = "PAGERDUTY_API_HOST";
/// Environment variable supplying the `From` header email.
pub const ENV_FROM_EMAIL: &str = "PAGERDUTY_FROM_EMAIL";

/// Strip an env var reference to its variable name.
///
/// Accepts `${VAR_NAME}` syntax only.
pub fn parse_env_ref(value: &str) -> Option<&str> {
    value
        .strip_prefix("${")
        .and_then(|s| s.strip_suffix('}'))
        .filter(|name| !name.is_empty())
}

/// Settings for the backend gateway. Built once at startup and moved into
/// [`crate::gateway::PagerDutyClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Process-wide default credential
    pub api_key: String,
    /// Base URL without a trailing slash
    pub api_host: String,
    /// Sent as the `From` header when present
    pub from_email: Option<String>,
    pub timeout: Duration,
}

impl ClientConfig {
    /// Config against the production host with the default timeout.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_host: DEFAULT_API_HOST.to_string(),
            from_email: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_api_host(mut self, host: impl Into<String>) -> Self {
        self.api_host = host.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_from_email(mut self, email: impl Into<String>) -> Self {
        self.from_email = Some(email.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Resolve the client config from an environment lookup and the file config.
    ///
    /// `env` is injected so tests never touch the process environment.
    pub fn resolve<F>(env: F, file: &FileConfig) -> crate::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        let api_key = match non_empty(ENV_API_KEY) {
            Some(key) => key,
            None => file
                .api_key
                .as_deref()
                .and_then(parse_env_ref)
                .and_then(|var| non_empty(var))
                .ok_or_else(|| {
                    ServerError::InvalidConfig(
                        ENV_API_KEY.to_string(),
                        "environment variable is required".to_string(),
                    )
                })?,
        };

        let mut config = Self::new(api_key);
        if let Some(host) = non_empty(ENV_API_HOST).or_else(|| file.api_host.clone()) {
            config = config.with_api_host(host);
        }
        if let Some(email) = non_empty(ENV_FROM_EMAIL).or_else(|| file.from_email.clone()) {
            config = config.with_from_email(email);
        }
        config.validate()?;
        Ok(config)
    }

    /// Fail fast on values the gateway cannot use.
    pub fn validate(&self) -> crate::Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(ServerError::InvalidConfig(
                "api_key".to_string(),
                "must not be empty".to_string(),
            ));
        }
        if !is_http_url(&self.api_host) {
            return Err(ServerError::InvalidConfig(
                "api_host".to_string(),
                format!("'{}' is not an http(s) URL", self.api_host),
            ));
        }
        Ok(())
    }
}

/// Optional `pagerduty-mcp.toml` contents. Every field may be omitted.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    /// Must be a `${VAR}` reference, never a literal key
    pub api_key: Option<String>,
    pub api_host: Option<String>,
    pub from_email: Option<String>,
    pub enable_write_tools: Option<bool>,
    #[serde(default)]
    pub http: HttpFileConfig,
}

/// `[http]` table of the config file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HttpFileConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    /// Delegate authorization to this URL instead of allowing every caller
    pub auth_url: Option<String>,
}

impl FileConfig {
    /// Read and validate a config file.
    pub async fn load(path: &Path) -> crate::Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ServerError::ConfigFile(path.display().to_string(), e.to_string()))?;
        let config = Self::parse(&content)
            .map_err(|e| ServerError::ConfigFile(path.display().to_string(), e.to_string()))?;
        Ok(config)
    }

    /// Parse and validate TOML text.
    pub fn parse(content: &str) -> crate::Result<Self> {
        let config: FileConfig = toml::from_str(content)
            .map_err(|e| ServerError::InvalidConfig("toml".to_string(), e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> crate::Result<()> {
        if let Some(key) = &self.api_key {
            if parse_env_ref(key).is_none() {
                return Err(ServerError::InvalidConfig(
                    "api_key".to_string(),
                    "must be an env var reference like ${PAGERDUTY_USER_API_KEY}".to_string(),
                ));
            }
        }
        if let Some(host) = &self.api_host {
            if !is_http_url(host) {
                return Err(ServerError::InvalidConfig(
                    "api_host".to_string(),
                    format!("'{host}' is not an http(s) URL"),
                ));
            }
        }
        if let Some(url) = &self.http.auth_url {
            if !is_http_url(url) {
                return Err(ServerError::InvalidConfig(
                    "http.auth_url".to_string(),
                    format!("'{url}' is not an http(s) URL"),
                ));
            }
        }
        Ok(())
    }
}

fn is_http_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}
