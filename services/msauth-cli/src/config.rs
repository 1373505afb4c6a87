//! Configuration types and loading
//!
//! Config precedence: CLI args > env vars > config file > defaults.
//! The client secret is loaded from the MSAUTH_CLIENT_SECRET env var or
//! client_secret_file, never stored in the TOML directly.

use common::Secret;
use msauth::{Cloud, Credentials};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration
#[derive(Debug, Deserialize)]
pub struct Config {
    pub auth: AuthConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

/// Token endpoint and client-credentials settings
#[derive(Debug, Deserialize)]
pub struct AuthConfig {
    pub tenant_id: String,
    pub application_id: String,
    /// Audience of the requested token
    pub resource: String,
    #[serde(default)]
    pub cloud: Cloud,
    /// Custom authorization endpoint; overrides `cloud`
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(skip)]
    pub client_secret: Option<Secret<String>>,
    /// Path to a file containing the client secret (alternative to MSAUTH_CLIENT_SECRET)
    #[serde(default)]
    pub client_secret_file: Option<PathBuf>,
    #[serde(default)]
    pub refresh_margin_secs: u64,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

/// Downstream API settings
#[derive(Debug, Default, Deserialize)]
pub struct ApiConfig {
    /// Base URL request paths are resolved against
    #[serde(default)]
    pub base_url: Option<String>,
}

fn default_timeout() -> u64 {
    10
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

impl Config {
    /// Load configuration from a TOML file, then overlay environment variables.
    ///
    /// Client secret resolution order:
    /// 1. MSAUTH_CLIENT_SECRET env var
    /// 2. client_secret_file path from config
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;

        if config.auth.application_id.trim().is_empty() {
            return Err(common::Error::Config("application_id must not be empty".into()));
        }

        if let Some(endpoint) = &config.auth.endpoint
            && !is_http_url(endpoint)
        {
            return Err(common::Error::Config(format!(
                "endpoint must start with http:// or https://, got: {endpoint}"
            )));
        }

        if let Some(base_url) = &config.api.base_url
            && !is_http_url(base_url)
        {
            return Err(common::Error::Config(format!(
                "base_url must start with http:// or https://, got: {base_url}"
            )));
        }

        if config.auth.timeout_secs == 0 {
            return Err(common::Error::Config(
                "timeout_secs must be greater than 0".into(),
            ));
        }

        // Env var takes precedence over file
        if let Ok(secret) = std::env::var("MSAUTH_CLIENT_SECRET") {
            config.auth.client_secret = Some(Secret::new(secret));
        } else if let Some(ref secret_file) = config.auth.client_secret_file {
            let secret = std::fs::read_to_string(secret_file).map_err(|e| {
                common::Error::Config(format!(
                    "failed to read client_secret_file {}: {e}",
                    secret_file.display()
                ))
            })?;
            let secret = secret.trim().to_owned();
            if !secret.is_empty() {
                config.auth.client_secret = Some(Secret::new(secret));
            }
        }

        if config.auth.client_secret.is_none() {
            return Err(common::Error::Config(
                "no client secret: set MSAUTH_CLIENT_SECRET or client_secret_file".into(),
            ));
        }

        Ok(config)
    }

    /// Resolve config file path from CLI arg or MSAUTH_CONFIG env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("MSAUTH_CONFIG") {
            return PathBuf::from(p);
        }
        PathBuf::from("msauth.toml")
    }
}

impl AuthConfig {
    /// Authorization endpoint: explicit `endpoint`, else the `cloud` default.
    pub fn auth_endpoint(&self) -> &str {
        self.endpoint
            .as_deref()
            .unwrap_or_else(|| self.cloud.auth_endpoint())
    }

    pub fn credentials(&self) -> common::Result<Credentials> {
        let secret = self
            .client_secret
            .clone()
            .ok_or_else(|| common::Error::Config("client secret not loaded".into()))?;
        Ok(Credentials::new(
            self.tenant_id.clone(),
            self.application_id.clone(),
            secret,
            self.resource.clone(),
        )
        .with_auth_endpoint(self.auth_endpoint()))
    }

    pub fn refresh_margin(&self) -> Duration {
        Duration::from_secs(self.refresh_margin_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
