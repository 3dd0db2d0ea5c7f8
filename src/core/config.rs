use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

use crate::core::errors::BorderHopError;

pub const CIRCLE_MAINNET_URL: &str = "https://api.circle.com/v1";
pub const CIRCLE_SANDBOX_URL: &str = "https://api-sandbox.circle.com/v1";

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "ServerConfig::default_host")]
    pub host: String,
    #[serde(default = "ServerConfig::default_port")]
    pub port: u16,
    /// Comma separated list of allowed origins
    #[serde(default = "ServerConfig::default_cors_origin")]
    pub cors_allow_origin: String,
}

impl ServerConfig {
    fn default_host() -> String { "0.0.0.0".to_string() }
    fn default_port() -> u16 { 3001 }
    fn default_cors_origin() -> String { "http://localhost:5173".to_string() }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            port: Self::default_port(),
            cors_allow_origin: Self::default_cors_origin(),
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Primary database. `None` runs the in-memory store only.
    #[serde(default = "StorageConfig::default_database_url")]
    pub database_url: Option<String>,
    #[serde(default = "StorageConfig::default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "StorageConfig::default_connect_attempts")]
    pub connect_attempts: u32,
    /// Upper bound for the exponential connect backoff
    #[serde(default = "StorageConfig::default_backoff_cap_ms")]
    pub backoff_cap_ms: u64,
}

impl StorageConfig {
    fn default_database_url() -> Option<String> {
        Some("sqlite://./data/borderhop.db?mode=rwc".to_string())
    }
    fn default_max_connections() -> u32 { 10 }
    fn default_connect_attempts() -> u32 { 5 }
    fn default_backoff_cap_ms() -> u64 { 10_000 }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_url: Self::default_database_url(),
            max_connections: Self::default_max_connections(),
            connect_attempts: Self::default_connect_attempts(),
            backoff_cap_ms: Self::default_backoff_cap_ms(),
        }
    }
}

/// Circle CCTP V2 API configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct CircleConfig {
    /// `mainnet` selects the production API, anything else the sandbox
    #[serde(default = "CircleConfig::default_environment")]
    pub environment: String,
    /// Explicit base URL; derived from `environment` when unset
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub client_key: Option<String>,
    #[serde(default = "CircleConfig::default_timeout_secs")]
    pub timeout_secs: u64,
    /// Initiate real burns on `POST /transfer`
    #[serde(default)]
    pub live_transfers: bool,
}

impl CircleConfig {
    fn default_environment() -> String { "sandbox".to_string() }
    fn default_timeout_secs() -> u64 { 15 }

    pub fn effective_base_url(&self) -> String {
        if let Some(url) = self.base_url.as_deref().filter(|u| !u.is_empty()) {
            return url.trim_end_matches('/').to_string();
        }
        if self.environment == "mainnet" {
            CIRCLE_MAINNET_URL.to_string()
        } else {
            CIRCLE_SANDBOX_URL.to_string()
        }
    }

    pub fn api_configured(&self) -> bool {
        self.api_key.as_deref().map_or(false, |k| !k.is_empty())
    }

    pub fn client_configured(&self) -> bool {
        self.client_key.as_deref().map_or(false, |k| !k.is_empty())
    }
}

impl Default for CircleConfig {
    fn default() -> Self {
        Self {
            environment: Self::default_environment(),
            base_url: None,
            api_key: None,
            client_key: None,
            timeout_secs: Self::default_timeout_secs(),
            live_transfers: false,
        }
    }
}

impl std::fmt::Debug for CircleConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircleConfig")
            .field("environment", &self.environment)
            .field("base_url", &self.effective_base_url())
            .field("api_key", &self.api_configured().then_some("<redacted>"))
            .field("client_key", &self.client_configured().then_some("<redacted>"))
            .field("timeout_secs", &self.timeout_secs)
            .field("live_transfers", &self.live_transfers)
            .finish()
    }
}

/// Chain RPC configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChainsConfig {
    #[serde(default)]
    pub infura_project_id: Option<String>,
}

/// Inbound webhook configuration
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct WebhookConfig {
    #[serde(default)]
    pub secret: Option<String>,
    /// Reject webhooks without a valid `X-Circle-Signature`
    #[serde(default)]
    pub verify_signature: bool,
}

impl std::fmt::Debug for WebhookConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookConfig")
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .field("verify_signature", &self.verify_signature)
            .finish()
    }
}

/// Demo status progression thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemoConfig {
    #[serde(default = "DemoConfig::default_enabled")]
    pub enabled: bool,
    #[serde(default = "DemoConfig::default_cctp_id_after")]
    pub cctp_id_after_secs: i64,
    #[serde(default = "DemoConfig::default_burn_after")]
    pub burn_after_secs: i64,
    #[serde(default = "DemoConfig::default_complete_after")]
    pub complete_after_secs: i64,
}

impl DemoConfig {
    fn default_enabled() -> bool { true }
    fn default_cctp_id_after() -> i64 { 10 }
    fn default_burn_after() -> i64 { 20 }
    fn default_complete_after() -> i64 { 30 }
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            enabled: Self::default_enabled(),
            cctp_id_after_secs: Self::default_cctp_id_after(),
            burn_after_secs: Self::default_burn_after(),
            complete_after_secs: Self::default_complete_after(),
        }
    }
}

/// Service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub circle: CircleConfig,
    #[serde(default)]
    pub chains: ChainsConfig,
    #[serde(default)]
    pub webhook: WebhookConfig,
    #[serde(default)]
    pub demo: DemoConfig,
}

impl AppConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, BorderHopError> {
        toml::from_str(content).map_err(|e| BorderHopError::ConfigError(e.to_string()))
    }

    /// Load the config file at `path`, falling back to defaults when it does not
    /// exist, then apply environment overrides.
    pub fn load(path: &Path) -> Result<Self, BorderHopError> {
        let mut config = match std::fs::read_to_string(path) {
            Ok(content) => {
                info!("Loaded configuration from {}", path.display());
                Self::from_toml_str(&content)?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Config file {} not found. Using default configuration", path.display());
                Self::default()
            }
            Err(e) => {
                return Err(BorderHopError::ConfigError(format!(
                    "failed to read {}: {}",
                    path.display(),
                    e
                )))
            }
        };
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply overrides from an environment lookup.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), BorderHopError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("PORT") {
            self.server.port = port
                .trim()
                .parse()
                .map_err(|_| BorderHopError::ConfigError(format!("invalid PORT: {}", port)))?;
        }
        if let Some(origin) = lookup("CORS_ALLOW_ORIGIN") {
            self.server.cors_allow_origin = origin;
        }
        if let Some(url) = lookup("DATABASE_URL") {
            self.storage.database_url = if url.trim().is_empty() { None } else { Some(url) };
        }
        if let Some(key) = lookup("CIRCLE_API_KEY") {
            self.circle.api_key = Some(key);
        }
        if let Some(key) = lookup("CIRCLE_CLIENT_KEY") {
            self.circle.client_key = Some(key);
        }
        if let Some(env) = lookup("CIRCLE_ENVIRONMENT") {
            self.circle.environment = env;
        }
        if let Some(url) = lookup("CIRCLE_BASE_URL") {
            self.circle.base_url = Some(url);
        }
        if let Some(id) = lookup("INFURA_PROJECT_ID") {
            self.chains.infura_project_id = Some(id);
        }
        if let Some(secret) = lookup("WEBHOOK_SECRET") {
            self.webhook.secret = Some(secret);
        }
        Ok(())
    }
}
