//! Server configuration.

use chrono::{DateTime, Utc};
use first_rule_core::types::{PartnerApiKey, PartnerModelAccess, PartnerOrganization, VoiceModel};
use first_rule_partner_auth::PartnerAuthConfig;
use serde::{Deserialize, Serialize};

/// Environment variable that overrides `webhook.secret`.
pub const WEBHOOK_SECRET_ENV: &str = "OPENPLAY_WEBHOOK_SECRET";

/// Everything read from the TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub webhook: WebhookConfig,
    pub partner_api: PartnerApiConfig,
    /// Seed data for the in-memory store.
    pub partners: Vec<PartnerOrganization>,
    pub api_keys: Vec<ApiKeySeed>,
    pub voice_models: Vec<VoiceModel>,
    pub model_access: Vec<PartnerModelAccess>,
}

/// Server-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Port to listen on.
    pub port: u16,
    /// Host to bind to.
    pub host: String,
    /// Log level, used when `RUST_LOG` is unset.
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            host: "0.0.0.0".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// OpenPlay webhook configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookConfig {
    /// Shared HMAC secret. Without it every delivery is rejected.
    pub secret: Option<String>,
    /// Primary signature header.
    pub signature_header: String,
    /// Seconds between replays of failed envelopes. 0 disables the pass.
    pub retry_interval_secs: u64,
    /// Envelopes that have run this many times are left for an operator.
    pub retry_max_attempts: u32,
    /// Envelopes replayed per pass.
    pub retry_batch_size: usize,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            secret: None,
            signature_header: "x-openplay-signature".to_string(),
            retry_interval_secs: 60,
            retry_max_attempts: 5,
            retry_batch_size: 50,
        }
    }
}

/// Partner API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PartnerApiConfig {
    pub api_key_header: String,
    pub rate_limit_enabled: bool,
    pub rate_limit_window_ms: i64,
}

impl Default for PartnerApiConfig {
    fn default() -> Self {
        let auth = PartnerAuthConfig::default();
        Self {
            api_key_header: auth.api_key_headers.first().cloned().unwrap_or_default(),
            rate_limit_enabled: auth.rate_limit_enabled,
            rate_limit_window_ms: auth.rate_limit_window_ms,
        }
    }
}

impl PartnerApiConfig {
    pub fn to_auth_config(&self) -> PartnerAuthConfig {
        let config = PartnerAuthConfig::new()
            .api_key_headers(vec![self.api_key_header.to_ascii_lowercase()])
            .rate_limit_window_ms(self.rate_limit_window_ms);
        if self.rate_limit_enabled {
            config
        } else {
            config.disable_rate_limit()
        }
    }
}

/// A pre-issued API key. Only the hash of the key is configured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiKeySeed {
    pub partner_id: String,
    pub name: String,
    pub key_hash: String,
    #[serde(default)]
    pub key_prefix: String,
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,
    #[serde(default = "default_rate_limit")]
    pub rate_limit_per_minute: u32,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

fn default_scopes() -> Vec<String> {
    vec!["read".to_string()]
}

fn default_rate_limit() -> u32 {
    60
}

fn default_true() -> bool {
    true
}

impl ApiKeySeed {
    pub fn to_record(&self) -> PartnerApiKey {
        let mut key = PartnerApiKey::new(
            &self.partner_id,
            &self.name,
            self.key_hash.to_ascii_lowercase(),
            &self.key_prefix,
        )
        .with_scopes(self.scopes.clone())
        .with_rate_limit(self.rate_limit_per_minute);
        key.is_active = self.is_active;
        if let Some(expires_at) = self.expires_at {
            key = key.with_expires_at(expires_at);
        }
        key
    }
}

impl Config {
    /// Applies environment overrides through `lookup`.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(secret) = lookup(WEBHOOK_SECRET_ENV).filter(|s| !s.is_empty()) {
            self.webhook.secret = Some(secret);
        }
    }

    /// Applies overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }
}

/// Loads configuration from a TOML file. A missing file yields defaults.
pub fn load_config(path: &str) -> Result<Config, ConfigError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Config::default()),
        Err(e) => return Err(ConfigError::IoError(e.to_string())),
    };

    parse_config(&content)
}

/// Parses configuration from TOML text.
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),
    #[error("Parse error: {0}")]
    ParseError(String),
}
