//! # First Rule Server
//!
//! Standalone server hosting the OpenPlay webhook endpoint and the partner
//! API on an in-memory store seeded from configuration.

pub mod config;

pub use config::{
    ApiKeySeed, Config, ConfigError, PartnerApiConfig, ServerConfig, WebhookConfig, load_config,
};

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use first_rule_adapter_memory::MemoryAdapter;
use first_rule_axum::{AppState, app_routes};
use first_rule_core::StoreError;
use first_rule_core::traits::PartnerStore;
use first_rule_partner_auth::{PartnerAuthConfig, PartnerAuthenticator, PartnerKeyGenerator, Scope};
use first_rule_webhooks::{WebhookSystem, WebhookVerifier};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{error, info, warn};

/// Server error.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Failed to seed store: {0}")]
    Seed(#[from] StoreError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// The assembled service: a seeded store and the routes over it.
pub struct FirstRuleServer {
    config: Config,
    store: Arc<MemoryAdapter>,
}

impl FirstRuleServer {
    /// Builds the store and loads the configured seed data into it.
    pub async fn new(config: Config) -> Result<Self, ServerError> {
        let store = Arc::new(MemoryAdapter::new());
        seed(&store, &config).await?;
        Ok(Self { config, store })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &Arc<MemoryAdapter> {
        &self.store
    }

    /// Creates the webhook pipeline over the store.
    pub fn webhook_system(&self) -> WebhookSystem {
        let verifier = WebhookVerifier::new(self.config.webhook.secret.clone());
        if !verifier.is_configured() {
            error!(
                env = config::WEBHOOK_SECRET_ENV,
                "Webhook secret is not configured; every delivery will be rejected"
            );
        }
        WebhookSystem::new(verifier, self.store.clone(), self.store.clone())
    }

    /// Creates the application router.
    pub fn router(&self) -> Router {
        self.router_with(self.webhook_system())
    }

    fn router_with(&self, webhooks: WebhookSystem) -> Router {
        let authenticator = Arc::new(PartnerAuthenticator::new(
            self.store.clone(),
            self.config.partner_api.to_auth_config(),
        ));

        let state = AppState::new(webhooks, authenticator, self.store.clone(), self.store.clone())
            .with_signature_header(&self.config.webhook.signature_header);
        app_routes(state)
    }

    /// Serves until `shutdown` resolves.
    pub async fn run(
        self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> Result<(), ServerError> {
        let addr = format!("{}:{}", self.config.server.host, self.config.server.port);
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        info!(%addr, "Starting First Rule server");

        let webhooks = self.webhook_system();
        let retry_worker = spawn_retry_worker(webhooks.clone(), &self.config.webhook);

        let served = axum::serve(listener, self.router_with(webhooks))
            .with_graceful_shutdown(shutdown)
            .await;
        if let Some(worker) = retry_worker {
            worker.abort();
        }
        served?;

        info!("Server shutdown complete");
        Ok(())
    }
}

/// Periodically replays failed envelopes. Returns `None` when disabled.
fn spawn_retry_worker(webhooks: WebhookSystem, config: &WebhookConfig) -> Option<JoinHandle<()>> {
    if config.retry_interval_secs == 0 {
        return None;
    }
    let period = Duration::from_secs(config.retry_interval_secs);
    let max_attempts = config.retry_max_attempts;
    let batch_size = config.retry_batch_size;

    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        loop {
            ticker.tick().await;
            if let Err(err) = webhooks.retry_failed(batch_size, max_attempts).await {
                warn!(error = %err, "Webhook retry pass failed");
            }
        }
    }))
}

async fn seed(store: &MemoryAdapter, config: &Config) -> Result<(), StoreError> {
    for partner in &config.partners {
        store.insert_partner(partner.clone()).await;
    }
    for model in &config.voice_models {
        store.insert_voice_model(model.clone()).await;
    }
    for access in &config.model_access {
        store.grant_model_access(access.clone()).await;
    }
    for seed in &config.api_keys {
        store.create_api_key(&seed.to_record()).await?;
    }

    info!(
        partners = config.partners.len(),
        api_keys = config.api_keys.len(),
        voice_models = config.voice_models.len(),
        "Store seeded"
    );
    Ok(())
}

/// Generates a key offline and returns it with its configuration entry.
///
/// The plaintext is shown once; only the seed (hash and display prefix)
/// belongs in the configuration file.
pub fn generate_key_seed(
    auth: &PartnerAuthConfig,
    partner_id: &str,
    name: &str,
    scopes: &[Scope],
    rate_limit_per_minute: u32,
) -> (String, ApiKeySeed) {
    let plaintext = PartnerKeyGenerator::new(auth.key_bytes, auth.key_prefix.clone()).generate();
    let seed = ApiKeySeed {
        partner_id: partner_id.to_string(),
        name: name.to_string(),
        key_hash: PartnerKeyGenerator::hash_key(&plaintext),
        key_prefix: PartnerKeyGenerator::display_prefix(&plaintext, auth.display_prefix_length),
        scopes: scopes.iter().map(|s| s.as_str().to_string()).collect(),
        rate_limit_per_minute,
        is_active: true,
        expires_at: None,
    };
    (plaintext, seed)
}

/// Renders a seed as a `[[api_keys]]` TOML entry.
pub fn render_key_seed(seed: &ApiKeySeed) -> Result<String, ConfigError> {
    let body = toml::to_string(seed).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    Ok(format!("[[api_keys]]\n{body}"))
}
