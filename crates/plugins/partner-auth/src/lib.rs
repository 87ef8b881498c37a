//! # First Rule Partner Auth
//!
//! API key authentication for partner integrations.
//!
//! ## Features
//!
//! - Keys are stored and compared as SHA-256 hashes only
//! - Activation, expiry, and organization status checks
//! - `read` / `write` scopes, checked per operation
//! - Per-key fixed-window rate limiting
//! - Key issuance with a display-only prefix

mod config;
mod error;
mod generator;
mod issuer;
mod rate_limit;
mod scope;

pub use config::PartnerAuthConfig;
pub use error::{PartnerAuthError, PartnerAuthResult};
pub use generator::PartnerKeyGenerator;
pub use issuer::{IssueKeyRequest, IssuedKey, KeyIssuer};
pub use rate_limit::{ApiKeyRateLimiter, RateLimitResult};
pub use scope::{PartnerIdentity, Scope};

use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use first_rule_core::traits::PartnerStore;
use tracing::{debug, warn};

/// Tracked keys above which expired rate limit windows are dropped.
const LIMITER_SWEEP_THRESHOLD: usize = 1024;

/// Validates presented API keys against stored hashes.
pub struct PartnerAuthenticator {
    store: Arc<dyn PartnerStore>,
    config: PartnerAuthConfig,
    limiter: Mutex<ApiKeyRateLimiter>,
}

impl PartnerAuthenticator {
    pub fn new(store: Arc<dyn PartnerStore>, config: PartnerAuthConfig) -> Self {
        let limiter = Mutex::new(ApiKeyRateLimiter::new(config.rate_limit_window_ms));
        Self {
            store,
            config,
            limiter,
        }
    }

    pub fn config(&self) -> &PartnerAuthConfig {
        &self.config
    }

    /// Authenticates a presented key.
    ///
    /// The key itself is never logged. On success `last_used_at` is bumped;
    /// a failure to bump is logged and does not fail the request.
    pub async fn authenticate(&self, presented: &str) -> PartnerAuthResult<PartnerIdentity> {
        let presented = presented.trim();
        if presented.is_empty() {
            return Err(PartnerAuthError::MissingKey);
        }

        let key_hash = PartnerKeyGenerator::hash_key(presented);
        let Some(key) = self.store.get_api_key_by_hash(&key_hash).await? else {
            debug!("Rejected unknown API key");
            return Err(PartnerAuthError::InvalidKey);
        };

        if !key.is_active {
            warn!(key_id = %key.id, partner_id = %key.partner_id, "Rejected inactive API key");
            return Err(PartnerAuthError::InactiveKey);
        }

        let now = Utc::now();
        if key.is_expired_at(now) {
            warn!(key_id = %key.id, partner_id = %key.partner_id, "Rejected expired API key");
            return Err(PartnerAuthError::ExpiredKey);
        }

        let partner_active = self
            .store
            .get_partner(&key.partner_id)
            .await?
            .is_some_and(|p| p.is_active());
        if !partner_active {
            warn!(key_id = %key.id, partner_id = %key.partner_id, "Rejected key of inactive partner");
            return Err(PartnerAuthError::InactivePartner);
        }

        if let Err(err) = self.store.touch_api_key(&key.id, now).await {
            warn!(key_id = %key.id, error = %err, "Failed to update last_used_at");
        }

        debug!(key_id = %key.id, partner_id = %key.partner_id, "Partner authenticated");
        Ok(PartnerIdentity::new(
            key.partner_id,
            key.id,
            &key.scopes,
            key.rate_limit_per_minute,
        ))
    }

    /// Counts a request against the key's per-minute limit.
    pub fn check_rate_limit(&self, identity: &PartnerIdentity) -> PartnerAuthResult<()> {
        if !self.config.rate_limit_enabled {
            return Ok(());
        }

        let result = {
            let mut limiter = self.limiter.lock().unwrap_or_else(PoisonError::into_inner);
            if limiter.tracked_keys() >= LIMITER_SWEEP_THRESHOLD {
                limiter.cleanup();
            }
            limiter.check(&identity.key_id, identity.rate_limit_per_minute)
        };

        match result.retry_after_secs() {
            None => Ok(()),
            Some(retry_after_secs) => {
                warn!(
                    key_id = %identity.key_id,
                    partner_id = %identity.partner_id,
                    limit = identity.rate_limit_per_minute,
                    "Rate limit exceeded"
                );
                Err(PartnerAuthError::RateLimited { retry_after_secs })
            }
        }
    }
}
