//! Key issuance.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use first_rule_core::traits::PartnerStore;
use first_rule_core::types::PartnerApiKey;
use tracing::info;

use crate::config::PartnerAuthConfig;
use crate::error::{PartnerAuthError, PartnerAuthResult};
use crate::generator::PartnerKeyGenerator;
use crate::scope::Scope;

/// Parameters for a new key.
#[derive(Debug, Clone)]
pub struct IssueKeyRequest {
    pub partner_id: String,
    pub name: String,
    pub scopes: Vec<Scope>,
    /// Falls back to the configured default.
    pub rate_limit_per_minute: Option<u32>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl IssueKeyRequest {
    /// A read-only key with default limits.
    pub fn new(partner_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            partner_id: partner_id.into(),
            name: name.into(),
            scopes: vec![Scope::Read],
            rate_limit_per_minute: None,
            expires_at: None,
        }
    }

    pub fn with_scopes(mut self, scopes: Vec<Scope>) -> Self {
        self.scopes = scopes;
        self
    }

    pub fn with_rate_limit(mut self, per_minute: u32) -> Self {
        self.rate_limit_per_minute = Some(per_minute);
        self
    }

    pub fn with_expires_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }
}

/// A freshly issued key. The plaintext is not retrievable afterwards.
#[derive(Debug, Clone)]
pub struct IssuedKey {
    pub plaintext: String,
    pub record: PartnerApiKey,
}

/// Issues API keys for active partners, storing only their hash.
#[derive(Clone)]
pub struct KeyIssuer {
    store: Arc<dyn PartnerStore>,
    generator: PartnerKeyGenerator,
    config: PartnerAuthConfig,
}

impl KeyIssuer {
    pub fn new(store: Arc<dyn PartnerStore>, config: PartnerAuthConfig) -> Self {
        let generator = PartnerKeyGenerator::new(config.key_bytes, config.key_prefix.clone());
        Self {
            store,
            generator,
            config,
        }
    }

    pub async fn issue(&self, request: IssueKeyRequest) -> PartnerAuthResult<IssuedKey> {
        let partner = self
            .store
            .get_partner(&request.partner_id)
            .await?
            .filter(|p| p.is_active())
            .ok_or(PartnerAuthError::InactivePartner)?;

        let plaintext = self.generator.generate();
        let key_hash = PartnerKeyGenerator::hash_key(&plaintext);
        let key_prefix =
            PartnerKeyGenerator::display_prefix(&plaintext, self.config.display_prefix_length);

        let mut record = PartnerApiKey::new(&partner.id, request.name, key_hash, key_prefix)
            .with_scopes(request.scopes.iter().map(|s| s.as_str().to_string()).collect())
            .with_rate_limit(
                request
                    .rate_limit_per_minute
                    .unwrap_or(self.config.default_rate_limit_per_minute),
            );
        if let Some(expires_at) = request.expires_at {
            record = record.with_expires_at(expires_at);
        }

        let record = self.store.create_api_key(&record).await?;
        info!(
            partner_id = %record.partner_id,
            key_id = %record.id,
            key_prefix = %record.key_prefix,
            "API key issued"
        );

        Ok(IssuedKey { plaintext, record })
    }
}
