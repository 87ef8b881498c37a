//! Partner organizations, their API keys, and the records they create.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Lifecycle state of a partner organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartnerStatus {
    Active,
    Pending,
    Suspended,
}

/// A partner organization integrating with the licensing API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartnerOrganization {
    pub id: String,
    pub name: String,
    pub status: PartnerStatus,
    #[serde(default = "default_tier")]
    pub tier: String,
}

fn default_tier() -> String {
    "standard".to_string()
}

impl PartnerOrganization {
    pub fn is_active(&self) -> bool {
        self.status == PartnerStatus::Active
    }
}

/// A stored partner API credential. Only the hash of the secret is kept.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartnerApiKey {
    pub id: String,
    pub partner_id: String,
    pub name: String,
    /// SHA-256 hex digest of the secret.
    pub key_hash: String,
    /// Display-only prefix, e.g. `fr_1a2b3c4d5...`.
    pub key_prefix: String,
    pub scopes: Vec<String>,
    pub rate_limit_per_minute: u32,
    pub is_active: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub last_used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl PartnerApiKey {
    /// Creates an active key record for an already-hashed secret.
    pub fn new(
        partner_id: impl Into<String>,
        name: impl Into<String>,
        key_hash: impl Into<String>,
        key_prefix: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            partner_id: partner_id.into(),
            name: name.into(),
            key_hash: key_hash.into(),
            key_prefix: key_prefix.into(),
            scopes: vec!["read".to_string()],
            rate_limit_per_minute: 60,
            is_active: true,
            expires_at: None,
            last_used_at: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    pub fn with_rate_limit(mut self, per_minute: u32) -> Self {
        self.rate_limit_per_minute = per_minute;
        self
    }

    pub fn with_expires_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at < now)
    }
}

/// Grant allowing a partner to use a voice model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartnerModelAccess {
    pub partner_id: String,
    pub model_id: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

/// A license issued by a partner for a voice model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct License {
    pub id: String,
    pub partner_id: String,
    pub model_id: String,
    pub licensee_email: String,
    pub license_type: String,
    pub terms: Value,
    pub issued_at: DateTime<Utc>,
}

/// Input for issuing a license.
#[derive(Debug, Clone)]
pub struct NewLicense {
    pub partner_id: String,
    pub model_id: String,
    pub licensee_email: String,
    pub license_type: String,
    pub terms: Value,
}

impl License {
    pub fn new(input: NewLicense) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            partner_id: input.partner_id,
            model_id: input.model_id,
            licensee_email: input.licensee_email,
            license_type: input.license_type,
            terms: input.terms,
            issued_at: Utc::now(),
        }
    }
}

/// Review state of a usage report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UsageStatus {
    Pending,
    Approved,
    Rejected,
}

/// A usage report submitted by a partner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageRecord {
    pub id: String,
    pub partner_id: String,
    pub model_id: String,
    pub license_id: String,
    pub usage_metadata: Value,
    pub status: UsageStatus,
    pub recorded_at: DateTime<Utc>,
}

/// Input for recording usage.
#[derive(Debug, Clone)]
pub struct NewUsageRecord {
    pub partner_id: String,
    pub model_id: String,
    pub license_id: String,
    pub usage_metadata: Value,
}

impl UsageRecord {
    pub fn new(input: NewUsageRecord) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            partner_id: input.partner_id,
            model_id: input.model_id,
            license_id: input.license_id,
            usage_metadata: input.usage_metadata,
            status: UsageStatus::Pending,
            recorded_at: Utc::now(),
        }
    }
}
