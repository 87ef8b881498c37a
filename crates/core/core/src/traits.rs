//! Storage traits.
//!
//! The relational store is an external collaborator. Each trait groups the
//! operations one component needs; adapters implement all of them and the
//! process entry point hands each component the view it uses.
//!
//! Every upsert must be atomic per unique key. Concurrent duplicate webhook
//! deliveries rely on that property rather than on any in-process lock.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::StoreResult;
use crate::types::{
    CommercialRelease, CommercialTrack, EnvelopeOutcome, EnvelopeStatus, License, NewLicense,
    NewUsageRecord, NewWebhookEvent, PartnerApiKey, PartnerOrganization, ReleaseDistribution,
    ReleaseUpsert, TrackAnalytics, TrackUpsert, UsageRecord, VoiceModel, WebhookEvent,
};

/// Audit trail of inbound webhook deliveries.
#[async_trait]
pub trait WebhookEventStore: Send + Sync {
    /// Inserts the envelope unless one with the same `event_id` exists.
    ///
    /// Returns the stored envelope and whether it was created by this call.
    async fn record_event(&self, event: NewWebhookEvent) -> StoreResult<(WebhookEvent, bool)>;

    /// Gets an envelope by local ID.
    async fn get_event(&self, id: &str) -> StoreResult<Option<WebhookEvent>>;

    /// Gets an envelope by external event ID.
    async fn get_event_by_event_id(&self, event_id: &str) -> StoreResult<Option<WebhookEvent>>;

    /// Moves an envelope into `processing`.
    ///
    /// Returns the envelope and false when it was already processed.
    async fn begin_processing(&self, id: &str) -> StoreResult<(WebhookEvent, bool)>;

    /// Applies a terminal outcome. Safe to repeat.
    async fn finish_event(&self, id: &str, outcome: &EnvelopeOutcome)
        -> StoreResult<WebhookEvent>;

    /// Lists envelopes in the given state, oldest first.
    async fn list_events_by_status(
        &self,
        status: EnvelopeStatus,
        limit: usize,
    ) -> StoreResult<Vec<WebhookEvent>>;
}

/// Commercial catalog records and the voice models they reference.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    // ==================== Releases ====================

    /// Inserts or refreshes a release keyed on its external id.
    async fn upsert_release(&self, upsert: ReleaseUpsert) -> StoreResult<CommercialRelease>;

    async fn get_release_by_external_id(
        &self,
        external_release_id: &str,
    ) -> StoreResult<Option<CommercialRelease>>;

    // ==================== Tracks ====================

    /// Inserts or refreshes a track keyed on its external id.
    ///
    /// When `release_ref` is unset and `external_release_id` names a stored
    /// release, the link is resolved in the same atomic step as the write,
    /// so a release upserted concurrently is never missed.
    async fn upsert_track(&self, upsert: TrackUpsert) -> StoreResult<CommercialTrack>;

    async fn get_track_by_external_id(
        &self,
        external_track_id: &str,
    ) -> StoreResult<Option<CommercialTrack>>;

    /// Sets `release_ref` on every track that references `external_release_id`
    /// and is not linked yet. Returns the number of tracks linked.
    async fn link_tracks_to_release(
        &self,
        external_release_id: &str,
        release_ref: &str,
    ) -> StoreResult<usize>;

    /// Lists tracks linked to a local release.
    async fn list_tracks_for_release(&self, release_ref: &str) -> StoreResult<Vec<CommercialTrack>>;

    // ==================== Analytics ====================

    /// Applies totals to an existing track. Returns `None` when the track is
    /// unknown locally.
    async fn apply_track_analytics(
        &self,
        external_track_id: &str,
        analytics: &TrackAnalytics,
    ) -> StoreResult<Option<CommercialTrack>>;

    /// Inserts or refreshes per-platform totals keyed on `(release_ref, platform)`.
    async fn upsert_distribution(
        &self,
        release_ref: &str,
        platform: &str,
        platform_streams: u64,
    ) -> StoreResult<ReleaseDistribution>;

    // ==================== Voice Models ====================

    async fn get_voice_model(&self, id: &str) -> StoreResult<Option<VoiceModel>>;

    async fn get_voice_model_by_canonical_name(
        &self,
        canonical_name: &str,
    ) -> StoreResult<Option<VoiceModel>>;
}

/// Partner credentials and partner-created records.
#[async_trait]
pub trait PartnerStore: Send + Sync {
    // ==================== API Keys ====================

    /// Stores a new key. Fails on a duplicate hash.
    async fn create_api_key(&self, key: &PartnerApiKey) -> StoreResult<PartnerApiKey>;

    async fn get_api_key_by_hash(&self, key_hash: &str) -> StoreResult<Option<PartnerApiKey>>;

    /// Records a successful authentication.
    async fn touch_api_key(&self, id: &str, used_at: DateTime<Utc>) -> StoreResult<()>;

    // ==================== Organizations ====================

    async fn get_partner(&self, id: &str) -> StoreResult<Option<PartnerOrganization>>;

    /// Returns true if the partner holds an active grant for the model.
    async fn has_model_access(&self, partner_id: &str, model_id: &str) -> StoreResult<bool>;

    // ==================== Licenses & Usage ====================

    async fn create_license(&self, license: NewLicense) -> StoreResult<License>;

    async fn get_license(&self, id: &str) -> StoreResult<Option<License>>;

    async fn record_usage(&self, record: NewUsageRecord) -> StoreResult<UsageRecord>;

    /// Lists a partner's usage records, newest first.
    async fn list_usage(
        &self,
        partner_id: &str,
        model_id: Option<&str>,
        limit: usize,
    ) -> StoreResult<Vec<UsageRecord>>;
}
