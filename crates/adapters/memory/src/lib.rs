//! # First Rule Memory Adapter
//!
//! An in-memory storage adapter for First Rule, intended for tests,
//! development, and single-process deployments.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use first_rule_adapter_memory::MemoryAdapter;
//! use first_rule_core::CatalogStore;
//!
//! let store = Arc::new(MemoryAdapter::new());
//! let catalog: Arc<dyn CatalogStore> = store.clone();
//! ```
//!
//! Each upsert runs under the write guard of the map it touches, so two
//! concurrent upserts for the same key are serialized and never produce a
//! duplicate row.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use first_rule_core::error::{StoreError, StoreResult};
use first_rule_core::traits::{CatalogStore, PartnerStore, WebhookEventStore};
use first_rule_core::types::{
    CommercialRelease, CommercialTrack, EnvelopeOutcome, EnvelopeStatus, License, NewLicense,
    NewUsageRecord, NewWebhookEvent, PartnerApiKey, PartnerModelAccess, PartnerOrganization,
    ReleaseDistribution, ReleaseUpsert, TrackAnalytics, TrackUpsert, UsageRecord, VoiceModel,
    WebhookEvent,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory storage for a single entity type, keyed by its unique column.
type Store<T> = Arc<RwLock<HashMap<String, T>>>;

fn store<T>() -> Store<T> {
    Arc::new(RwLock::new(HashMap::new()))
}

/// In-memory storage adapter.
///
/// Data is lost when the process exits.
#[derive(Debug, Clone)]
pub struct MemoryAdapter {
    /// Keyed by external `event_id`.
    events: Store<WebhookEvent>,
    /// Keyed by `external_release_id`.
    releases: Store<CommercialRelease>,
    /// Keyed by `external_track_id`.
    tracks: Store<CommercialTrack>,
    distributions: Arc<RwLock<HashMap<(String, String), ReleaseDistribution>>>,
    voice_models: Store<VoiceModel>,
    partners: Store<PartnerOrganization>,
    /// Keyed by `key_hash`.
    api_keys: Store<PartnerApiKey>,
    model_access: Arc<RwLock<HashMap<(String, String), PartnerModelAccess>>>,
    licenses: Store<License>,
    usage: Arc<RwLock<Vec<UsageRecord>>>,
    available: Arc<AtomicBool>,
}

impl MemoryAdapter {
    /// Creates a new in-memory adapter.
    pub fn new() -> Self {
        Self {
            events: store(),
            releases: store(),
            tracks: store(),
            distributions: Arc::new(RwLock::new(HashMap::new())),
            voice_models: store(),
            partners: store(),
            api_keys: store(),
            model_access: Arc::new(RwLock::new(HashMap::new())),
            licenses: store(),
            usage: Arc::new(RwLock::new(Vec::new())),
            available: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Simulates the backing store going away (or coming back). While
    /// unavailable every operation fails with `StoreError::Unavailable`.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn check_available(&self) -> StoreResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::unavailable("memory store is offline"))
        }
    }

    // ==================== Seeding ====================

    /// Inserts or replaces a partner organization.
    pub async fn insert_partner(&self, partner: PartnerOrganization) {
        self.partners
            .write()
            .await
            .insert(partner.id.clone(), partner);
    }

    /// Inserts or replaces a voice model.
    pub async fn insert_voice_model(&self, model: VoiceModel) {
        self.voice_models
            .write()
            .await
            .insert(model.id.clone(), model);
    }

    /// Inserts or replaces a model access grant.
    pub async fn grant_model_access(&self, access: PartnerModelAccess) {
        self.model_access
            .write()
            .await
            .insert((access.partner_id.clone(), access.model_id.clone()), access);
    }

    // ==================== Inspection ====================

    /// Returns the number of webhook envelopes stored.
    pub async fn event_count(&self) -> usize {
        self.events.read().await.len()
    }

    /// Returns the number of commercial releases stored.
    pub async fn release_count(&self) -> usize {
        self.releases.read().await.len()
    }

    /// Returns the number of commercial tracks stored.
    pub async fn track_count(&self) -> usize {
        self.tracks.read().await.len()
    }

    /// Returns the number of usage records stored.
    pub async fn usage_count(&self) -> usize {
        self.usage.read().await.len()
    }

    /// Gets the distribution row for a release and platform.
    pub async fn get_distribution(
        &self,
        release_ref: &str,
        platform: &str,
    ) -> Option<ReleaseDistribution> {
        self.distributions
            .read()
            .await
            .get(&(release_ref.to_string(), platform.to_string()))
            .cloned()
    }

    /// Gets an API key by its local ID.
    pub async fn get_api_key(&self, id: &str) -> Option<PartnerApiKey> {
        self.api_keys
            .read()
            .await
            .values()
            .find(|k| k.id == id)
            .cloned()
    }
}

impl Default for MemoryAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WebhookEventStore for MemoryAdapter {
    async fn record_event(&self, event: NewWebhookEvent) -> StoreResult<(WebhookEvent, bool)> {
        self.check_available()?;
        let mut events = self.events.write().await;

        if let Some(existing) = events.get(&event.event_id) {
            return Ok((existing.clone(), false));
        }

        let stored = WebhookEvent::new(event);
        events.insert(stored.event_id.clone(), stored.clone());
        Ok((stored, true))
    }

    async fn get_event(&self, id: &str) -> StoreResult<Option<WebhookEvent>> {
        self.check_available()?;
        let events = self.events.read().await;
        Ok(events.values().find(|e| e.id == id).cloned())
    }

    async fn get_event_by_event_id(&self, event_id: &str) -> StoreResult<Option<WebhookEvent>> {
        self.check_available()?;
        let events = self.events.read().await;
        Ok(events.get(event_id).cloned())
    }

    async fn begin_processing(&self, id: &str) -> StoreResult<(WebhookEvent, bool)> {
        self.check_available()?;
        let mut events = self.events.write().await;

        let event = events
            .values_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| StoreError::not_found("webhook_event", "id", id))?;

        let started = event.begin_processing();
        Ok((event.clone(), started))
    }

    async fn finish_event(
        &self,
        id: &str,
        outcome: &EnvelopeOutcome,
    ) -> StoreResult<WebhookEvent> {
        self.check_available()?;
        let mut events = self.events.write().await;

        let event = events
            .values_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| StoreError::not_found("webhook_event", "id", id))?;

        event.finish(outcome);
        Ok(event.clone())
    }

    async fn list_events_by_status(
        &self,
        status: EnvelopeStatus,
        limit: usize,
    ) -> StoreResult<Vec<WebhookEvent>> {
        self.check_available()?;
        let events = self.events.read().await;

        let mut matching: Vec<WebhookEvent> = events
            .values()
            .filter(|e| e.status == status)
            .cloned()
            .collect();
        matching.sort_by_key(|e| e.received_at);
        matching.truncate(limit);
        Ok(matching)
    }
}

#[async_trait]
impl CatalogStore for MemoryAdapter {
    // ==================== Releases ====================

    async fn upsert_release(&self, upsert: ReleaseUpsert) -> StoreResult<CommercialRelease> {
        self.check_available()?;
        let mut releases = self.releases.write().await;

        let release = match releases.get_mut(&upsert.external_release_id) {
            Some(existing) => {
                existing.apply(upsert);
                existing.clone()
            }
            None => {
                let created = CommercialRelease::from_upsert(upsert);
                releases.insert(created.external_release_id.clone(), created.clone());
                created
            }
        };
        Ok(release)
    }

    async fn get_release_by_external_id(
        &self,
        external_release_id: &str,
    ) -> StoreResult<Option<CommercialRelease>> {
        self.check_available()?;
        let releases = self.releases.read().await;
        Ok(releases.get(external_release_id).cloned())
    }

    // ==================== Tracks ====================

    async fn upsert_track(&self, mut upsert: TrackUpsert) -> StoreResult<CommercialTrack> {
        self.check_available()?;
        // Lock order: releases, then tracks.
        let releases = self.releases.read().await;
        let mut tracks = self.tracks.write().await;

        if upsert.release_ref.is_none() {
            upsert.release_ref = upsert
                .external_release_id
                .as_deref()
                .and_then(|external_id| releases.get(external_id))
                .map(|release| release.id.clone());
        }

        let track = match tracks.get_mut(&upsert.external_track_id) {
            Some(existing) => {
                existing.apply(upsert);
                existing.clone()
            }
            None => {
                let created = CommercialTrack::from_upsert(upsert);
                tracks.insert(created.external_track_id.clone(), created.clone());
                created
            }
        };
        Ok(track)
    }

    async fn get_track_by_external_id(
        &self,
        external_track_id: &str,
    ) -> StoreResult<Option<CommercialTrack>> {
        self.check_available()?;
        let tracks = self.tracks.read().await;
        Ok(tracks.get(external_track_id).cloned())
    }

    async fn link_tracks_to_release(
        &self,
        external_release_id: &str,
        release_ref: &str,
    ) -> StoreResult<usize> {
        self.check_available()?;
        let _releases = self.releases.read().await;
        let mut tracks = self.tracks.write().await;
        let now = Utc::now();

        let mut linked = 0;
        for track in tracks.values_mut().filter(|t| {
            t.release_ref.is_none() && t.external_release_id.as_deref() == Some(external_release_id)
        }) {
            track.release_ref = Some(release_ref.to_string());
            track.updated_at = now;
            linked += 1;
        }
        Ok(linked)
    }

    async fn list_tracks_for_release(&self, release_ref: &str) -> StoreResult<Vec<CommercialTrack>> {
        self.check_available()?;
        let tracks = self.tracks.read().await;
        let mut linked: Vec<CommercialTrack> = tracks
            .values()
            .filter(|t| t.release_ref.as_deref() == Some(release_ref))
            .cloned()
            .collect();
        linked.sort_by_key(|t| t.track_number);
        Ok(linked)
    }

    // ==================== Analytics ====================

    async fn apply_track_analytics(
        &self,
        external_track_id: &str,
        analytics: &TrackAnalytics,
    ) -> StoreResult<Option<CommercialTrack>> {
        self.check_available()?;
        let mut tracks = self.tracks.write().await;

        Ok(tracks.get_mut(external_track_id).map(|track| {
            track.apply_analytics(analytics);
            track.clone()
        }))
    }

    async fn upsert_distribution(
        &self,
        release_ref: &str,
        platform: &str,
        platform_streams: u64,
    ) -> StoreResult<ReleaseDistribution> {
        self.check_available()?;
        let mut distributions = self.distributions.write().await;

        let row = ReleaseDistribution {
            release_ref: release_ref.to_string(),
            platform: platform.to_string(),
            platform_streams,
            last_updated: Utc::now(),
        };
        distributions.insert((row.release_ref.clone(), row.platform.clone()), row.clone());
        Ok(row)
    }

    // ==================== Voice Models ====================

    async fn get_voice_model(&self, id: &str) -> StoreResult<Option<VoiceModel>> {
        self.check_available()?;
        let models = self.voice_models.read().await;
        Ok(models.get(id).cloned())
    }

    async fn get_voice_model_by_canonical_name(
        &self,
        canonical_name: &str,
    ) -> StoreResult<Option<VoiceModel>> {
        self.check_available()?;
        let models = self.voice_models.read().await;
        Ok(models
            .values()
            .find(|m| m.canonical_name == canonical_name)
            .cloned())
    }
}

#[async_trait]
impl PartnerStore for MemoryAdapter {
    // ==================== API Keys ====================

    async fn create_api_key(&self, key: &PartnerApiKey) -> StoreResult<PartnerApiKey> {
        self.check_available()?;
        let mut keys = self.api_keys.write().await;

        if keys.contains_key(&key.key_hash) {
            return Err(StoreError::duplicate(
                "partner_api_key",
                "key_prefix",
                &key.key_prefix,
            ));
        }

        keys.insert(key.key_hash.clone(), key.clone());
        Ok(key.clone())
    }

    async fn get_api_key_by_hash(&self, key_hash: &str) -> StoreResult<Option<PartnerApiKey>> {
        self.check_available()?;
        let keys = self.api_keys.read().await;
        Ok(keys.get(key_hash).cloned())
    }

    async fn touch_api_key(&self, id: &str, used_at: DateTime<Utc>) -> StoreResult<()> {
        self.check_available()?;
        let mut keys = self.api_keys.write().await;

        let key = keys
            .values_mut()
            .find(|k| k.id == id)
            .ok_or_else(|| StoreError::not_found("partner_api_key", "id", id))?;
        key.last_used_at = Some(used_at);
        Ok(())
    }

    // ==================== Organizations ====================

    async fn get_partner(&self, id: &str) -> StoreResult<Option<PartnerOrganization>> {
        self.check_available()?;
        let partners = self.partners.read().await;
        Ok(partners.get(id).cloned())
    }

    async fn has_model_access(&self, partner_id: &str, model_id: &str) -> StoreResult<bool> {
        self.check_available()?;
        let access = self.model_access.read().await;
        Ok(access
            .get(&(partner_id.to_string(), model_id.to_string()))
            .is_some_and(|a| a.is_active))
    }

    // ==================== Licenses & Usage ====================

    async fn create_license(&self, license: NewLicense) -> StoreResult<License> {
        self.check_available()?;
        let license = License::new(license);
        self.licenses
            .write()
            .await
            .insert(license.id.clone(), license.clone());
        Ok(license)
    }

    async fn get_license(&self, id: &str) -> StoreResult<Option<License>> {
        self.check_available()?;
        let licenses = self.licenses.read().await;
        Ok(licenses.get(id).cloned())
    }

    async fn record_usage(&self, record: NewUsageRecord) -> StoreResult<UsageRecord> {
        self.check_available()?;
        let record = UsageRecord::new(record);
        self.usage.write().await.push(record.clone());
        Ok(record)
    }

    async fn list_usage(
        &self,
        partner_id: &str,
        model_id: Option<&str>,
        limit: usize,
    ) -> StoreResult<Vec<UsageRecord>> {
        self.check_available()?;
        let usage = self.usage.read().await;
        let mut records: Vec<UsageRecord> = usage
            .iter()
            .filter(|r| r.partner_id == partner_id)
            .filter(|r| model_id.is_none_or(|m| r.model_id == m))
            .cloned()
            .collect();
        records.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at));
        records.truncate(limit);
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_event(event_id: &str) -> NewWebhookEvent {
        NewWebhookEvent {
            event_id: event_id.to_string(),
            event_type: "release.created".to_string(),
            raw_payload: "{}".to_string(),
            signature: "sig".to_string(),
        }
    }

    #[tokio::test]
    async fn test_record_event_is_idempotent() {
        let adapter = MemoryAdapter::new();

        let (first, created) = adapter.record_event(new_event("evt_1")).await.unwrap();
        assert!(created);
        let (second, created) = adapter.record_event(new_event("evt_1")).await.unwrap();
        assert!(!created);

        assert_eq!(first.id, second.id);
        assert_eq!(adapter.event_count().await, 1);
    }

    #[tokio::test]
    async fn test_concurrent_record_event_keeps_one_row() {
        let adapter = MemoryAdapter::new();

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let adapter = adapter.clone();
                tokio::spawn(async move { adapter.record_event(new_event("evt_dup")).await })
            })
            .collect();

        let mut created = 0;
        for handle in handles {
            let (_, was_created) = handle.await.unwrap().unwrap();
            if was_created {
                created += 1;
            }
        }

        assert_eq!(created, 1);
        assert_eq!(adapter.event_count().await, 1);
    }

    #[tokio::test]
    async fn test_finish_event_twice() {
        let adapter = MemoryAdapter::new();
        let (event, _) = adapter.record_event(new_event("evt_1")).await.unwrap();

        adapter.begin_processing(&event.id).await.unwrap();
        let done = adapter
            .finish_event(&event.id, &EnvelopeOutcome::Processed { note: None })
            .await
            .unwrap();
        let again = adapter
            .finish_event(&event.id, &EnvelopeOutcome::Processed { note: None })
            .await
            .unwrap();

        assert_eq!(done.processed_at, again.processed_at);
        let (_, started) = adapter.begin_processing(&event.id).await.unwrap();
        assert!(!started);
    }

    #[tokio::test]
    async fn test_unknown_envelope_is_not_found() {
        let adapter = MemoryAdapter::new();
        let err = adapter.begin_processing("missing").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_link_tracks_to_release() {
        let adapter = MemoryAdapter::new();
        adapter
            .upsert_track(TrackUpsert {
                external_release_id: Some("r1".into()),
                ..TrackUpsert::new("t1")
            })
            .await
            .unwrap();
        adapter
            .upsert_track(TrackUpsert {
                external_release_id: Some("r2".into()),
                ..TrackUpsert::new("t2")
            })
            .await
            .unwrap();

        let linked = adapter.link_tracks_to_release("r1", "rel-local").await.unwrap();
        assert_eq!(linked, 1);

        let t1 = adapter.get_track_by_external_id("t1").await.unwrap().unwrap();
        let t2 = adapter.get_track_by_external_id("t2").await.unwrap().unwrap();
        assert_eq!(t1.release_ref.as_deref(), Some("rel-local"));
        assert!(t2.release_ref.is_none());

        let again = adapter.link_tracks_to_release("r1", "rel-local").await.unwrap();
        assert_eq!(again, 0);
    }

    #[tokio::test]
    async fn test_upsert_track_resolves_stored_release() {
        let adapter = MemoryAdapter::new();
        let release = adapter.upsert_release(ReleaseUpsert::new("r1")).await.unwrap();

        let track = adapter
            .upsert_track(TrackUpsert {
                external_release_id: Some("r1".into()),
                ..TrackUpsert::new("t1")
            })
            .await
            .unwrap();
        assert_eq!(track.release_ref, Some(release.id));

        let orphan = adapter
            .upsert_track(TrackUpsert {
                external_release_id: Some("r9".into()),
                ..TrackUpsert::new("t2")
            })
            .await
            .unwrap();
        assert!(orphan.release_ref.is_none());
    }

    #[tokio::test]
    async fn test_analytics_for_unknown_track() {
        let adapter = MemoryAdapter::new();
        let result = adapter
            .apply_track_analytics("nope", &TrackAnalytics::default())
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_duplicate_key_hash_rejected() {
        let adapter = MemoryAdapter::new();
        let key = PartnerApiKey::new("p1", "ci", "hash", "fr_abc...");
        adapter.create_api_key(&key).await.unwrap();

        let err = adapter
            .create_api_key(&PartnerApiKey::new("p1", "other", "hash", "fr_abc..."))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateEntry { .. }));
    }

    #[tokio::test]
    async fn test_unavailable_store() {
        let adapter = MemoryAdapter::new();
        adapter.set_available(false);

        let err = adapter.record_event(new_event("evt_1")).await.unwrap_err();
        assert!(err.is_transient());

        adapter.set_available(true);
        assert!(adapter.record_event(new_event("evt_1")).await.is_ok());
    }

    #[tokio::test]
    async fn test_list_usage_scoped_to_partner() {
        let adapter = MemoryAdapter::new();
        for partner in ["p1", "p1", "p2"] {
            adapter
                .record_usage(NewUsageRecord {
                    partner_id: partner.into(),
                    model_id: "m1".into(),
                    license_id: "l1".into(),
                    usage_metadata: serde_json::json!({}),
                })
                .await
                .unwrap();
        }

        let records = adapter.list_usage("p1", None, 100).await.unwrap();
        assert_eq!(records.len(), 2);
        let records = adapter.list_usage("p1", Some("m2"), 100).await.unwrap();
        assert!(records.is_empty());
    }
}
