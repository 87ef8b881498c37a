//! Commercial catalog records synced from the catalog partner.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Clamps a prominence score into `[0, 1]`.
///
/// Returns `None` for NaN or infinite input, which must be rejected rather
/// than stored.
pub fn clamp_prominence(score: f64) -> Option<f64> {
    if score.is_finite() {
        Some(score.clamp(0.0, 1.0))
    } else {
        None
    }
}

/// A commercial release known locally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommercialRelease {
    pub id: String,
    pub external_release_id: String,
    pub title: String,
    pub artist_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artist_external_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upc: Option<String>,
    pub status: String,
    pub distributors: Vec<String>,
    pub metadata: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial release data keyed on the external id.
///
/// `None` fields leave the stored value untouched on update and fall back to
/// defaults on insert.
#[derive(Debug, Clone, Default)]
pub struct ReleaseUpsert {
    pub external_release_id: String,
    pub title: Option<String>,
    pub artist_name: Option<String>,
    pub artist_external_id: Option<String>,
    pub release_date: Option<String>,
    pub release_type: Option<String>,
    pub upc: Option<String>,
    pub status: Option<String>,
    pub distributors: Option<Vec<String>>,
    pub metadata: Option<Value>,
}

impl ReleaseUpsert {
    pub fn new(external_release_id: impl Into<String>) -> Self {
        Self {
            external_release_id: external_release_id.into(),
            ..Default::default()
        }
    }
}

impl CommercialRelease {
    /// Builds a new record, defaulting absent fields.
    pub fn from_upsert(upsert: ReleaseUpsert) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            external_release_id: upsert.external_release_id,
            title: upsert.title.unwrap_or_else(|| "Untitled".to_string()),
            artist_name: upsert
                .artist_name
                .unwrap_or_else(|| "Unknown Artist".to_string()),
            artist_external_id: upsert.artist_external_id,
            release_date: upsert.release_date,
            release_type: upsert.release_type,
            upc: upsert.upc,
            status: upsert.status.unwrap_or_else(|| "active".to_string()),
            distributors: upsert.distributors.unwrap_or_default(),
            metadata: upsert
                .metadata
                .unwrap_or_else(|| Value::Object(Default::default())),
            created_at: now,
            updated_at: now,
        }
    }

    /// Overwrites only the fields present in `upsert`.
    pub fn apply(&mut self, upsert: ReleaseUpsert) {
        if let Some(title) = upsert.title {
            self.title = title;
        }
        if let Some(artist_name) = upsert.artist_name {
            self.artist_name = artist_name;
        }
        if upsert.artist_external_id.is_some() {
            self.artist_external_id = upsert.artist_external_id;
        }
        if upsert.release_date.is_some() {
            self.release_date = upsert.release_date;
        }
        if upsert.release_type.is_some() {
            self.release_type = upsert.release_type;
        }
        if upsert.upc.is_some() {
            self.upc = upsert.upc;
        }
        if let Some(status) = upsert.status {
            self.status = status;
        }
        if let Some(distributors) = upsert.distributors {
            self.distributors = distributors;
        }
        if let Some(metadata) = upsert.metadata {
            self.metadata = metadata;
        }
        self.updated_at = Utc::now();
    }
}

/// A commercial track known locally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommercialTrack {
    pub id: String,
    pub external_track_id: String,
    /// External release id as received, kept for later linkage.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_release_id: Option<String>,
    /// Local release id, null until the release is known.
    pub release_ref: Option<String>,
    /// Local voice model id, null when unresolved.
    pub voice_model_ref: Option<String>,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub isrc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub track_number: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prominence_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_streams: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_revenue: Option<f64>,
    pub metadata: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial track data keyed on the external id.
#[derive(Debug, Clone, Default)]
pub struct TrackUpsert {
    pub external_track_id: String,
    pub external_release_id: Option<String>,
    pub release_ref: Option<String>,
    pub voice_model_ref: Option<String>,
    pub title: Option<String>,
    pub isrc: Option<String>,
    pub track_number: Option<u32>,
    pub duration_seconds: Option<u32>,
    pub usage_type: Option<String>,
    pub usage_description: Option<String>,
    pub prominence_score: Option<f64>,
    pub metadata: Option<Value>,
}

impl TrackUpsert {
    pub fn new(external_track_id: impl Into<String>) -> Self {
        Self {
            external_track_id: external_track_id.into(),
            ..Default::default()
        }
    }
}

impl CommercialTrack {
    pub fn from_upsert(upsert: TrackUpsert) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            external_track_id: upsert.external_track_id,
            external_release_id: upsert.external_release_id,
            release_ref: upsert.release_ref,
            voice_model_ref: upsert.voice_model_ref,
            title: upsert.title.unwrap_or_else(|| "Untitled".to_string()),
            isrc: upsert.isrc,
            track_number: upsert.track_number,
            duration_seconds: upsert.duration_seconds,
            usage_type: upsert.usage_type,
            usage_description: upsert.usage_description,
            prominence_score: upsert.prominence_score.and_then(clamp_prominence),
            estimated_streams: None,
            estimated_revenue: None,
            metadata: upsert
                .metadata
                .unwrap_or_else(|| Value::Object(Default::default())),
            last_updated: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Overwrites only the fields present in `upsert`. Resolved links are
    /// never cleared by an update that failed to resolve them, unless the
    /// update points the track at a different release: the link then
    /// follows the new release, resolved or not.
    pub fn apply(&mut self, upsert: TrackUpsert) {
        let repointed = upsert.external_release_id.is_some()
            && upsert.external_release_id != self.external_release_id;
        if repointed {
            self.external_release_id = upsert.external_release_id;
            self.release_ref = upsert.release_ref;
        } else if upsert.release_ref.is_some() {
            self.release_ref = upsert.release_ref;
        }
        if upsert.voice_model_ref.is_some() {
            self.voice_model_ref = upsert.voice_model_ref;
        }
        if let Some(title) = upsert.title {
            self.title = title;
        }
        if upsert.isrc.is_some() {
            self.isrc = upsert.isrc;
        }
        if upsert.track_number.is_some() {
            self.track_number = upsert.track_number;
        }
        if upsert.duration_seconds.is_some() {
            self.duration_seconds = upsert.duration_seconds;
        }
        if upsert.usage_type.is_some() {
            self.usage_type = upsert.usage_type;
        }
        if upsert.usage_description.is_some() {
            self.usage_description = upsert.usage_description;
        }
        if let Some(score) = upsert.prominence_score.and_then(clamp_prominence) {
            self.prominence_score = Some(score);
        }
        if let Some(metadata) = upsert.metadata {
            self.metadata = metadata;
        }
        self.updated_at = Utc::now();
    }

    /// Applies running analytics totals.
    pub fn apply_analytics(&mut self, analytics: &TrackAnalytics) {
        if let Some(streams) = analytics.total_streams {
            self.estimated_streams = Some(streams);
        }
        if let Some(revenue) = analytics.total_revenue {
            self.estimated_revenue = Some(revenue);
        }
        let now = Utc::now();
        self.last_updated = Some(now);
        self.updated_at = now;
    }
}

/// Running analytics totals for a track.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackAnalytics {
    pub total_streams: Option<u64>,
    pub total_revenue: Option<f64>,
}

impl TrackAnalytics {
    /// True when neither total is carried.
    pub fn is_empty(&self) -> bool {
        self.total_streams.is_none() && self.total_revenue.is_none()
    }
}

/// Per-platform stream totals for a release.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseDistribution {
    pub release_ref: String,
    pub platform: String,
    pub platform_streams: u64,
    pub last_updated: DateTime<Utc>,
}

/// A locally trained voice model that catalog tracks may reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceModel {
    pub id: String,
    pub model_name: String,
    pub canonical_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artist_name: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}
