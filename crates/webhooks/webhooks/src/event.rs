//! Typed catalog events.
//!
//! The envelope's `data` is decoded into the payload declared for its
//! `event_type` before any handler runs. A known type with a mismatched
//! payload is rejected; an unknown type is carried through as `Unhandled`.

use first_rule_core::types::{ReleaseUpsert, TrackAnalytics, TrackUpsert};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{WebhookError, WebhookResult};

pub const RELEASE_CREATED: &str = "release.created";
pub const RELEASE_UPDATED: &str = "release.updated";
pub const TRACK_CREATED: &str = "track.created";
pub const TRACK_UPDATED: &str = "track.updated";
pub const STREAM_UPDATE: &str = "analytics.stream_update";
pub const REVENUE_UPDATE: &str = "analytics.revenue_update";

/// A webhook event with a validated payload.
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogEvent {
    ReleaseCreated(ReleasePayload),
    ReleaseUpdated(ReleasePayload),
    TrackCreated(TrackPayload),
    TrackUpdated(TrackPayload),
    StreamUpdate(StreamUpdatePayload),
    RevenueUpdate(RevenueUpdatePayload),
    /// A type this service does not handle. Acknowledged, never applied.
    Unhandled { event_type: String },
}

impl CatalogEvent {
    /// Decodes `data` according to `event_type`.
    pub fn parse(event_type: &str, data: &Value) -> WebhookResult<Self> {
        let event = match event_type {
            RELEASE_CREATED => Self::ReleaseCreated(decode(event_type, data)?),
            RELEASE_UPDATED => Self::ReleaseUpdated(decode(event_type, data)?),
            TRACK_CREATED => Self::TrackCreated(decode(event_type, data)?),
            TRACK_UPDATED => Self::TrackUpdated(decode(event_type, data)?),
            STREAM_UPDATE => Self::StreamUpdate(decode(event_type, data)?),
            REVENUE_UPDATE => Self::RevenueUpdate(decode(event_type, data)?),
            other => {
                return Ok(Self::Unhandled {
                    event_type: other.to_string(),
                });
            }
        };

        event
            .validate()
            .map_err(|reason| WebhookError::shape_mismatch(event_type, reason))?;
        Ok(event)
    }

    /// Returns the wire tag of this event.
    pub fn event_type(&self) -> &str {
        match self {
            Self::ReleaseCreated(_) => RELEASE_CREATED,
            Self::ReleaseUpdated(_) => RELEASE_UPDATED,
            Self::TrackCreated(_) => TRACK_CREATED,
            Self::TrackUpdated(_) => TRACK_UPDATED,
            Self::StreamUpdate(_) => STREAM_UPDATE,
            Self::RevenueUpdate(_) => REVENUE_UPDATE,
            Self::Unhandled { event_type } => event_type,
        }
    }

    fn validate(&self) -> Result<(), String> {
        match self {
            Self::ReleaseCreated(release) | Self::ReleaseUpdated(release) => {
                require_id("id", &release.id)
            }
            Self::TrackCreated(track) | Self::TrackUpdated(track) => {
                require_id("id", &track.id)?;
                match track.prominence_score {
                    Some(score) if !score.is_finite() => {
                        Err("prominence_score must be a finite number".to_string())
                    }
                    _ => Ok(()),
                }
            }
            Self::StreamUpdate(update) => {
                if update.track_id.is_none() && update.release_id.is_none() {
                    Err("one of track_id or release_id is required".to_string())
                } else {
                    Ok(())
                }
            }
            Self::RevenueUpdate(update) => require_id("track_id", &update.track_id),
            Self::Unhandled { .. } => Ok(()),
        }
    }
}

fn decode<T: DeserializeOwned>(event_type: &str, data: &Value) -> WebhookResult<T> {
    T::deserialize(data).map_err(|e| WebhookError::shape_mismatch(event_type, e.to_string()))
}

fn require_id(field: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        Err(format!("{field} must not be empty"))
    } else {
        Ok(())
    }
}

/// `release.created` / `release.updated` payload.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReleasePayload {
    pub id: String,
    pub title: Option<String>,
    pub artist_name: Option<String>,
    #[serde(alias = "artistId")]
    pub artist_id: Option<String>,
    #[serde(alias = "releaseDate")]
    pub release_date: Option<String>,
    #[serde(rename = "type", alias = "release_type")]
    pub release_type: Option<String>,
    pub upc: Option<String>,
    pub status: Option<String>,
    pub distributors: Option<Vec<String>>,
    pub metadata: Option<Value>,
}

impl ReleasePayload {
    pub fn into_upsert(self) -> ReleaseUpsert {
        ReleaseUpsert {
            external_release_id: self.id,
            title: self.title,
            artist_name: self.artist_name,
            artist_external_id: self.artist_id,
            release_date: self.release_date,
            release_type: self.release_type,
            upc: self.upc,
            status: self.status,
            distributors: self.distributors,
            metadata: self.metadata,
        }
    }
}

/// `track.created` / `track.updated` payload.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TrackPayload {
    pub id: String,
    #[serde(alias = "releaseId")]
    pub release_id: Option<String>,
    /// Local voice model id.
    #[serde(alias = "voiceModelId")]
    pub voice_model_id: Option<String>,
    /// Voice model canonical name.
    pub voice_model_reference: Option<String>,
    pub title: Option<String>,
    pub isrc: Option<String>,
    #[serde(alias = "trackNumber")]
    pub track_number: Option<u32>,
    #[serde(alias = "duration")]
    pub duration_seconds: Option<u32>,
    #[serde(alias = "voice_usage_type")]
    pub usage_type: Option<String>,
    pub usage_description: Option<String>,
    pub prominence_score: Option<f64>,
    pub metadata: Option<Value>,
}

impl TrackPayload {
    /// Builds the upsert with whatever links were resolved.
    pub fn into_upsert(
        self,
        release_ref: Option<String>,
        voice_model_ref: Option<String>,
    ) -> TrackUpsert {
        TrackUpsert {
            external_track_id: self.id,
            external_release_id: self.release_id,
            release_ref,
            voice_model_ref,
            title: self.title,
            isrc: self.isrc,
            track_number: self.track_number,
            duration_seconds: self.duration_seconds,
            usage_type: self.usage_type,
            usage_description: self.usage_description,
            prominence_score: self.prominence_score,
            metadata: self.metadata,
        }
    }
}

/// `analytics.stream_update` payload. Counts are running totals.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StreamUpdatePayload {
    pub track_id: Option<String>,
    pub total_streams: Option<u64>,
    pub release_id: Option<String>,
    pub platform: Option<String>,
    pub platform_streams: Option<u64>,
}

impl StreamUpdatePayload {
    pub fn track_analytics(&self) -> TrackAnalytics {
        TrackAnalytics {
            total_streams: self.total_streams,
            total_revenue: None,
        }
    }
}

/// `analytics.revenue_update` payload.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RevenueUpdatePayload {
    pub track_id: String,
    pub total_revenue: Option<f64>,
}

impl RevenueUpdatePayload {
    pub fn track_analytics(&self) -> TrackAnalytics {
        TrackAnalytics {
            total_streams: None,
            total_revenue: self.total_revenue,
        }
    }
}
