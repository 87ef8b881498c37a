//! # First Rule Core
//!
//! This crate provides the foundational types and traits for First Rule's
//! catalog sync and partner API. It defines the persisted records
//! (webhook envelopes, commercial releases and tracks, partner keys), the
//! storage error type, and the trait interfaces that storage adapters must
//! implement.

pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used items at the crate root
pub use error::{StoreError, StoreResult};
pub use traits::{CatalogStore, PartnerStore, WebhookEventStore};
pub use types::{
    CommercialRelease, CommercialTrack, EnvelopeOutcome, EnvelopeStatus, License,
    PartnerApiKey, PartnerOrganization, PartnerStatus, ReleaseUpsert, TrackAnalytics,
    TrackUpsert, UsageRecord, VoiceModel, WebhookEvent,
};
