//! Core data types.
//!
//! Records mirror the tables of the hosted relational store. Upsert inputs
//! (`ReleaseUpsert`, `TrackUpsert`) carry only the fields present in an
//! inbound event so that partial payloads never erase known data.

mod catalog;
mod partner;
mod webhook;

pub use catalog::{
    clamp_prominence, CommercialRelease, CommercialTrack, ReleaseDistribution, ReleaseUpsert,
    TrackAnalytics, TrackUpsert, VoiceModel,
};
pub use partner::{
    License, NewLicense, NewUsageRecord, PartnerApiKey, PartnerModelAccess, PartnerOrganization,
    PartnerStatus, UsageRecord, UsageStatus,
};
pub use webhook::{EnvelopeOutcome, EnvelopeStatus, NewWebhookEvent, WebhookEvent};
