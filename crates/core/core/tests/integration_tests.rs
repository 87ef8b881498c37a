//! Integration tests for First Rule Core
//!
//! This test suite covers:
//! - Partial upserts merging into existing records
//! - Envelope lifecycle across redeliveries
//! - Store error classification

use first_rule_core::{
    StoreError,
    types::{
        CommercialRelease, CommercialTrack, EnvelopeOutcome, EnvelopeStatus, NewWebhookEvent,
        ReleaseUpsert, TrackAnalytics, TrackUpsert, WebhookEvent,
    },
};
use serde_json::json;

mod release_tests {
    use super::*;

    #[test]
    fn test_new_release_defaults() {
        let release = CommercialRelease::from_upsert(ReleaseUpsert::new("r1"));

        assert_eq!(release.external_release_id, "r1");
        assert_eq!(release.title, "Untitled");
        assert_eq!(release.artist_name, "Unknown Artist");
        assert_eq!(release.status, "active");
        assert!(release.distributors.is_empty());
        assert_eq!(release.metadata, json!({}));
    }

    #[test]
    fn test_partial_update_keeps_known_fields() {
        let mut release = CommercialRelease::from_upsert(ReleaseUpsert {
            title: Some("Album B".into()),
            upc: Some("00602445".into()),
            distributors: Some(vec!["spotify".into()]),
            ..ReleaseUpsert::new("r1")
        });
        let id = release.id.clone();

        release.apply(ReleaseUpsert {
            status: Some("taken_down".into()),
            ..ReleaseUpsert::new("r1")
        });

        assert_eq!(release.id, id);
        assert_eq!(release.title, "Album B");
        assert_eq!(release.upc.as_deref(), Some("00602445"));
        assert_eq!(release.distributors, vec!["spotify"]);
        assert_eq!(release.status, "taken_down");
    }
}

mod track_tests {
    use super::*;

    #[test]
    fn test_unresolved_links_do_not_clear_resolved_ones() {
        let mut track = CommercialTrack::from_upsert(TrackUpsert {
            external_release_id: Some("r1".into()),
            release_ref: Some("local-r1".into()),
            voice_model_ref: Some("vm-1".into()),
            title: Some("Song A".into()),
            ..TrackUpsert::new("t1")
        });

        track.apply(TrackUpsert {
            external_release_id: Some("r1".into()),
            title: Some("Song A (Remastered)".into()),
            ..TrackUpsert::new("t1")
        });

        assert_eq!(track.release_ref.as_deref(), Some("local-r1"));
        assert_eq!(track.voice_model_ref.as_deref(), Some("vm-1"));
        assert_eq!(track.title, "Song A (Remastered)");
    }

    #[test]
    fn test_prominence_is_clamped() {
        let track = CommercialTrack::from_upsert(TrackUpsert {
            prominence_score: Some(1.7),
            ..TrackUpsert::new("t1")
        });
        assert_eq!(track.prominence_score, Some(1.0));

        let mut track = CommercialTrack::from_upsert(TrackUpsert {
            prominence_score: Some(0.4),
            ..TrackUpsert::new("t2")
        });
        track.apply(TrackUpsert {
            prominence_score: Some(f64::NAN),
            ..TrackUpsert::new("t2")
        });
        assert_eq!(track.prominence_score, Some(0.4));
    }

    #[test]
    fn test_analytics_totals_replace_previous() {
        let mut track = CommercialTrack::from_upsert(TrackUpsert::new("t1"));
        assert!(track.last_updated.is_none());

        track.apply_analytics(&TrackAnalytics {
            total_streams: Some(1_000),
            total_revenue: Some(4.2),
        });
        track.apply_analytics(&TrackAnalytics {
            total_streams: Some(1_500),
            total_revenue: None,
        });

        assert_eq!(track.estimated_streams, Some(1_500));
        assert_eq!(track.estimated_revenue, Some(4.2));
        assert!(track.last_updated.is_some());
    }
}

mod envelope_tests {
    use super::*;

    fn envelope() -> WebhookEvent {
        WebhookEvent::new(NewWebhookEvent {
            event_id: "evt_1".into(),
            event_type: "track.updated".into(),
            raw_payload: r#"{"event_type":"track.updated"}"#.into(),
            signature: "abc".into(),
        })
    }

    #[test]
    fn test_failed_envelope_can_be_retried() {
        let mut event = envelope();

        assert!(event.begin_processing());
        assert!(event.finish(&EnvelopeOutcome::Failed {
            error: "Store unavailable".into()
        }));
        assert_eq!(event.status, EnvelopeStatus::Failed);
        assert!(event.processed);

        assert!(event.begin_processing());
        assert!(event.finish(&EnvelopeOutcome::Processed { note: None }));
        assert_eq!(event.status, EnvelopeStatus::Processed);
        assert_eq!(event.attempts, 2);
        assert!(event.error_message.is_none());
    }

    #[test]
    fn test_processed_envelope_is_final() {
        let mut event = envelope();
        event.begin_processing();
        event.finish(&EnvelopeOutcome::Processed { note: None });

        assert!(!event.begin_processing());
        assert!(!event.finish(&EnvelopeOutcome::Failed {
            error: "late failure".into()
        }));
        assert_eq!(event.status, EnvelopeStatus::Processed);
        assert_eq!(event.attempts, 1);
    }
}

mod error_tests {
    use super::*;

    #[test]
    fn test_only_unavailable_is_transient() {
        assert!(StoreError::unavailable("timeout").is_transient());
        assert!(!StoreError::not_found("release", "id", "r1").is_transient());
        assert!(!StoreError::duplicate("api_key", "key_hash", "abc").is_transient());
        assert!(!StoreError::invalid("title", "empty").is_transient());
    }

    #[test]
    fn test_error_messages() {
        let err = StoreError::not_found("webhook_event", "id", "e1");
        assert_eq!(err.to_string(), "Record not found: webhook_event with id=e1");
    }
}
