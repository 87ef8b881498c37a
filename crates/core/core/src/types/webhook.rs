//! Webhook audit envelope.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Processing state of a stored webhook delivery.
///
/// `received → processing → {processed | failed}`. A failed envelope may be
/// taken back to `processing` when the sender redelivers it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvelopeStatus {
    Received,
    Processing,
    Processed,
    Failed,
}

impl EnvelopeStatus {
    /// Returns true for `processed` and `failed`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Processed | Self::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Processing => "processing",
            Self::Processed => "processed",
            Self::Failed => "failed",
        }
    }
}

/// Terminal result written onto an envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvelopeOutcome {
    /// Handling finished. `note` is stored as the error message when present
    /// (e.g. an unhandled event type that was acknowledged).
    Processed { note: Option<String> },
    /// Handling failed with the given error.
    Failed { error: String },
}

impl EnvelopeOutcome {
    fn status(&self) -> EnvelopeStatus {
        match self {
            Self::Processed { .. } => EnvelopeStatus::Processed,
            Self::Failed { .. } => EnvelopeStatus::Failed,
        }
    }

    fn message(&self) -> Option<String> {
        match self {
            Self::Processed { note } => note.clone(),
            Self::Failed { error } => Some(error.clone()),
        }
    }
}

/// Input for recording a webhook delivery.
#[derive(Debug, Clone)]
pub struct NewWebhookEvent {
    pub event_id: String,
    pub event_type: String,
    pub raw_payload: String,
    pub signature: String,
}

/// A stored inbound webhook delivery, kept for audit and replay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEvent {
    /// Local identifier.
    pub id: String,
    /// External idempotency key.
    pub event_id: String,
    pub event_type: String,
    /// Request body exactly as received.
    pub raw_payload: String,
    pub signature: String,
    pub received_at: DateTime<Utc>,
    pub status: EnvelopeStatus,
    /// True once a terminal state has been reached.
    pub processed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Number of processing runs started for this envelope.
    pub attempts: u32,
}

impl WebhookEvent {
    /// Creates a freshly received envelope.
    pub fn new(input: NewWebhookEvent) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            event_id: input.event_id,
            event_type: input.event_type,
            raw_payload: input.raw_payload,
            signature: input.signature,
            received_at: Utc::now(),
            status: EnvelopeStatus::Received,
            processed: false,
            processed_at: None,
            error_message: None,
            attempts: 0,
        }
    }

    /// Moves the envelope into `processing`.
    ///
    /// Returns false when the envelope is already `processed`; its effects
    /// must not be applied again.
    pub fn begin_processing(&mut self) -> bool {
        if self.status == EnvelopeStatus::Processed {
            return false;
        }
        self.status = EnvelopeStatus::Processing;
        self.attempts += 1;
        true
    }

    /// Applies a terminal outcome. Returns true if the record changed.
    ///
    /// `processed` is never overwritten, and repeating the current terminal
    /// state is a no-op.
    pub fn finish(&mut self, outcome: &EnvelopeOutcome) -> bool {
        let next = outcome.status();
        if self.status == EnvelopeStatus::Processed || self.status == next {
            return false;
        }
        self.status = next;
        self.processed = true;
        self.processed_at = Some(Utc::now());
        self.error_message = outcome.message();
        true
    }
}
