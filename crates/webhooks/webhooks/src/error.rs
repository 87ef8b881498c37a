//! Webhook error types.

use first_rule_core::StoreError;
use thiserror::Error;

/// Result type for webhook operations.
pub type WebhookResult<T> = Result<T, WebhookError>;

/// Error type for webhook ingestion.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// No signature header on the request.
    #[error("Missing signature")]
    MissingSignature,

    /// Signature did not match the body.
    #[error("Invalid signature")]
    InvalidSignature,

    /// No shared secret is configured, so nothing can be verified.
    #[error("Webhook secret not configured")]
    SecretNotConfigured,

    /// Body is not a valid webhook envelope.
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// `data` does not match the declared shape of a known event type.
    #[error("Invalid {event_type} payload: {reason}")]
    ShapeMismatch { event_type: String, reason: String },

    /// The audit trail or catalog store failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    /// A handler failed in a way the sender should retry.
    #[error("Handler failed: {0}")]
    HandlerFailed(String),

    /// No envelope with the given ID.
    #[error("Envelope not found: {0}")]
    EnvelopeNotFound(String),
}

impl WebhookError {
    pub fn shape_mismatch(event_type: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ShapeMismatch {
            event_type: event_type.into(),
            reason: reason.into(),
        }
    }

    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::MissingSignature | Self::InvalidSignature | Self::SecretNotConfigured => 401,
            Self::InvalidPayload(_) => 400,
            Self::ShapeMismatch { .. } => 422,
            Self::EnvelopeNotFound(_) => 404,
            Self::Storage(_) | Self::HandlerFailed(_) => 500,
        }
    }

    /// Returns a short message that is safe to send to the caller.
    pub fn public_message(&self) -> String {
        match self {
            Self::Storage(_) => "Failed to store webhook".to_string(),
            Self::HandlerFailed(_) => "Webhook processing failed".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<serde_json::Error> for WebhookError {
    fn from(err: serde_json::Error) -> Self {
        WebhookError::InvalidPayload(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(WebhookError::MissingSignature.status_code(), 401);
        assert_eq!(WebhookError::SecretNotConfigured.status_code(), 401);
        assert_eq!(WebhookError::InvalidPayload("x".into()).status_code(), 400);
        assert_eq!(
            WebhookError::shape_mismatch("track.created", "missing field `id`").status_code(),
            422
        );
        assert_eq!(
            WebhookError::from(StoreError::unavailable("down")).status_code(),
            500
        );
    }

    #[test]
    fn test_storage_detail_is_not_public() {
        let err = WebhookError::from(StoreError::unavailable("connection refused on 10.0.0.3"));
        assert_eq!(err.public_message(), "Failed to store webhook");
    }
}
