//! Webhook receiver: authenticates a raw delivery and parses its envelope.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::error::{WebhookError, WebhookResult};
use crate::signature::WebhookVerifier;

/// Top-level shape of every delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEnvelope {
    /// Sender's idempotency key. Generated locally when absent, in which case
    /// redeliveries cannot be deduplicated.
    #[serde(default)]
    pub event_id: Option<String>,
    pub event_type: String,
    #[serde(default = "empty_object")]
    pub data: Value,
    #[serde(default)]
    pub timestamp: Option<String>,
}

fn empty_object() -> Value {
    Value::Object(Default::default())
}

impl WebhookEnvelope {
    /// Parses a raw body into an envelope.
    pub fn parse(raw: &[u8]) -> WebhookResult<Self> {
        let mut envelope: WebhookEnvelope = serde_json::from_slice(raw)?;

        if envelope.event_type.trim().is_empty() {
            return Err(WebhookError::InvalidPayload(
                "event_type must not be empty".to_string(),
            ));
        }
        match envelope.data {
            Value::Object(_) => {}
            Value::Null => envelope.data = empty_object(),
            _ => {
                return Err(WebhookError::InvalidPayload(
                    "data must be an object".to_string(),
                ));
            }
        }
        if envelope.event_id.as_deref().is_some_and(str::is_empty) {
            envelope.event_id = None;
        }

        Ok(envelope)
    }

    /// Returns the sender's event id, or a fresh random one.
    pub fn event_id_or_generate(&self) -> String {
        self.event_id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
    }
}

/// Authenticates deliveries before anything is parsed or stored.
#[derive(Debug, Clone)]
pub struct WebhookReceiver {
    verifier: WebhookVerifier,
}

impl WebhookReceiver {
    pub fn new(verifier: WebhookVerifier) -> Self {
        Self { verifier }
    }

    pub fn verifier(&self) -> &WebhookVerifier {
        &self.verifier
    }

    /// Verifies the signature and parses the envelope.
    ///
    /// Rejected deliveries are logged with the body length and digest only;
    /// the body itself is untrusted and is not recorded.
    pub fn verify(&self, signature: Option<&str>, payload: &[u8]) -> WebhookResult<WebhookEnvelope> {
        if !self.verifier.is_configured() {
            warn!(body_len = payload.len(), "Rejecting webhook: no secret configured");
            return Err(WebhookError::SecretNotConfigured);
        }

        let Some(signature) = signature.filter(|s| !s.trim().is_empty()) else {
            warn!(
                body_len = payload.len(),
                body_sha256 = %body_digest(payload),
                "Rejecting webhook: missing signature"
            );
            return Err(WebhookError::MissingSignature);
        };

        if !self.verifier.verify(payload, signature) {
            warn!(
                body_len = payload.len(),
                body_sha256 = %body_digest(payload),
                "Rejecting webhook: invalid signature"
            );
            return Err(WebhookError::InvalidSignature);
        }

        WebhookEnvelope::parse(payload)
    }
}

fn body_digest(payload: &[u8]) -> String {
    hex::encode(Sha256::digest(payload))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn receiver() -> WebhookReceiver {
        WebhookReceiver::new(WebhookVerifier::new(Some("secret".to_string())))
    }

    #[test]
    fn test_envelope_parsing() {
        let json = br#"{
            "event_id": "evt_123",
            "event_type": "track.created",
            "data": {"id": "t1"},
            "timestamp": "2024-01-01T00:00:00Z"
        }"#;

        let envelope = WebhookEnvelope::parse(json).unwrap();
        assert_eq!(envelope.event_id.as_deref(), Some("evt_123"));
        assert_eq!(envelope.event_type, "track.created");
        assert_eq!(envelope.data["id"], "t1");
    }

    #[test]
    fn test_missing_data_defaults_to_object() {
        let envelope = WebhookEnvelope::parse(br#"{"event_type":"release.deleted"}"#).unwrap();
        assert!(envelope.data.is_object());
        assert!(envelope.event_id.is_none());

        let envelope =
            WebhookEnvelope::parse(br#"{"event_type":"release.deleted","data":null}"#).unwrap();
        assert!(envelope.data.is_object());
    }

    #[test]
    fn test_generated_event_ids_differ() {
        let envelope = WebhookEnvelope::parse(br#"{"event_type":"x","event_id":""}"#).unwrap();
        assert_ne!(envelope.event_id_or_generate(), envelope.event_id_or_generate());
    }

    #[test]
    fn test_rejects_bad_envelopes() {
        assert!(matches!(
            WebhookEnvelope::parse(b"not json"),
            Err(WebhookError::InvalidPayload(_))
        ));
        assert!(WebhookEnvelope::parse(br#"{"data":{}}"#).is_err());
        assert!(WebhookEnvelope::parse(br#"{"event_type":"  "}"#).is_err());
        assert!(WebhookEnvelope::parse(br#"{"event_type":"x","data":[1]}"#).is_err());
    }

    #[test]
    fn test_receiver_checks_signature_first() {
        let receiver = receiver();
        let body = b"not json";

        let err = receiver.verify(Some("00"), body).unwrap_err();
        assert!(matches!(err, WebhookError::InvalidSignature));

        let err = receiver.verify(None, body).unwrap_err();
        assert!(matches!(err, WebhookError::MissingSignature));

        let signature = receiver.verifier().sign(body).unwrap();
        let err = receiver.verify(Some(&signature), body).unwrap_err();
        assert!(matches!(err, WebhookError::InvalidPayload(_)));
    }

    #[test]
    fn test_receiver_without_secret() {
        let receiver = WebhookReceiver::new(WebhookVerifier::new(None));
        let err = receiver.verify(Some("anything"), b"{}").unwrap_err();
        assert!(matches!(err, WebhookError::SecretNotConfigured));
    }
}
