//! Webhook system - main entry point.

use std::sync::Arc;

use first_rule_core::traits::{CatalogStore, WebhookEventStore};
use first_rule_core::types::{EnvelopeOutcome, WebhookEvent};
use serde::Serialize;
use tracing::{info, warn};

use crate::envelope::EnvelopeStore;
use crate::error::{WebhookError, WebhookResult};
use crate::event::CatalogEvent;
use crate::receiver::{WebhookEnvelope, WebhookReceiver};
use crate::router::{EventRouter, HandlerResult};
use crate::signature::WebhookVerifier;

/// Response body for an accepted delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WebhookReceipt {
    /// The delivery was authenticated and audited.
    pub success: bool,
    /// The envelope's `event_id`, generated when the sender omitted it.
    pub event_id: String,
    /// Local state was changed by this delivery.
    pub processed: bool,
    /// The envelope had already been processed; nothing was applied.
    pub duplicate: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WebhookReceipt {
    fn duplicate(event: &WebhookEvent) -> Self {
        Self {
            success: true,
            event_id: event.event_id.clone(),
            processed: false,
            duplicate: true,
            error: None,
        }
    }

    fn from_result(event: &WebhookEvent, result: HandlerResult) -> Self {
        Self {
            success: true,
            event_id: event.event_id.clone(),
            processed: result.processed,
            duplicate: false,
            error: result.error,
        }
    }
}

/// The webhook ingestion pipeline.
///
/// verify → record → decode → route → mark processed.
#[derive(Clone)]
pub struct WebhookSystem {
    receiver: WebhookReceiver,
    envelopes: EnvelopeStore,
    router: EventRouter,
}

impl WebhookSystem {
    pub fn new(
        verifier: WebhookVerifier,
        events: Arc<dyn WebhookEventStore>,
        catalog: Arc<dyn CatalogStore>,
    ) -> Self {
        Self {
            receiver: WebhookReceiver::new(verifier),
            envelopes: EnvelopeStore::new(events),
            router: EventRouter::new(catalog),
        }
    }

    /// Returns true if a signing secret is configured.
    pub fn is_configured(&self) -> bool {
        self.receiver.verifier().is_configured()
    }

    /// Handles one inbound delivery.
    ///
    /// Nothing is stored unless the signature verifies. A storage failure
    /// while auditing or a transient handler failure is returned as an error
    /// so the sender redelivers.
    pub async fn ingest(
        &self,
        signature: Option<&str>,
        body: &[u8],
    ) -> WebhookResult<WebhookReceipt> {
        let envelope = self.receiver.verify(signature, body)?;
        let raw_payload = std::str::from_utf8(body)
            .map_err(|e| WebhookError::InvalidPayload(e.to_string()))?;

        let event_id = envelope.event_id_or_generate();
        let recorded = self
            .envelopes
            .record(
                &event_id,
                &envelope.event_type,
                raw_payload,
                signature.unwrap_or_default().trim(),
            )
            .await?;

        info!(
            event_id = %event_id,
            event_type = %envelope.event_type,
            envelope_id = %recorded.event.id,
            created = recorded.created,
            "Webhook received"
        );

        self.process(recorded.event, &envelope).await
    }

    /// Re-runs a stored envelope, e.g. one that failed on a store outage.
    ///
    /// The raw payload was authenticated when it was first received.
    pub async fn replay(&self, envelope_id: &str) -> WebhookResult<WebhookReceipt> {
        let stored = self
            .envelopes
            .get(envelope_id)
            .await?
            .ok_or_else(|| WebhookError::EnvelopeNotFound(envelope_id.to_string()))?;
        let envelope = WebhookEnvelope::parse(stored.raw_payload.as_bytes())?;

        info!(
            event_id = %stored.event_id,
            envelope_id,
            attempts = stored.attempts,
            "Replaying webhook"
        );
        self.process(stored, &envelope).await
    }

    /// Lists failed envelopes, oldest first.
    pub async fn failed_envelopes(&self, limit: usize) -> WebhookResult<Vec<WebhookEvent>> {
        self.envelopes.list_failed(limit).await
    }

    /// Replays up to `limit` failed envelopes that have run fewer than
    /// `max_attempts` times. Returns how many replays completed.
    ///
    /// A replay that fails again stays `failed` and is picked up by a later
    /// pass until its attempts run out.
    pub async fn retry_failed(&self, limit: usize, max_attempts: u32) -> WebhookResult<usize> {
        let failed = self.failed_envelopes(limit).await?;
        let mut replayed = 0;

        for stored in failed.iter().filter(|e| e.attempts < max_attempts) {
            match self.replay(&stored.id).await {
                Ok(receipt) if !receipt.duplicate => replayed += 1,
                Ok(_) => {}
                Err(err) => {
                    warn!(
                        event_id = %stored.event_id,
                        attempts = stored.attempts + 1,
                        error = %err,
                        "Replay failed"
                    );
                }
            }
        }

        if replayed > 0 {
            info!(replayed, "Failed webhooks replayed");
        }
        Ok(replayed)
    }

    async fn process(
        &self,
        stored: WebhookEvent,
        envelope: &WebhookEnvelope,
    ) -> WebhookResult<WebhookReceipt> {
        let Some(event) = self.envelopes.begin(&stored.id).await? else {
            info!(event_id = %stored.event_id, "Duplicate delivery, already processed");
            return Ok(WebhookReceipt::duplicate(&stored));
        };

        let catalog_event = match CatalogEvent::parse(&envelope.event_type, &envelope.data) {
            Ok(catalog_event) => catalog_event,
            Err(err) => {
                warn!(event_id = %event.event_id, error = %err, "Rejecting webhook payload");
                self.envelopes
                    .mark_processed(
                        &event.id,
                        &EnvelopeOutcome::Failed {
                            error: err.to_string(),
                        },
                    )
                    .await?;
                return Err(err);
            }
        };

        let result = self.router.route(catalog_event).await;

        let outcome = if result.success {
            EnvelopeOutcome::Processed {
                note: result.error.clone(),
            }
        } else {
            EnvelopeOutcome::Failed {
                error: result
                    .error
                    .clone()
                    .unwrap_or_else(|| "Unknown error".to_string()),
            }
        };
        let finished = self.envelopes.mark_processed(&event.id, &outcome).await?;

        info!(
            event_id = %finished.event_id,
            status = finished.status.as_str(),
            processed = result.processed,
            attempts = finished.attempts,
            "Webhook handled"
        );

        if !result.success && result.retryable {
            return Err(WebhookError::HandlerFailed(
                result.error.unwrap_or_default(),
            ));
        }
        Ok(WebhookReceipt::from_result(&finished, result))
    }
}
