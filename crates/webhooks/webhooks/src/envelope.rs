//! Audit trail of inbound deliveries.

use std::sync::Arc;

use first_rule_core::traits::WebhookEventStore;
use first_rule_core::types::{EnvelopeOutcome, EnvelopeStatus, NewWebhookEvent, WebhookEvent};

use crate::error::WebhookResult;

/// Result of recording a delivery.
#[derive(Debug, Clone)]
pub struct RecordedEnvelope {
    pub event: WebhookEvent,
    /// False when an envelope with the same `event_id` already existed.
    pub created: bool,
}

/// Records deliveries and drives their processing state.
///
/// Every call goes straight to the store; atomicity per `event_id` is the
/// store's responsibility.
#[derive(Clone)]
pub struct EnvelopeStore {
    store: Arc<dyn WebhookEventStore>,
}

impl EnvelopeStore {
    pub fn new(store: Arc<dyn WebhookEventStore>) -> Self {
        Self { store }
    }

    /// Records a delivery, returning the existing envelope on redelivery.
    pub async fn record(
        &self,
        event_id: impl Into<String>,
        event_type: impl Into<String>,
        raw_payload: impl Into<String>,
        signature: impl Into<String>,
    ) -> WebhookResult<RecordedEnvelope> {
        let (event, created) = self
            .store
            .record_event(NewWebhookEvent {
                event_id: event_id.into(),
                event_type: event_type.into(),
                raw_payload: raw_payload.into(),
                signature: signature.into(),
            })
            .await?;
        Ok(RecordedEnvelope { event, created })
    }

    /// Moves an envelope into `processing`.
    ///
    /// Returns `None` when it was already processed and must not be applied
    /// again.
    pub async fn begin(&self, envelope_id: &str) -> WebhookResult<Option<WebhookEvent>> {
        let (event, started) = self.store.begin_processing(envelope_id).await?;
        Ok(started.then_some(event))
    }

    /// Writes the terminal outcome. Repeating it is a no-op.
    pub async fn mark_processed(
        &self,
        envelope_id: &str,
        outcome: &EnvelopeOutcome,
    ) -> WebhookResult<WebhookEvent> {
        Ok(self.store.finish_event(envelope_id, outcome).await?)
    }

    pub async fn get(&self, envelope_id: &str) -> WebhookResult<Option<WebhookEvent>> {
        Ok(self.store.get_event(envelope_id).await?)
    }

    /// Lists failed envelopes, oldest first.
    pub async fn list_failed(&self, limit: usize) -> WebhookResult<Vec<WebhookEvent>> {
        Ok(self
            .store
            .list_events_by_status(EnvelopeStatus::Failed, limit)
            .await?)
    }
}
