//! Event dispatch.

use std::future::Future;
use std::sync::Arc;

use first_rule_core::traits::CatalogStore;
use first_rule_core::{StoreError, StoreResult};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::event::CatalogEvent;
use crate::handlers::{AnalyticsHandler, CatalogSyncHandler};

/// Outcome of routing one event. Never an `Err`: failures are values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HandlerResult {
    /// False when the handler failed.
    pub success: bool,
    /// True when local state was changed.
    pub processed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// True when the failure is transient and the sender should redeliver.
    #[serde(skip)]
    pub retryable: bool,
}

impl HandlerResult {
    pub fn applied(processed: bool) -> Self {
        Self {
            success: true,
            processed,
            error: None,
            retryable: false,
        }
    }

    pub fn unhandled(event_type: &str) -> Self {
        Self {
            success: true,
            processed: false,
            error: Some(format!("Unhandled event type: {event_type}")),
            retryable: false,
        }
    }

    pub fn failed(error: impl Into<String>, retryable: bool) -> Self {
        Self {
            success: false,
            processed: false,
            error: Some(error.into()),
            retryable,
        }
    }

    fn from_store_error(err: &StoreError) -> Self {
        Self::failed(err.to_string(), err.is_transient())
    }
}

/// Dispatches typed events to their handler.
#[derive(Clone)]
pub struct EventRouter {
    catalog: CatalogSyncHandler,
    analytics: AnalyticsHandler,
}

impl EventRouter {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self {
            catalog: CatalogSyncHandler::new(store.clone()),
            analytics: AnalyticsHandler::new(store),
        }
    }

    /// Routes an event to its handler and converts the outcome.
    pub async fn route(&self, event: CatalogEvent) -> HandlerResult {
        let event_type = event.event_type().to_string();

        let result = match event {
            CatalogEvent::ReleaseCreated(payload) | CatalogEvent::ReleaseUpdated(payload) => {
                let handler = self.catalog.clone();
                isolate(async move { handler.handle_release(payload).await }).await
            }
            CatalogEvent::TrackCreated(payload) | CatalogEvent::TrackUpdated(payload) => {
                let handler = self.catalog.clone();
                isolate(async move { handler.handle_track(payload).await }).await
            }
            CatalogEvent::StreamUpdate(payload) => {
                let handler = self.analytics.clone();
                isolate(async move { handler.handle_stream_update(payload).await }).await
            }
            CatalogEvent::RevenueUpdate(payload) => {
                let handler = self.analytics.clone();
                isolate(async move { handler.handle_revenue_update(payload).await }).await
            }
            CatalogEvent::Unhandled { event_type } => {
                info!(event_type = %event_type, "Unhandled event type, acknowledging");
                return HandlerResult::unhandled(&event_type);
            }
        };

        if !result.success {
            warn!(
                event_type = %event_type,
                error = result.error.as_deref().unwrap_or_default(),
                retryable = result.retryable,
                "Handler failed"
            );
        }
        result
    }
}

/// Runs a handler on its own task so that a panic becomes a failed result.
async fn isolate<F>(handler: F) -> HandlerResult
where
    F: Future<Output = StoreResult<bool>> + Send + 'static,
{
    match tokio::spawn(handler).await {
        Ok(Ok(processed)) => HandlerResult::applied(processed),
        Ok(Err(err)) => HandlerResult::from_store_error(&err),
        Err(join_err) => {
            error!(error = %join_err, "Handler task aborted");
            HandlerResult::failed("Internal handler error", false)
        }
    }
}
