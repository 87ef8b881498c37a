//! # First Rule Webhooks
//!
//! Ingestion of catalog webhooks from OpenPlay:
//! - HMAC signature verification over the raw body
//! - An audit envelope per delivery, idempotent on `event_id`
//! - Typed event decoding and static routing
//! - Idempotent release/track projection and analytics totals
//!
//! ## Example
//!
//! ```rust,ignore
//! use first_rule_webhooks::{WebhookSystem, WebhookVerifier};
//!
//! let store = Arc::new(MemoryAdapter::new());
//! let system = WebhookSystem::new(
//!     WebhookVerifier::new(Some(secret)),
//!     store.clone(),
//!     store,
//! );
//!
//! let receipt = system.ingest(Some(signature), &body).await?;
//! ```

mod envelope;
mod error;
pub mod event;
mod handlers;
mod receiver;
mod router;
mod signature;
mod system;

pub use envelope::{EnvelopeStore, RecordedEnvelope};
pub use error::{WebhookError, WebhookResult};
pub use event::CatalogEvent;
pub use handlers::{AnalyticsHandler, CatalogSyncHandler};
pub use receiver::{WebhookEnvelope, WebhookReceiver};
pub use router::{EventRouter, HandlerResult};
pub use signature::WebhookVerifier;
pub use system::{WebhookReceipt, WebhookSystem};
