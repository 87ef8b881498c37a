//! Event handlers.
//!
//! Handlers return `Ok(true)` when they changed local state, `Ok(false)` for
//! an accepted no-op, and a `StoreError` when the store failed. They never
//! panic on bad input: payloads were validated before dispatch.

mod analytics;
mod catalog;

pub use analytics::AnalyticsHandler;
pub use catalog::CatalogSyncHandler;
