//! Route mounting.

use axum::Json;
use axum::Router;
use axum::routing::{get, post};
use first_rule_core::traits::{CatalogStore, PartnerStore};
use first_rule_partner_auth::PartnerAuthenticator;
use first_rule_webhooks::WebhookSystem;
use serde_json::{Value, json};
use std::sync::Arc;

use crate::layer::PartnerAuthLayer;
use crate::webhook::SIGNATURE_HEADER;
use crate::{partner, webhook};

/// Shared state for all routes.
#[derive(Clone)]
pub struct AppState {
    pub webhooks: WebhookSystem,
    pub authenticator: Arc<PartnerAuthenticator>,
    pub partners: Arc<dyn PartnerStore>,
    pub catalog: Arc<dyn CatalogStore>,
    /// Primary signature header for webhook deliveries.
    pub signature_header: String,
}

impl AppState {
    pub fn new(
        webhooks: WebhookSystem,
        authenticator: Arc<PartnerAuthenticator>,
        partners: Arc<dyn PartnerStore>,
        catalog: Arc<dyn CatalogStore>,
    ) -> Self {
        Self {
            webhooks,
            authenticator,
            partners,
            catalog,
            signature_header: SIGNATURE_HEADER.to_string(),
        }
    }

    pub fn with_signature_header(mut self, header: impl Into<String>) -> Self {
        self.signature_header = header.into().to_ascii_lowercase();
        self
    }
}

/// Creates the application router.
///
/// # Example
///
/// ```rust,ignore
/// let app = app_routes(state);
/// axum::serve(listener, app).await?;
/// ```
pub fn app_routes(state: AppState) -> Router {
    let partner_api = Router::new()
        .route("/models/{id}", get(partner::get_model))
        .route("/licenses", post(partner::create_license))
        .route(
            "/usage",
            get(partner::list_usage).post(partner::record_usage),
        )
        .fallback(partner::endpoint_not_found)
        .layer(PartnerAuthLayer::new(state.authenticator.clone()));

    Router::new()
        .route("/webhooks/openplay", post(webhook::openplay_webhook))
        .route("/health", get(health))
        .nest("/partner-api", partner_api)
        .fallback(partner::endpoint_not_found)
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
