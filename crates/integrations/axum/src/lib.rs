//! # First Rule Axum Integration
//!
//! HTTP surface for First Rule:
//! - `POST /webhooks/openplay` feeding the webhook pipeline
//! - the partner API under `/partner-api`, gated by [`PartnerAuthLayer`]
//! - a [`Partner`] extractor for the authenticated identity
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use first_rule_axum::{AppState, app_routes};
//!
//! let state = AppState::new(webhooks, authenticator, partners, catalog);
//! let app = app_routes(state);
//! axum::serve(listener, app).await?;
//! ```

mod extractor;
mod layer;
mod partner;
mod routes;
mod webhook;

pub use extractor::Partner;
pub use layer::PartnerAuthLayer;
pub use routes::{AppState, app_routes};
pub use webhook::{FALLBACK_SIGNATURE_HEADER, SIGNATURE_HEADER};

use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use first_rule_core::StoreError;
use first_rule_partner_auth::PartnerAuthError;
use first_rule_webhooks::WebhookError;
use tracing::error;

/// An error rendered as `{ "error": <message> }`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    retry_after_secs: Option<u64>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            retry_after_secs: None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

fn status_from(code: u16) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "error": self.message });
        let mut response = (self.status, axum::Json(body)).into_response();

        if let Some(secs) = self.retry_after_secs {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }

        response
    }
}

impl From<WebhookError> for ApiError {
    fn from(err: WebhookError) -> Self {
        if err.status_code() >= 500 {
            error!(error = %err, "Webhook request failed");
        }
        Self::new(status_from(err.status_code()), err.public_message())
    }
}

impl From<PartnerAuthError> for ApiError {
    fn from(err: PartnerAuthError) -> Self {
        if let PartnerAuthError::Storage(inner) = &err {
            error!(error = %inner, "Partner authentication failed on storage");
        }
        let retry_after_secs = match &err {
            PartnerAuthError::RateLimited { retry_after_secs } => Some(*retry_after_secs),
            _ => None,
        };
        Self {
            status: status_from(err.status_code()),
            message: err.public_message(),
            retry_after_secs,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        error!(error = %err, "Storage error");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    }
}
