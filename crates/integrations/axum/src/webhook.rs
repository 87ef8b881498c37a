//! The OpenPlay webhook endpoint.

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use first_rule_webhooks::WebhookReceipt;

use crate::ApiError;
use crate::routes::AppState;

/// Header carrying the HMAC-SHA256 signature of the raw body.
pub const SIGNATURE_HEADER: &str = "x-openplay-signature";

/// Accepted when the primary header is absent.
pub const FALLBACK_SIGNATURE_HEADER: &str = "x-signature";

/// `POST /webhooks/openplay`
///
/// The body is taken as raw bytes so the signature is checked against
/// exactly what was sent.
pub(crate) async fn openplay_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookReceipt>, ApiError> {
    let signature = signature_from(&headers, &state.signature_header);
    let receipt = state.webhooks.ingest(signature, &body).await?;
    Ok(Json(receipt))
}

fn signature_from<'a>(headers: &'a HeaderMap, primary: &str) -> Option<&'a str> {
    [primary, FALLBACK_SIGNATURE_HEADER]
        .into_iter()
        .filter_map(|name| headers.get(name))
        .filter_map(|value| value.to_str().ok())
        .find(|value| !value.trim().is_empty())
}
