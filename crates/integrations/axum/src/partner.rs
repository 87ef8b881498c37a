//! Partner API handlers.
//!
//! Every handler runs behind [`PartnerAuthLayer`](crate::PartnerAuthLayer)
//! and checks its own scope.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use first_rule_core::types::{License, NewLicense, NewUsageRecord, UsageRecord, VoiceModel};
use first_rule_partner_auth::Scope;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use crate::ApiError;
use crate::extractor::Partner;
use crate::routes::AppState;

/// Most usage records returned by one listing.
pub const USAGE_PAGE_SIZE: usize = 100;

#[derive(Debug, Deserialize)]
pub(crate) struct CreateLicenseRequest {
    model_id: Option<String>,
    licensee_email: Option<String>,
    license_type: Option<String>,
    #[serde(default)]
    terms: Value,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RecordUsageRequest {
    model_id: Option<String>,
    license_id: Option<String>,
    #[serde(default)]
    usage_metadata: Value,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UsageQuery {
    model_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct UsageListing {
    usage: Vec<UsageRecord>,
    count: usize,
}

/// `GET /models/{id}`
pub(crate) async fn get_model(
    partner: Partner,
    State(state): State<AppState>,
    Path(model_id): Path<String>,
) -> Result<Json<VoiceModel>, ApiError> {
    partner.require(Scope::Read)?;

    if !is_uuid(&model_id) {
        return Err(ApiError::bad_request("Invalid model ID format"));
    }
    ensure_model_access(&state, &partner, &model_id).await?;

    let model = state
        .catalog
        .get_voice_model(&model_id)
        .await?
        .filter(|model| model.is_active)
        .ok_or_else(|| ApiError::not_found("Model not found"))?;

    Ok(Json(model))
}

/// `POST /licenses`
pub(crate) async fn create_license(
    partner: Partner,
    State(state): State<AppState>,
    payload: Result<Json<CreateLicenseRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<License>), ApiError> {
    partner.require(Scope::Write)?;
    let Json(request) = payload.map_err(|_| ApiError::bad_request("Invalid request body"))?;

    let (Some(model_id), Some(licensee_email), Some(license_type)) = (
        non_empty(request.model_id),
        non_empty(request.licensee_email),
        non_empty(request.license_type),
    ) else {
        return Err(ApiError::bad_request("Missing required fields"));
    };

    if !is_uuid(&model_id) || !is_email(&licensee_email) {
        return Err(ApiError::bad_request("Invalid input format"));
    }
    ensure_model_access(&state, &partner, &model_id).await?;

    let license = state
        .partners
        .create_license(NewLicense {
            partner_id: partner.partner_id.clone(),
            model_id,
            licensee_email,
            license_type,
            terms: request.terms,
        })
        .await?;

    info!(
        partner_id = %license.partner_id,
        license_id = %license.id,
        model_id = %license.model_id,
        "License issued"
    );
    Ok((StatusCode::CREATED, Json(license)))
}

/// `POST /usage`
pub(crate) async fn record_usage(
    partner: Partner,
    State(state): State<AppState>,
    payload: Result<Json<RecordUsageRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<UsageRecord>), ApiError> {
    partner.require(Scope::Write)?;
    let Json(request) = payload.map_err(|_| ApiError::bad_request("Invalid request body"))?;

    let (Some(model_id), Some(license_id)) =
        (non_empty(request.model_id), non_empty(request.license_id))
    else {
        return Err(ApiError::bad_request("Missing required fields"));
    };

    if !is_uuid(&model_id) || !is_uuid(&license_id) {
        return Err(ApiError::bad_request("Invalid UUID format"));
    }

    let covered = state
        .partners
        .get_license(&license_id)
        .await?
        .is_some_and(|license| license.partner_id == partner.partner_id && license.model_id == model_id);
    if !covered {
        return Err(ApiError::forbidden("License does not cover this model"));
    }

    let record = state
        .partners
        .record_usage(NewUsageRecord {
            partner_id: partner.partner_id.clone(),
            model_id,
            license_id,
            usage_metadata: request.usage_metadata,
        })
        .await?;

    info!(
        partner_id = %record.partner_id,
        usage_id = %record.id,
        license_id = %record.license_id,
        "Usage recorded"
    );
    Ok((StatusCode::CREATED, Json(record)))
}

/// `GET /usage?model_id=`
pub(crate) async fn list_usage(
    partner: Partner,
    State(state): State<AppState>,
    Query(query): Query<UsageQuery>,
) -> Result<Json<UsageListing>, ApiError> {
    partner.require(Scope::Read)?;

    let model_id = non_empty(query.model_id);
    let usage = state
        .partners
        .list_usage(&partner.partner_id, model_id.as_deref(), USAGE_PAGE_SIZE)
        .await?;

    Ok(Json(UsageListing {
        count: usage.len(),
        usage,
    }))
}

pub(crate) async fn endpoint_not_found() -> ApiError {
    ApiError::not_found("Endpoint not found")
}

async fn ensure_model_access(
    state: &AppState,
    partner: &Partner,
    model_id: &str,
) -> Result<(), ApiError> {
    if state
        .partners
        .has_model_access(&partner.partner_id, model_id)
        .await?
    {
        Ok(())
    } else {
        Err(ApiError::forbidden("Access denied to this model"))
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Hyphenated UUIDs only; the braced and simple forms are rejected.
fn is_uuid(value: &str) -> bool {
    value.len() == 36 && Uuid::parse_str(value).is_ok()
}

/// `local@domain.tld` with no whitespace.
fn is_email(value: &str) -> bool {
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    domain
        .char_indices()
        .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len())
}
