//! Extractor for the authenticated partner.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};
use first_rule_partner_auth::{PartnerAuthError, PartnerIdentity, Scope};
use std::ops::Deref;

use crate::ApiError;

/// The partner identity inserted by [`PartnerAuthLayer`](crate::PartnerAuthLayer).
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(partner: Partner) -> Result<String, ApiError> {
///     partner.require(Scope::Read)?;
///     Ok(format!("Hello, {}!", partner.partner_id))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Partner(pub PartnerIdentity);

impl Partner {
    /// Fails with 403 unless the key carries `scope`.
    pub fn require(&self, scope: Scope) -> Result<(), ApiError> {
        self.0.require(scope).map_err(ApiError::from)
    }
}

impl Deref for Partner {
    type Target = PartnerIdentity;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Rejection when no identity was attached to the request.
#[derive(Debug)]
pub struct PartnerRejection;

impl IntoResponse for PartnerRejection {
    fn into_response(self) -> Response {
        ApiError::from(PartnerAuthError::MissingKey).into_response()
    }
}

impl<S> FromRequestParts<S> for Partner
where
    S: Send + Sync,
{
    type Rejection = PartnerRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<PartnerIdentity>()
            .cloned()
            .map(Partner)
            .ok_or(PartnerRejection)
    }
}
