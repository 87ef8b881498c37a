//! Partner API key middleware for Axum.

use axum::body::Body;
use axum::http::{HeaderMap, Request, Response};
use axum::response::IntoResponse;
use first_rule_partner_auth::{PartnerAuthError, PartnerAuthenticator, PartnerIdentity};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};

use crate::ApiError;

/// Layer that requires a valid partner API key.
///
/// Requests without a usable key are answered here and never reach the
/// inner service. Authenticated requests carry a [`PartnerIdentity`] in
/// their extensions.
#[derive(Clone)]
pub struct PartnerAuthLayer {
    authenticator: Arc<PartnerAuthenticator>,
}

impl PartnerAuthLayer {
    pub fn new(authenticator: Arc<PartnerAuthenticator>) -> Self {
        Self { authenticator }
    }
}

impl<S> Layer<S> for PartnerAuthLayer {
    type Service = PartnerAuthMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        PartnerAuthMiddleware {
            inner,
            authenticator: self.authenticator.clone(),
        }
    }
}

/// Middleware service that authenticates and rate-limits partner keys.
#[derive(Clone)]
pub struct PartnerAuthMiddleware<S> {
    inner: S,
    authenticator: Arc<PartnerAuthenticator>,
}

impl<S> Service<Request<Body>> for PartnerAuthMiddleware<S>
where
    S: Service<Request<Body>, Response = Response<Body>> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        // The clone may not be ready; swap so the ready one serves this call.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let authenticator = self.authenticator.clone();

        Box::pin(async move {
            let identity = match authorize(&authenticator, req.headers()).await {
                Ok(identity) => identity,
                Err(err) => return Ok(ApiError::from(err).into_response()),
            };

            req.extensions_mut().insert(identity);
            inner.call(req).await
        })
    }
}

async fn authorize(
    authenticator: &PartnerAuthenticator,
    headers: &HeaderMap,
) -> Result<PartnerIdentity, PartnerAuthError> {
    let presented = extract_api_key(headers, &authenticator.config().api_key_headers)
        .ok_or(PartnerAuthError::MissingKey)?;

    let identity = authenticator.authenticate(presented).await?;
    authenticator.check_rate_limit(&identity)?;
    Ok(identity)
}

/// Returns the first non-empty key among the configured headers.
fn extract_api_key<'a>(headers: &'a HeaderMap, names: &[String]) -> Option<&'a str> {
    names
        .iter()
        .filter_map(|name| headers.get(name.as_str()))
        .filter_map(|value| value.to_str().ok())
        .map(str::trim)
        .find(|value| !value.is_empty())
}
