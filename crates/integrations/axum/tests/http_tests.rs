//! HTTP tests for the webhook endpoint and partner API
//!
//! Tests cover:
//! - Webhook status codes (200, 400, 401, 422, 500)
//! - Partner key authentication and scope enforcement
//! - License and usage flows
//! - Rate limiting
//! - Unknown endpoints

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use first_rule_adapter_memory::MemoryAdapter;
use first_rule_axum::*;
use first_rule_core::types::{PartnerModelAccess, PartnerOrganization, PartnerStatus, VoiceModel};
use first_rule_partner_auth::{
    IssueKeyRequest, KeyIssuer, PartnerAuthConfig, PartnerAuthenticator, Scope,
};
use first_rule_webhooks::{WebhookSystem, WebhookVerifier};
use http::{Request, StatusCode};
use serde_json::{Value, json};
use tower::ServiceExt;

const SECRET: &str = "whsec_http";
const PARTNER_ID: &str = "partner-1";
const MODEL_ID: &str = "7d9b3c1a-2f4e-4b8a-9c6d-1e2f3a4b5c6d";
const OTHER_MODEL_ID: &str = "0b6f5c1e-3a52-4a8e-9a55-3f1f3e2a7c10";

struct TestApp {
    store: Arc<MemoryAdapter>,
    app: Router,
    signer: WebhookVerifier,
    read_key: String,
    write_key: String,
}

impl TestApp {
    async fn new() -> Self {
        Self::with_rate_limit(60).await
    }

    async fn with_rate_limit(per_minute: u32) -> Self {
        let store = Arc::new(MemoryAdapter::new());
        store
            .insert_partner(PartnerOrganization {
                id: PARTNER_ID.into(),
                name: "Acme Audio".into(),
                status: PartnerStatus::Active,
                tier: "standard".into(),
            })
            .await;
        for id in [MODEL_ID, OTHER_MODEL_ID] {
            store
                .insert_voice_model(VoiceModel {
                    id: id.into(),
                    model_name: "Nova Voice".into(),
                    canonical_name: format!("nova-{}", &id[..4]),
                    description: None,
                    artist_name: Some("Nova".into()),
                    is_active: true,
                })
                .await;
        }
        store
            .grant_model_access(PartnerModelAccess {
                partner_id: PARTNER_ID.into(),
                model_id: MODEL_ID.into(),
                is_active: true,
            })
            .await;

        let config = PartnerAuthConfig::default();
        let issuer = KeyIssuer::new(store.clone(), config.clone());
        let read_key = issuer
            .issue(IssueKeyRequest::new(PARTNER_ID, "read").with_rate_limit(per_minute))
            .await
            .expect("Should issue read key")
            .plaintext;
        let write_key = issuer
            .issue(
                IssueKeyRequest::new(PARTNER_ID, "write")
                    .with_scopes(vec![Scope::Read, Scope::Write])
                    .with_rate_limit(per_minute),
            )
            .await
            .expect("Should issue write key")
            .plaintext;

        let signer = WebhookVerifier::new(Some(SECRET.to_string()));
        let webhooks = WebhookSystem::new(signer.clone(), store.clone(), store.clone());
        let authenticator = Arc::new(PartnerAuthenticator::new(store.clone(), config));
        let app = app_routes(AppState::new(
            webhooks,
            authenticator,
            store.clone(),
            store.clone(),
        ));

        Self {
            store,
            app,
            signer,
            read_key,
            write_key,
        }
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self
            .app
            .clone()
            .oneshot(request)
            .await
            .expect("Router should not fail");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Should read body");
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    async fn webhook(&self, body: &Value) -> (StatusCode, Value) {
        let raw = serde_json::to_vec(body).expect("Should serialize");
        let signature = self.signer.sign(&raw).expect("Should sign");
        self.send(
            Request::post("/webhooks/openplay")
                .header(SIGNATURE_HEADER, format!("sha256={signature}"))
                .header("content-type", "application/json")
                .body(Body::from(raw))
                .unwrap(),
        )
        .await
    }

    async fn partner_get(&self, key: &str, path: &str) -> (StatusCode, Value) {
        self.send(
            Request::get(path)
                .header("x-api-key", key)
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    async fn partner_post(&self, key: &str, path: &str, body: &Value) -> (StatusCode, Value) {
        self.send(
            Request::post(path)
                .header("x-api-key", key)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    async fn issue_license(&self) -> String {
        let (status, body) = self
            .partner_post(
                &self.write_key,
                "/partner-api/licenses",
                &json!({
                    "model_id": MODEL_ID,
                    "licensee_email": "ops@label.example",
                    "license_type": "commercial"
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        body["id"].as_str().expect("License should have an id").to_string()
    }
}

mod webhook_tests {
    use super::*;

    #[tokio::test]
    async fn test_release_delivery() {
        let t = TestApp::new().await;
        let (status, body) = t
            .webhook(&json!({
                "event_id": "evt_1",
                "event_type": "release.created",
                "data": {"id": "r1", "title": "Album B"}
            }))
            .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["event_id"], "evt_1");
        assert_eq!(body["processed"], true);
        assert_eq!(t.store.release_count().await, 1);
    }

    #[tokio::test]
    async fn test_fallback_signature_header() {
        let t = TestApp::new().await;
        let raw = br#"{"event_id":"evt_2","event_type":"catalog.reindexed","data":{}}"#;
        let signature = t.signer.sign(raw).unwrap();

        let (status, body) = t
            .send(
                Request::post("/webhooks/openplay")
                    .header(FALLBACK_SIGNATURE_HEADER, signature)
                    .body(Body::from(raw.to_vec()))
                    .unwrap(),
            )
            .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["processed"], false);
        assert_eq!(body["error"], "Unhandled event type: catalog.reindexed");
    }

    #[tokio::test]
    async fn test_bad_signature_is_401_without_side_effects() {
        let t = TestApp::new().await;
        let (status, body) = t
            .send(
                Request::post("/webhooks/openplay")
                    .header(SIGNATURE_HEADER, "sha256=deadbeef")
                    .body(Body::from(
                        r#"{"event_id":"evt_3","event_type":"release.created","data":{"id":"r1"}}"#,
                    ))
                    .unwrap(),
            )
            .await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Invalid signature");
        assert_eq!(t.store.event_count().await, 0);
        assert_eq!(t.store.release_count().await, 0);
    }

    #[tokio::test]
    async fn test_missing_signature() {
        let t = TestApp::new().await;
        let (status, _) = t
            .send(
                Request::post("/webhooks/openplay")
                    .body(Body::from("{}"))
                    .unwrap(),
            )
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_unparseable_envelope() {
        let t = TestApp::new().await;
        let raw = b"not json";
        let signature = t.signer.sign(raw).unwrap();
        let (status, _) = t
            .send(
                Request::post("/webhooks/openplay")
                    .header(SIGNATURE_HEADER, signature)
                    .body(Body::from(raw.to_vec()))
                    .unwrap(),
            )
            .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(t.store.event_count().await, 0);
    }

    #[tokio::test]
    async fn test_shape_mismatch_is_422() {
        let t = TestApp::new().await;
        let (status, body) = t
            .webhook(&json!({
                "event_id": "evt_4",
                "event_type": "track.created",
                "data": {"title": "No id"}
            }))
            .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["error"].as_str().unwrap().starts_with("Invalid track.created payload"));
        assert_eq!(t.store.event_count().await, 1);
        assert_eq!(t.store.track_count().await, 0);
    }

    #[tokio::test]
    async fn test_store_outage_is_500() {
        let t = TestApp::new().await;
        t.store.set_available(false);

        let (status, body) = t
            .webhook(&json!({
                "event_id": "evt_5",
                "event_type": "release.created",
                "data": {"id": "r1"}
            }))
            .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Failed to store webhook");
    }
}

mod partner_auth_tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_and_unknown_key() {
        let t = TestApp::new().await;

        let (status, body) = t
            .send(
                Request::get(format!("/partner-api/models/{MODEL_ID}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Missing API key");

        let (status, body) = t
            .partner_get("fr_unknown", &format!("/partner-api/models/{MODEL_ID}"))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Invalid API key");
    }

    #[tokio::test]
    async fn test_read_key_cannot_record_usage() {
        let t = TestApp::new().await;
        let license_id = t.issue_license().await;

        let (status, body) = t
            .partner_post(
                &t.read_key,
                "/partner-api/usage",
                &json!({"model_id": MODEL_ID, "license_id": license_id}),
            )
            .await;

        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "Insufficient permissions: write scope required");
        assert_eq!(t.store.usage_count().await, 0);
    }

    #[tokio::test]
    async fn test_rate_limit() {
        let t = TestApp::with_rate_limit(2).await;
        let path = format!("/partner-api/models/{MODEL_ID}");

        for _ in 0..2 {
            let (status, _) = t.partner_get(&t.read_key, &path).await;
            assert_eq!(status, StatusCode::OK);
        }

        let response = t
            .app
            .clone()
            .oneshot(
                Request::get(&path)
                    .header("x-api-key", &t.read_key)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(response.headers().contains_key("retry-after"));
    }
}

mod partner_api_tests {
    use super::*;

    #[tokio::test]
    async fn test_get_model() {
        let t = TestApp::new().await;

        let (status, body) = t
            .partner_get(&t.read_key, &format!("/partner-api/models/{MODEL_ID}"))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], MODEL_ID);
        assert_eq!(body["model_name"], "Nova Voice");

        let (status, body) = t.partner_get(&t.read_key, "/partner-api/models/not-a-uuid").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid model ID format");

        let (status, body) = t
            .partner_get(&t.read_key, &format!("/partner-api/models/{OTHER_MODEL_ID}"))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "Access denied to this model");
    }

    #[tokio::test]
    async fn test_license_validation() {
        let t = TestApp::new().await;

        let (status, body) = t
            .partner_post(
                &t.write_key,
                "/partner-api/licenses",
                &json!({"model_id": MODEL_ID, "license_type": "commercial"}),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Missing required fields");

        let (status, body) = t
            .partner_post(
                &t.write_key,
                "/partner-api/licenses",
                &json!({
                    "model_id": MODEL_ID,
                    "licensee_email": "not-an-email",
                    "license_type": "commercial"
                }),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid input format");

        let (status, _) = t
            .partner_post(
                &t.write_key,
                "/partner-api/licenses",
                &json!({
                    "model_id": OTHER_MODEL_ID,
                    "licensee_email": "ops@label.example",
                    "license_type": "commercial"
                }),
            )
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_usage_flow() {
        let t = TestApp::new().await;
        let license_id = t.issue_license().await;

        let (status, body) = t
            .partner_post(
                &t.write_key,
                "/partner-api/usage",
                &json!({
                    "model_id": MODEL_ID,
                    "license_id": license_id,
                    "usage_metadata": {"seconds": 30}
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["status"], "pending");
        assert_eq!(body["partner_id"], PARTNER_ID);

        let (status, body) = t
            .partner_get(&t.read_key, &format!("/partner-api/usage?model_id={MODEL_ID}"))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 1);
        assert_eq!(body["usage"][0]["usage_metadata"]["seconds"], 30);
    }

    #[tokio::test]
    async fn test_usage_requires_matching_license() {
        let t = TestApp::new().await;
        let license_id = t.issue_license().await;

        let (status, body) = t
            .partner_post(
                &t.write_key,
                "/partner-api/usage",
                &json!({"model_id": OTHER_MODEL_ID, "license_id": license_id}),
            )
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "License does not cover this model");

        let (status, body) = t
            .partner_post(
                &t.write_key,
                "/partner-api/usage",
                &json!({"model_id": MODEL_ID, "license_id": "lic-1"}),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid UUID format");
        assert_eq!(t.store.usage_count().await, 0);
    }

    #[tokio::test]
    async fn test_unknown_endpoints() {
        let t = TestApp::new().await;

        let (status, body) = t.partner_get(&t.read_key, "/partner-api/artists").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Endpoint not found");

        let (status, body) = t
            .send(Request::get("/health").body(Body::empty()).unwrap())
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }
}
