//! Webhook endpoint handlers.
//!
//! The Stripe handler:
//! 1. Rejects anything but POST
//! 2. Verifies the signature over the raw body
//! 3. Resolves the customer and upserts them into MailerLite
//!
//! Only a wrong method (405) or a failed verification (400) is reported as an
//! error. Every other outcome is a 200 with a status field, so Stripe never
//! retries a delivery because of a downstream problem.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::mailerlite::MailerLiteClient;
use crate::stripe::StripeClient;
use crate::sync::{sync_event, SyncResult};
use crate::web::signature::{construct_event, SIGNATURE_HEADER};
use crate::Config;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub stripe: StripeClient,
    pub mailerlite: MailerLiteClient,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .context("Failed to create HTTP client")?;

        let stripe =
            StripeClient::new(http.clone(), &config).context("Invalid STRIPE_API_BASE")?;
        let mailerlite =
            MailerLiteClient::new(http, &config).context("Invalid MAILERLITE_API_BASE")?;

        Ok(Self {
            config: Arc::new(config),
            stripe,
            mailerlite,
        })
    }
}

// =============================================================================
// Health Check
// =============================================================================

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

// =============================================================================
// Stripe Webhook
// =============================================================================

/// Webhook response body.
#[derive(Debug, Default, Serialize, PartialEq)]
pub struct WebhookResponse {
    pub received: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub synced: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ignored: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lookup_error: Option<String>,
    /// HTTP status from MailerLite, or `"request_failed"` when unreachable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mailerlite_error: Option<Value>,
}

impl From<SyncResult> for WebhookResponse {
    fn from(result: SyncResult) -> Self {
        let received = WebhookResponse {
            received: true,
            ..Default::default()
        };

        match result {
            SyncResult::Synced => WebhookResponse {
                synced: Some(true),
                ..received
            },
            SyncResult::SkippedNoEmail => WebhookResponse {
                skipped: Some("no_email"),
                ..received
            },
            SyncResult::Ignored(kind) => WebhookResponse {
                ignored: Some(kind),
                ..received
            },
            SyncResult::LookupFailed(reason) => WebhookResponse {
                lookup_error: Some(reason),
                ..received
            },
            SyncResult::MailerLiteRejected(status) => WebhookResponse {
                mailerlite_error: Some(Value::from(status)),
                ..received
            },
            SyncResult::MailerLiteUnreachable => WebhookResponse {
                mailerlite_error: Some(Value::from("request_failed")),
                ..received
            },
        }
    }
}

/// Stripe webhook endpoint.
///
/// The body is taken as raw bytes: the signature covers the exact payload, so
/// it must not be parsed before verification.
pub async fn stripe_webhook(
    State(state): State<AppState>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if method != Method::POST {
        warn!(method = %method, "stripe_webhook_method_not_allowed");
        return (
            StatusCode::METHOD_NOT_ALLOWED,
            [(header::ALLOW, "POST")],
            "Method Not Allowed",
        )
            .into_response();
    }

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());

    info!(
        body_length = body.len(),
        has_signature = signature.is_some(),
        "stripe_webhook_received"
    );

    let event = match construct_event(
        &body,
        signature,
        &state.config.stripe_webhook_secret,
        state.config.signature_tolerance_secs,
    ) {
        Ok(event) => event,
        Err(e) => {
            warn!(error = %e, "stripe_signature_invalid");
            return (StatusCode::BAD_REQUEST, format!("Webhook Error: {}", e)).into_response();
        }
    };

    info!(event_id = event.id(), event_type = event.kind(), "stripe_event_verified");

    let result = sync_event(&state.stripe, &state.mailerlite, &event).await;

    info!(event_id = event.id(), result = ?result, "stripe_webhook_complete");

    (StatusCode::OK, Json(WebhookResponse::from(result))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::web::router;
    use crate::web::signature::compute_signature;
    use axum::body::Body;
    use axum::http::Request;
    use axum::Router;
    use serde_json::json;
    use std::time::{SystemTime, UNIX_EPOCH};
    use tower::ServiceExt;
    use wiremock::matchers::{any, body_json, method as http_method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const SECRET: &str = "whsec_test_secret";
    const WEBHOOK_PATH: &str = "/api/stripe-webhook";

    struct Harness {
        stripe: MockServer,
        mailerlite: MockServer,
        app: Router,
    }

    async fn harness() -> Harness {
        harness_with_secret(SECRET).await
    }

    async fn harness_with_secret(webhook_secret: &str) -> Harness {
        let stripe = MockServer::start().await;
        let mailerlite = MockServer::start().await;

        let config = Config {
            stripe_secret_key: "sk_test_123".to_string(),
            stripe_webhook_secret: webhook_secret.to_string(),
            stripe_api_base: stripe.uri(),
            stripe_api_version: "2024-06-20".to_string(),
            signature_tolerance_secs: 300,
            mailerlite_api_token: "ml_token".to_string(),
            mailerlite_group_id: "group_1".to_string(),
            mailerlite_api_base: mailerlite.uri(),
            request_timeout_ms: 5000,
            port: 0,
        };

        let app = router(AppState::new(config).unwrap());
        Harness {
            stripe,
            mailerlite,
            app,
        }
    }

    fn signed_request(body: &Value) -> Request<Body> {
        signed_request_with_secret(body, SECRET)
    }

    fn signed_request_with_secret(body: &Value, secret: &str) -> Request<Body> {
        let body = body.to_string();
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs();
        let signature = format!(
            "t={},v1={}",
            timestamp,
            compute_signature(secret, timestamp, body.as_bytes())
        );

        Request::builder()
            .method("POST")
            .uri(WEBHOOK_PATH)
            .header("Stripe-Signature", signature)
            .header("Content-Type", "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, HeaderMap, Vec<u8>) {
        let resp = app.clone().oneshot(request).await.unwrap();
        let status = resp.status();
        let headers = resp.headers().clone();
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, headers, body.to_vec())
    }

    async fn send_json(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let (status, _, body) = send(app, request).await;
        (status, serde_json::from_slice(&body).unwrap())
    }

    async fn expect_no_calls(server: &MockServer) {
        Mock::given(any())
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(server)
            .await;
    }

    fn checkout_event(object: Value) -> Value {
        json!({
            "id": "evt_checkout",
            "type": "checkout.session.completed",
            "data": {"object": object}
        })
    }

    fn payment_intent_event(id: &str) -> Value {
        json!({
            "id": "evt_pi",
            "type": "payment_intent.succeeded",
            "data": {"object": {"id": id, "object": "payment_intent", "amount": 1000}}
        })
    }

    #[tokio::test]
    async fn test_health() {
        let h = harness().await;
        let request = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();

        let (status, body) = send_json(&h.app, request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"status": "ok"}));
    }

    #[tokio::test]
    async fn test_non_post_methods_rejected() {
        let h = harness().await;
        expect_no_calls(&h.stripe).await;
        expect_no_calls(&h.mailerlite).await;

        for verb in ["GET", "PUT", "DELETE", "PATCH"] {
            let request = Request::builder()
                .method(verb)
                .uri(WEBHOOK_PATH)
                .body(Body::from(checkout_event(json!({})).to_string()))
                .unwrap();

            let (status, headers, body) = send(&h.app, request).await;

            assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED, "method {}", verb);
            assert_eq!(headers.get(header::ALLOW).unwrap(), "POST");
            assert_eq!(body, b"Method Not Allowed");
        }
    }

    #[tokio::test]
    async fn test_forged_signature_rejected_without_outbound_calls() {
        let h = harness().await;
        expect_no_calls(&h.stripe).await;
        expect_no_calls(&h.mailerlite).await;

        let request = Request::builder()
            .method("POST")
            .uri(WEBHOOK_PATH)
            .header("Stripe-Signature", format!("t=1700000000,v1={}", "ab".repeat(32)))
            .body(Body::from(payment_intent_event("pi_1").to_string()))
            .unwrap();

        let (status, _, body) = send(&h.app, request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(String::from_utf8(body)
            .unwrap()
            .starts_with("Webhook Error: No signatures found matching"));
    }

    #[tokio::test]
    async fn test_unconfigured_secret_rejects_empty_key_signature() {
        let h = harness_with_secret("").await;
        expect_no_calls(&h.stripe).await;
        expect_no_calls(&h.mailerlite).await;

        let event = checkout_event(json!({
            "customer_details": {"email": "a@x.com", "name": "A"}
        }));
        let (status, _, body) = send(&h.app, signed_request_with_secret(&event, "")).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body,
            b"Webhook Error: No webhook signing secret is configured."
        );
    }

    #[tokio::test]
    async fn test_missing_signature_rejected() {
        let h = harness().await;
        expect_no_calls(&h.mailerlite).await;

        let request = Request::builder()
            .method("POST")
            .uri(WEBHOOK_PATH)
            .body(Body::from(checkout_event(json!({})).to_string()))
            .unwrap();

        let (status, _, body) = send(&h.app, request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body,
            b"Webhook Error: No stripe-signature header value was provided."
        );
    }

    #[tokio::test]
    async fn test_checkout_completed_synced() {
        let h = harness().await;
        expect_no_calls(&h.stripe).await;
        Mock::given(http_method("POST"))
            .and(path("/api/subscribers"))
            .and(body_json(json!({
                "email": "a@x.com",
                "fields": {"name": "A"},
                "groups": ["group_1"]
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&h.mailerlite)
            .await;

        let event = checkout_event(json!({
            "id": "cs_1",
            "customer_details": {"email": "a@x.com", "name": "A"}
        }));
        let (status, body) = send_json(&h.app, signed_request(&event)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"received": true, "synced": true}));
    }

    #[tokio::test]
    async fn test_checkout_without_email_skipped() {
        let h = harness().await;
        expect_no_calls(&h.stripe).await;
        expect_no_calls(&h.mailerlite).await;

        let event = checkout_event(json!({
            "id": "cs_1",
            "customer_details": {"email": null, "name": "A"},
            "customer_email": null
        }));
        let (status, body) = send_json(&h.app, signed_request(&event)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"received": true, "skipped": "no_email"}));
    }

    #[tokio::test]
    async fn test_unknown_event_ignored() {
        let h = harness().await;
        expect_no_calls(&h.stripe).await;
        expect_no_calls(&h.mailerlite).await;

        let event = json!({
            "id": "evt_x",
            "type": "customer.subscription.deleted",
            "data": {"object": {"id": "sub_1"}}
        });
        let (status, body) = send_json(&h.app, signed_request(&event)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({"received": true, "ignored": "customer.subscription.deleted"})
        );
    }

    #[tokio::test]
    async fn test_payment_intent_lookup_then_mailerlite_rejection() {
        let h = harness().await;
        Mock::given(http_method("GET"))
            .and(path("/v1/payment_intents/pi_123"))
            .and(query_param("expand[]", "customer"))
            .and(query_param("expand[]", "latest_charge"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "pi_123",
                "customer": "cus_1",
                "receipt_email": "r@x.com",
                "latest_charge": {"id": "ch_1", "billing_details": {"email": "b@x.com", "name": "B"}}
            })))
            .expect(1)
            .mount(&h.stripe)
            .await;
        Mock::given(http_method("POST"))
            .and(path("/api/subscribers"))
            .and(body_json(json!({
                "email": "r@x.com",
                "fields": {"name": "B"},
                "groups": ["group_1"]
            })))
            .respond_with(ResponseTemplate::new(422).set_body_string("invalid"))
            .expect(1)
            .mount(&h.mailerlite)
            .await;

        let (status, body) =
            send_json(&h.app, signed_request(&payment_intent_event("pi_123"))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"received": true, "mailerlite_error": 422}));
    }

    #[tokio::test]
    async fn test_payment_intent_lookup_failure_is_absorbed() {
        let h = harness().await;
        Mock::given(http_method("GET"))
            .and(path("/v1/payment_intents/pi_gone"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&h.stripe)
            .await;
        expect_no_calls(&h.mailerlite).await;

        let (status, body) =
            send_json(&h.app, signed_request(&payment_intent_event("pi_gone"))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"received": true, "lookup_error": "status_404"}));
    }

    #[tokio::test]
    async fn test_payment_intent_without_email_skipped() {
        let h = harness().await;
        Mock::given(http_method("GET"))
            .and(path("/v1/payment_intents/pi_anon"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "pi_anon",
                "customer": null,
                "receipt_email": null,
                "latest_charge": null
            })))
            .expect(1)
            .mount(&h.stripe)
            .await;
        expect_no_calls(&h.mailerlite).await;

        let (status, body) =
            send_json(&h.app, signed_request(&payment_intent_event("pi_anon"))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"received": true, "skipped": "no_email"}));
    }

    #[tokio::test]
    async fn test_same_event_delivered_twice_upserts_twice() {
        let h = harness().await;
        Mock::given(http_method("POST"))
            .and(path("/api/subscribers"))
            .respond_with(ResponseTemplate::new(200))
            .expect(2)
            .mount(&h.mailerlite)
            .await;

        let event = checkout_event(json!({"customer_email": "a@x.com"}));
        for _ in 0..2 {
            let (status, body) = send_json(&h.app, signed_request(&event)).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body, json!({"received": true, "synced": true}));
        }
    }

    #[test]
    fn test_unreachable_mailerlite_response() {
        let body = serde_json::to_value(WebhookResponse::from(SyncResult::MailerLiteUnreachable))
            .unwrap();
        assert_eq!(
            body,
            json!({"received": true, "mailerlite_error": "request_failed"})
        );
    }
}
