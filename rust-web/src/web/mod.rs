//! Web server module for handling inbound Stripe webhooks.
//!
//! Routes:
//! - `GET /health`: liveness probe
//! - `/api/stripe-webhook`: Stripe events (POST only; other methods get 405)

pub mod handlers;
pub mod signature;

use axum::{
    routing::{any, get},
    Router,
};
use tower_http::trace::TraceLayer;

pub use handlers::{health, stripe_webhook, AppState, HealthResponse, WebhookResponse};
pub use signature::{compute_signature, construct_event, verify_header, SignatureError};

/// Path Stripe is configured to deliver events to.
pub const STRIPE_WEBHOOK_PATH: &str = "/api/stripe-webhook";

/// Build the application router.
///
/// The webhook route accepts every method so the handler can answer 405
/// with an `Allow` header itself.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(STRIPE_WEBHOOK_PATH, any(stripe_webhook))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
