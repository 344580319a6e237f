//! Stripe REST client for the payment intent lookup.

use reqwest::Client;
use thiserror::Error;
use tracing::info;
use url::Url;

use super::types::PaymentIntent;
use crate::config::{api_base_url, Config};

/// Objects inlined into the retrieved payment intent.
const PAYMENT_INTENT_EXPANSIONS: &[&str] = &["customer", "latest_charge"];

/// Failure of a Stripe API call.
#[derive(Debug, Error)]
pub enum StripeError {
    #[error("stripe request failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("stripe returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("stripe response could not be decoded: {0}")]
    Decode(#[source] reqwest::Error),

    #[error("invalid stripe url: {0}")]
    Url(#[from] url::ParseError),
}

impl StripeError {
    /// Short machine-readable reason, used in webhook responses.
    pub fn reason(&self) -> String {
        match self {
            StripeError::Request(_) => "request_failed".to_string(),
            StripeError::Status { status, .. } => format!("status_{}", status),
            StripeError::Decode(_) => "invalid_response".to_string(),
            StripeError::Url(_) => "invalid_url".to_string(),
        }
    }
}

/// Minimal Stripe API client.
#[derive(Clone)]
pub struct StripeClient {
    http: Client,
    api_base: Url,
    secret_key: String,
    api_version: String,
}

impl StripeClient {
    pub fn new(http: Client, config: &Config) -> Result<Self, StripeError> {
        Ok(Self {
            http,
            api_base: api_base_url(&config.stripe_api_base)?,
            secret_key: config.stripe_secret_key.clone(),
            api_version: config.stripe_api_version.clone(),
        })
    }

    /// Fetch a payment intent with its customer and latest charge expanded.
    ///
    /// Webhook payloads may omit billing details, so the full object is read back.
    pub async fn retrieve_payment_intent(&self, id: &str) -> Result<PaymentIntent, StripeError> {
        let mut url = self.api_base.join("v1/payment_intents/")?.join(id)?;
        {
            let mut query = url.query_pairs_mut();
            for expansion in PAYMENT_INTENT_EXPANSIONS {
                query.append_pair("expand[]", expansion);
            }
        }

        info!(payment_intent_id = id, "payment_intent_lookup_starting");

        let resp = self
            .http
            .get(url)
            .bearer_auth(&self.secret_key)
            .header("Stripe-Version", &self.api_version)
            .send()
            .await
            .map_err(StripeError::Request)?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(StripeError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let intent: PaymentIntent = resp.json().await.map_err(StripeError::Decode)?;

        info!(
            payment_intent_id = id,
            has_customer = intent.customer.is_some(),
            has_latest_charge = intent.latest_charge.is_some(),
            "payment_intent_lookup_complete"
        );

        Ok(intent)
    }
}
