//! Stripe webhook signature verification.
//!
//! Stripe signs webhook requests using HMAC-SHA256 over `"{timestamp}.{body}"`.
//! Reference: https://docs.stripe.com/webhooks#verify-manually

use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tracing::warn;

use crate::stripe::Event;

type HmacSha256 = Hmac<Sha256>;

/// Name of the header carrying the signature.
pub const SIGNATURE_HEADER: &str = "stripe-signature";

/// Only `v1` signatures are HMAC-SHA256; `v0` entries are ignored.
const SIGNATURE_SCHEME: &str = "v1";

/// Why a webhook was rejected at the trust boundary.
#[derive(Debug, Error)]
pub enum SignatureError {
    #[error("No webhook signing secret is configured.")]
    MissingSecret,

    #[error("No stripe-signature header value was provided.")]
    MissingHeader,

    #[error("Unable to extract timestamp and signatures from header")]
    MalformedHeader,

    #[error(
        "No signatures found matching the expected signature for payload. \
         Are you passing the raw request body you received from Stripe?"
    )]
    NoMatchingSignature,

    #[error("Timestamp outside the tolerance zone")]
    TimestampOutsideTolerance,

    #[error("Invalid JSON payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),
}

/// Verify a webhook body and parse it into an [`Event`].
///
/// # Arguments
///
/// * `payload` - The exact request body bytes
/// * `header` - The `Stripe-Signature` header value, if present
/// * `secret` - The endpoint's signing secret
/// * `tolerance_secs` - Maximum allowed age of the signed timestamp
pub fn construct_event(
    payload: &[u8],
    header: Option<&str>,
    secret: &str,
    tolerance_secs: u64,
) -> Result<Event, SignatureError> {
    verify_header(payload, header, secret, tolerance_secs, current_timestamp())?;
    Ok(Event::parse(payload)?)
}

/// Check a `Stripe-Signature` header against the payload at time `now`.
pub fn verify_header(
    payload: &[u8],
    header: Option<&str>,
    secret: &str,
    tolerance_secs: u64,
    now: u64,
) -> Result<(), SignatureError> {
    // An empty key is public knowledge: anyone could sign with it.
    if secret.trim().is_empty() {
        warn!("stripe_signature_secret_missing");
        return Err(SignatureError::MissingSecret);
    }

    let header = header
        .filter(|h| !h.trim().is_empty())
        .ok_or(SignatureError::MissingHeader)?;

    let (timestamp, signatures) = parse_header(header).ok_or_else(|| {
        warn!(header_length = header.len(), "stripe_signature_header_malformed");
        SignatureError::MalformedHeader
    })?;

    let expected = compute_signature(secret, timestamp, payload);

    if !signatures
        .iter()
        .any(|sig| constant_time_compare(&expected, sig))
    {
        warn!(
            signature_count = signatures.len(),
            payload_length = payload.len(),
            "stripe_signature_mismatch"
        );
        return Err(SignatureError::NoMatchingSignature);
    }

    let age = now.saturating_sub(timestamp);
    if tolerance_secs > 0 && age > tolerance_secs {
        warn!(
            webhook_time = timestamp,
            current_time = now,
            age_seconds = age,
            max_age_seconds = tolerance_secs,
            "stripe_signature_stale"
        );
        return Err(SignatureError::TimestampOutsideTolerance);
    }

    Ok(())
}

/// Compute the hex `v1` signature Stripe would send for this payload.
pub fn compute_signature(secret: &str, timestamp: u64, payload: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .unwrap_or_else(|_| unreachable!("HMAC-SHA256 accepts any key length"));

    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);

    hex::encode(mac.finalize().into_bytes())
}

/// Split `t=...,v1=...,v1=...` into the timestamp and the `v1` signatures.
///
/// Returns `None` when there is no numeric timestamp or no `v1` entry.
fn parse_header(header: &str) -> Option<(u64, Vec<&str>)> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for item in header.split(',') {
        let Some((key, value)) = item.trim().split_once('=') else {
            continue;
        };

        match key {
            "t" => timestamp = value.parse::<u64>().ok(),
            SIGNATURE_SCHEME => signatures.push(value),
            _ => {}
        }
    }

    match (timestamp, signatures.is_empty()) {
        (Some(t), false) => Some((t, signatures)),
        _ => None,
    }
}

fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Constant-time string comparison to prevent timing attacks.
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}
