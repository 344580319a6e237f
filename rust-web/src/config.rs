//! Configuration module for environment variable parsing.
//!
//! Configuration is read once at startup and injected into the web handlers
//! through [`crate::web::AppState`].

use std::env;
use std::str::FromStr;
use tracing::warn;
use url::Url;

pub const DEFAULT_STRIPE_API_BASE: &str = "https://api.stripe.com/";
pub const DEFAULT_STRIPE_API_VERSION: &str = "2024-06-20";
pub const DEFAULT_MAILERLITE_API_BASE: &str = "https://connect.mailerlite.com/";

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Stripe secret API key, used for the payment intent lookup
    pub stripe_secret_key: String,

    /// Stripe webhook signing secret (`whsec_...`)
    pub stripe_webhook_secret: String,

    /// Stripe API base URL; a path prefix (e.g. behind a proxy) is kept
    pub stripe_api_base: String,

    /// Value sent in the `Stripe-Version` header
    pub stripe_api_version: String,

    /// Maximum age in seconds of a signed webhook timestamp
    pub signature_tolerance_secs: u64,

    /// MailerLite API bearer token
    pub mailerlite_api_token: String,

    /// MailerLite group that synced subscribers are added to
    pub mailerlite_group_id: String,

    /// MailerLite API base URL; a path prefix is kept
    pub mailerlite_api_base: String,

    /// HTTP request timeout in milliseconds for outbound calls
    pub request_timeout_ms: u64,

    /// Port for the web server to listen on
    pub port: u16,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Config {
            stripe_secret_key: required("STRIPE_SECRET_KEY"),

            stripe_webhook_secret: required("STRIPE_WEBHOOK_SECRET"),

            stripe_api_base: env::var("STRIPE_API_BASE")
                .unwrap_or_else(|_| DEFAULT_STRIPE_API_BASE.to_string()),

            stripe_api_version: env::var("STRIPE_API_VERSION")
                .unwrap_or_else(|_| DEFAULT_STRIPE_API_VERSION.to_string()),

            signature_tolerance_secs: parse_or("STRIPE_SIGNATURE_TOLERANCE", 300),

            mailerlite_api_token: required("MAILERLITE_API_TOKEN"),

            mailerlite_group_id: required("MAILERLITE_GROUP_ID"),

            mailerlite_api_base: env::var("MAILERLITE_API_BASE")
                .unwrap_or_else(|_| DEFAULT_MAILERLITE_API_BASE.to_string()),

            request_timeout_ms: parse_or("REQUEST_TIMEOUT_MS", 10_000),

            port: parse_or("PORT", 8080),
        }
    }
}

/// Parse an API base URL so that relative joins land under its path.
///
/// `Url::join` replaces the last segment of a path without a trailing slash,
/// so one is added.
pub fn api_base_url(raw: &str) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(raw.trim())?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Read a variable the service cannot work without.
///
/// A missing value does not stop startup. Without a webhook secret every
/// delivery is rejected; the other values surface as failed downstream calls.
fn required(name: &str) -> String {
    match env::var(name) {
        Ok(v) if !v.trim().is_empty() => v,
        _ => {
            warn!(env_var = name, "required_env_var_missing");
            String::new()
        }
    }
}

/// Parse a variable, falling back to `default` when unset or invalid.
fn parse_or<T: FromStr>(name: &str, default: T) -> T {
    let raw = match env::var(name) {
        Ok(v) => v,
        Err(_) => return default,
    };

    match raw.trim().parse() {
        Ok(v) => v,
        Err(_) => {
            warn!(env_var = name, value = %raw, "Invalid numeric value, using default");
            default
        }
    }
}
