//! SubSync - Stripe to MailerLite subscriber bridge.
//!
//! Receives Stripe webhooks, verifies their signature, works out the paying
//! customer's email and name, and upserts them into a MailerLite group.
//!
//! ## Architecture
//!
//! ```text
//! Stripe → /api/stripe-webhook → verify → resolve contact → MailerLite
//!                                              ↑
//!                              payment intent lookup (payment_intent.succeeded)
//! ```

pub mod config;
pub mod contact;
pub mod mailerlite;
pub mod stripe;
pub mod sync;
pub mod web;

// Re-export commonly used types
pub use config::Config;
pub use contact::ContactRecord;
pub use mailerlite::MailerLiteClient;
pub use stripe::{Event, StripeClient};
pub use sync::{sync_event, SyncResult};
pub use web::AppState;
