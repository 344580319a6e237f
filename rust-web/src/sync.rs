//! Event dispatch and subscriber sync.
//!
//! ## Flow
//!
//! ```text
//! Event → resolve contact (lookup for payment intents) → MailerLite upsert → SyncResult
//! ```
//!
//! Every outcome is terminal. Nothing is retried: Stripe re-delivering the
//! webhook would only repeat a downstream failure.

use tracing::{error, info, warn};

use crate::contact::{self, ContactRecord};
use crate::mailerlite::{MailerLiteClient, MailerLiteError};
use crate::stripe::{Event, EventPayload, StripeClient};

/// Outcome of processing one verified event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncResult {
    /// The contact was upserted
    Synced,
    /// No email could be resolved from the event
    SkippedNoEmail,
    /// The event kind is not handled
    Ignored(String),
    /// The payment intent lookup failed; carries a short reason
    LookupFailed(String),
    /// MailerLite answered with a non-success status
    MailerLiteRejected(u16),
    /// MailerLite could not be reached
    MailerLiteUnreachable,
}

/// Resolve the contact carried by `event` and push it to MailerLite.
pub async fn sync_event(
    stripe: &StripeClient,
    mailerlite: &MailerLiteClient,
    event: &Event,
) -> SyncResult {
    let contact = match resolve_contact(stripe, event).await {
        Ok(Some(contact)) => contact,
        Ok(None) => {
            warn!(event_id = event.id(), event_type = event.kind(), "contact_no_email");
            return SyncResult::SkippedNoEmail;
        }
        Err(result) => return result,
    };

    info!(
        event_id = event.id(),
        email = %contact.email(),
        has_name = contact.name().is_some(),
        "contact_resolved"
    );

    match mailerlite.upsert_subscriber(&contact).await {
        Ok(()) => SyncResult::Synced,
        Err(MailerLiteError::Status { status, body }) => {
            error!(
                event_id = event.id(),
                status_code = status,
                body = %body,
                "mailerlite_upsert_failed"
            );
            SyncResult::MailerLiteRejected(status)
        }
        Err(e) => {
            error!(event_id = event.id(), error = %e, "mailerlite_upsert_failed");
            SyncResult::MailerLiteUnreachable
        }
    }
}

/// Find the contact for a handled event kind.
///
/// `Err` carries the terminal result for events that stop here
/// (ignored kinds and failed lookups).
async fn resolve_contact(
    stripe: &StripeClient,
    event: &Event,
) -> Result<Option<ContactRecord>, SyncResult> {
    match event.payload() {
        EventPayload::CheckoutSessionCompleted(session) => {
            info!(event_id = event.id(), session_id = ?session.id, "checkout_session_routing");
            Ok(contact::from_checkout_session(session))
        }
        EventPayload::PaymentIntentSucceeded(pi) => {
            info!(event_id = event.id(), payment_intent_id = %pi.id, "payment_intent_routing");
            match stripe.retrieve_payment_intent(&pi.id).await {
                Ok(intent) => Ok(contact::from_payment_intent(&intent)),
                Err(e) => {
                    error!(
                        event_id = event.id(),
                        payment_intent_id = %pi.id,
                        error = %e,
                        "payment_intent_lookup_failed"
                    );
                    Err(SyncResult::LookupFailed(e.reason()))
                }
            }
        }
        EventPayload::Other => {
            info!(event_id = event.id(), event_type = event.kind(), "event_ignored");
            Err(SyncResult::Ignored(event.kind().to_string()))
        }
    }
}
