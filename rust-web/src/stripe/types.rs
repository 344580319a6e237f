//! Stripe object types used by the webhook bridge.
//!
//! Only the fields needed to resolve a contact are modelled. Every field is
//! optional because Stripe omits or nulls them freely depending on how the
//! checkout or payment was created.

use serde::Deserialize;

/// Event type for a finished Checkout session.
pub const CHECKOUT_SESSION_COMPLETED: &str = "checkout.session.completed";

/// Event type for a captured payment intent.
pub const PAYMENT_INTENT_SUCCEEDED: &str = "payment_intent.succeeded";

// =============================================================================
// Event Envelope
// =============================================================================

/// A webhook event whose signature has been verified.
///
/// There is no public constructor: the only way to obtain one is
/// [`crate::web::signature::construct_event`], which checks the signature
/// before the bytes are parsed.
#[derive(Debug, Clone)]
pub struct Event {
    id: String,
    kind: String,
    payload: EventPayload,
}

/// Typed payload of an [`Event`], one variant per event kind we act on.
#[derive(Debug, Clone)]
pub enum EventPayload {
    CheckoutSessionCompleted(CheckoutSession),
    PaymentIntentSucceeded(PaymentIntentRef),
    /// Any event kind the bridge does not handle
    Other,
}

#[derive(Deserialize)]
struct RawEvent {
    #[serde(default)]
    id: String,
    #[serde(rename = "type")]
    kind: String,
    data: RawEventData,
}

#[derive(Deserialize)]
struct RawEventData {
    object: serde_json::Value,
}

impl Event {
    /// Parse an event envelope and its kind-specific payload.
    ///
    /// Must only be called on bytes that passed signature verification.
    pub(crate) fn parse(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        let raw: RawEvent = serde_json::from_slice(bytes)?;

        let payload = match raw.kind.as_str() {
            CHECKOUT_SESSION_COMPLETED => {
                EventPayload::CheckoutSessionCompleted(serde_json::from_value(raw.data.object)?)
            }
            PAYMENT_INTENT_SUCCEEDED => {
                EventPayload::PaymentIntentSucceeded(serde_json::from_value(raw.data.object)?)
            }
            _ => EventPayload::Other,
        };

        Ok(Event {
            id: raw.id,
            kind: raw.kind,
            payload,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// The Stripe event type, e.g. `checkout.session.completed`.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn payload(&self) -> &EventPayload {
        &self.payload
    }
}

// =============================================================================
// Checkout
// =============================================================================

/// `checkout.session` object as delivered inside the event.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckoutSession {
    #[serde(default)]
    pub id: Option<String>,
    /// Details collected from the customer during checkout
    #[serde(default)]
    pub customer_details: Option<CustomerDetails>,
    /// Email passed in when the session was created
    #[serde(default)]
    pub customer_email: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CustomerDetails {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

// =============================================================================
// Payment Intents
// =============================================================================

/// The payment intent carried by a `payment_intent.succeeded` event.
///
/// Only the ID is used; the full object is re-fetched with expansions.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentIntentRef {
    pub id: String,
}

/// Payment intent retrieved with `customer` and `latest_charge` expanded.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    #[serde(default)]
    pub customer: Option<Expandable<Customer>>,
    #[serde(default)]
    pub receipt_email: Option<String>,
    /// The charge that captured the payment (API versions from 2022-11-15)
    #[serde(default)]
    pub latest_charge: Option<Expandable<Charge>>,
    /// Embedded charge list, only returned when pinned to an older API version
    #[serde(default)]
    pub charges: Option<List<Charge>>,
}

/// A field Stripe returns either as an ID or, when expanded, as the object.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Expandable<T> {
    Id(String),
    Object(Box<T>),
}

impl<T> Expandable<T> {
    /// The expanded object, if the API returned one.
    pub fn as_object(&self) -> Option<&T> {
        match self {
            Expandable::Id(_) => None,
            Expandable::Object(obj) => Some(obj),
        }
    }
}

/// Stripe customer. Deleted customers come back without email or name.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Customer {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// Stripe list envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct List<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Charge {
    #[serde(default)]
    pub billing_details: Option<BillingDetails>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BillingDetails {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}
