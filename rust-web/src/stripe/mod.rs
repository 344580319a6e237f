//! Stripe integration: event types and the payment intent lookup.

pub mod client;
pub mod types;

pub use client::{StripeClient, StripeError};
pub use types::{
    BillingDetails, Charge, CheckoutSession, Customer, CustomerDetails, Event, EventPayload,
    Expandable, List, PaymentIntent, PaymentIntentRef, CHECKOUT_SESSION_COMPLETED,
    PAYMENT_INTENT_SUCCEEDED,
};
