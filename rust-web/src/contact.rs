//! Contact extraction from Stripe objects.
//!
//! Each event kind has a fixed resolution order for email and name. A source
//! that is missing, null or blank falls through to the next one.

use crate::stripe::{Charge, CheckoutSession, PaymentIntent};

/// A contact ready to be pushed to the mailing list.
///
/// The email is always non-blank; construction fails otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactRecord {
    email: String,
    name: Option<String>,
}

impl ContactRecord {
    /// Build a record, returning `None` when there is no usable email.
    pub fn new(email: &str, name: Option<&str>) -> Option<Self> {
        let email = present(Some(email))?;
        Some(Self {
            email: email.to_string(),
            name: present(name).map(str::to_string),
        })
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

/// Resolve the contact of a completed checkout session.
///
/// Email: `customer_details.email`, then `customer_email`.
/// Name: `customer_details.name`.
pub fn from_checkout_session(session: &CheckoutSession) -> Option<ContactRecord> {
    let details = session.customer_details.as_ref();

    let email = present(details.and_then(|d| d.email.as_deref()))
        .or_else(|| present(session.customer_email.as_deref()))?;
    let name = details.and_then(|d| d.name.as_deref());

    ContactRecord::new(email, name)
}

/// Resolve the contact of an expanded payment intent.
///
/// Email: expanded customer, then `receipt_email`, then the charge's billing
/// details. Name: expanded customer, then the charge's billing details.
///
/// The charge is the expanded `latest_charge`, or the first entry of the
/// legacy `charges` list when the account is pinned to an older API version.
pub fn from_payment_intent(intent: &PaymentIntent) -> Option<ContactRecord> {
    let customer = intent.customer.as_ref().and_then(|c| c.as_object());
    let billing = paying_charge(intent).and_then(|c| c.billing_details.as_ref());

    let email = present(customer.and_then(|c| c.email.as_deref()))
        .or_else(|| present(intent.receipt_email.as_deref()))
        .or_else(|| present(billing.and_then(|b| b.email.as_deref())))?;
    let name = present(customer.and_then(|c| c.name.as_deref()))
        .or_else(|| present(billing.and_then(|b| b.name.as_deref())));

    ContactRecord::new(email, name)
}

fn paying_charge(intent: &PaymentIntent) -> Option<&Charge> {
    intent
        .latest_charge
        .as_ref()
        .and_then(|c| c.as_object())
        .or_else(|| intent.charges.as_ref().and_then(|list| list.data.first()))
}

fn present(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}
