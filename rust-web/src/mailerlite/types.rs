//! MailerLite subscriber API payloads.

use serde::Serialize;

use crate::contact::ContactRecord;

/// Body of `POST /api/subscribers`.
///
/// MailerLite treats this endpoint as an upsert keyed by email.
#[derive(Debug, Clone, Serialize)]
pub struct SubscriberRequest<'a> {
    pub email: &'a str,
    pub fields: SubscriberFields<'a>,
    pub groups: Vec<&'a str>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubscriberFields<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<&'a str>,
}

impl<'a> SubscriberRequest<'a> {
    pub fn new(contact: &'a ContactRecord, group_id: &'a str) -> Self {
        Self {
            email: contact.email(),
            fields: SubscriberFields {
                name: contact.name(),
            },
            groups: vec![group_id],
        }
    }
}
