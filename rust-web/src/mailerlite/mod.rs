//! MailerLite integration: the subscriber upsert call.

pub mod client;
pub mod types;

pub use client::{MailerLiteClient, MailerLiteError};
pub use types::{SubscriberFields, SubscriberRequest};
