//! MailerLite client for upserting subscribers into a group.

use reqwest::Client;
use thiserror::Error;
use tracing::info;
use url::Url;

use super::types::SubscriberRequest;
use crate::contact::ContactRecord;
use crate::config::{api_base_url, Config};

/// Failure of a subscriber upsert.
#[derive(Debug, Error)]
pub enum MailerLiteError {
    #[error("mailerlite request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("mailerlite returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid mailerlite url: {0}")]
    Url(#[from] url::ParseError),
}

/// Minimal MailerLite API client.
#[derive(Clone)]
pub struct MailerLiteClient {
    http: Client,
    api_base: Url,
    api_token: String,
    group_id: String,
}

impl MailerLiteClient {
    pub fn new(http: Client, config: &Config) -> Result<Self, MailerLiteError> {
        Ok(Self {
            http,
            api_base: api_base_url(&config.mailerlite_api_base)?,
            api_token: config.mailerlite_api_token.clone(),
            group_id: config.mailerlite_group_id.clone(),
        })
    }

    /// Create or update the subscriber and add it to the configured group.
    ///
    /// Makes exactly one request; there is no retry.
    pub async fn upsert_subscriber(&self, contact: &ContactRecord) -> Result<(), MailerLiteError> {
        let url = self.api_base.join("api/subscribers")?;
        let body = SubscriberRequest::new(contact, &self.group_id);

        let resp = self
            .http
            .post(url)
            .bearer_auth(&self.api_token)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(MailerLiteError::Status {
                status: status.as_u16(),
                body,
            });
        }

        info!(
            email = %contact.email(),
            status_code = status.as_u16(),
            group_id = %self.group_id,
            "mailerlite_upsert_complete"
        );

        Ok(())
    }
}
