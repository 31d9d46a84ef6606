use async_trait::async_trait;
use serde::Serialize;

use quiet_core::notify::EmailMessage;

use crate::error::ProviderError;
use crate::provider::{ensure_success, EmailProvider};

const API_URL: &str = "https://api.resend.com/emails";

/// Resend adapter: `POST /emails` with a bearer key.
pub struct ResendProvider {
    client: reqwest::Client,
    api_key: String,
}

impl ResendProvider {
    pub fn new(client: reqwest::Client, api_key: String) -> Self {
        Self { client, api_key }
    }
}

#[derive(Serialize)]
struct Payload<'a> {
    from: String,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
    text: &'a str,
}

#[async_trait]
impl EmailProvider for ResendProvider {
    fn name(&self) -> &'static str {
        "resend"
    }

    async fn send(&self, msg: &EmailMessage) -> Result<(), ProviderError> {
        let payload = Payload {
            from: format!("{} <{}>", msg.from_name, msg.from_address),
            to: [msg.to.as_str()],
            subject: &msg.subject,
            html: &msg.html_body,
            text: &msg.text_body,
        };
        let resp = self
            .client
            .post(API_URL)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await?;
        ensure_success(self.name(), resp).await
    }
}
