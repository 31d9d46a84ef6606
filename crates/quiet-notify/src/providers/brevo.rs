use async_trait::async_trait;
use serde::Serialize;

use quiet_core::notify::EmailMessage;

use crate::error::ProviderError;
use crate::provider::{ensure_success, EmailProvider};

const API_URL: &str = "https://api.brevo.com/v3/smtp/email";

/// Brevo (formerly Sendinblue) adapter: `POST /v3/smtp/email` with an
/// `api-key` header.
pub struct BrevoProvider {
    client: reqwest::Client,
    api_key: String,
}

impl BrevoProvider {
    pub fn new(client: reqwest::Client, api_key: String) -> Self {
        Self { client, api_key }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Payload<'a> {
    sender: Sender<'a>,
    to: [Recipient<'a>; 1],
    subject: &'a str,
    html_content: &'a str,
    text_content: &'a str,
}

#[derive(Serialize)]
struct Sender<'a> {
    name: &'a str,
    email: &'a str,
}

#[derive(Serialize)]
struct Recipient<'a> {
    email: &'a str,
}

#[async_trait]
impl EmailProvider for BrevoProvider {
    fn name(&self) -> &'static str {
        "brevo"
    }

    async fn send(&self, msg: &EmailMessage) -> Result<(), ProviderError> {
        let payload = Payload {
            sender: Sender {
                name: &msg.from_name,
                email: &msg.from_address,
            },
            to: [Recipient { email: &msg.to }],
            subject: &msg.subject,
            html_content: &msg.html_body,
            text_content: &msg.text_body,
        };
        let resp = self
            .client
            .post(API_URL)
            .header("accept", "application/json")
            .header("api-key", &self.api_key)
            .json(&payload)
            .send()
            .await?;
        ensure_success(self.name(), resp).await
    }
}
