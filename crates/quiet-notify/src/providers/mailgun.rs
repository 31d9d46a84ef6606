use async_trait::async_trait;

use quiet_core::notify::EmailMessage;

use crate::error::ProviderError;
use crate::provider::{ensure_success, EmailProvider};

/// Mailgun adapter: form-encoded `POST /v3/{domain}/messages` with HTTP
/// basic auth (`api` / key).
pub struct MailgunProvider {
    client: reqwest::Client,
    api_key: String,
    domain: String,
}

impl MailgunProvider {
    pub fn new(client: reqwest::Client, api_key: String, domain: String) -> Self {
        Self {
            client,
            api_key,
            domain,
        }
    }
}

#[async_trait]
impl EmailProvider for MailgunProvider {
    fn name(&self) -> &'static str {
        "mailgun"
    }

    async fn send(&self, msg: &EmailMessage) -> Result<(), ProviderError> {
        let url = format!("https://api.mailgun.net/v3/{}/messages", self.domain);
        let from = format!("{} <{}>", msg.from_name, msg.from_address);
        let form = [
            ("from", from.as_str()),
            ("to", msg.to.as_str()),
            ("subject", msg.subject.as_str()),
            ("html", msg.html_body.as_str()),
            ("text", msg.text_body.as_str()),
        ];
        let resp = self
            .client
            .post(&url)
            .basic_auth("api", Some(&self.api_key))
            .form(&form)
            .send()
            .await?;
        ensure_success(self.name(), resp).await
    }
}
