use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use quiet_core::config::{ProvidersConfig, PROVIDER_TIMEOUT_SECS};
use quiet_core::notify::EmailMessage;

use crate::error::ProviderError;
use crate::providers::{brevo::BrevoProvider, mailgun::MailgunProvider, resend::ResendProvider};

/// Common interface implemented by every email delivery adapter.
///
/// Implementations must be `Send + Sync` so the dispatcher can hold them in
/// an ordered list and drive them from the engine task.
#[async_trait]
pub trait EmailProvider: Send + Sync {
    /// Stable lowercase identifier for this provider (e.g. `"resend"`).
    /// Matches the names accepted in `providers.order`.
    fn name(&self) -> &'static str;

    /// Deliver a single reminder. A `Result::Err` means this provider is
    /// done with the message; the dispatcher falls through to the next one.
    async fn send(&self, msg: &EmailMessage) -> Result<(), ProviderError>;
}

/// Build the shared HTTP client used by all adapters.
///
/// The client-level timeout is a backstop; the dispatcher additionally wraps
/// each attempt in its own timeout so a misconfigured client can't stall a
/// run.
pub fn default_client() -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(PROVIDER_TIMEOUT_SECS))
        .build()
}

/// Instantiate the configured adapters in strict `providers.order`.
///
/// Providers named in the order but missing their credentials section are
/// skipped with a debug note; unknown names get a warning. An empty result
/// is legal; dispatch then fails every block until credentials appear,
/// which is the loudest safe behavior available.
pub fn build_providers(
    cfg: &ProvidersConfig,
    client: &reqwest::Client,
) -> Vec<Box<dyn EmailProvider>> {
    let mut out: Vec<Box<dyn EmailProvider>> = Vec::new();
    for name in &cfg.order {
        match name.as_str() {
            "resend" => match &cfg.resend {
                Some(rc) => out.push(Box::new(ResendProvider::new(
                    client.clone(),
                    rc.api_key.clone(),
                ))),
                None => debug!("resend listed in providers.order but not configured; skipping"),
            },
            "brevo" => match &cfg.brevo {
                Some(bc) => out.push(Box::new(BrevoProvider::new(
                    client.clone(),
                    bc.api_key.clone(),
                ))),
                None => debug!("brevo listed in providers.order but not configured; skipping"),
            },
            "mailgun" => match &cfg.mailgun {
                Some(mc) => out.push(Box::new(MailgunProvider::new(
                    client.clone(),
                    mc.api_key.clone(),
                    mc.domain.clone(),
                ))),
                None => debug!("mailgun listed in providers.order but not configured; skipping"),
            },
            other => warn!(provider = other, "unknown provider name in providers.order"),
        }
    }
    out
}

/// Shared non-2xx handling for all HTTP adapters.
pub(crate) async fn ensure_success(
    provider: &'static str,
    resp: reqwest::Response,
) -> Result<(), ProviderError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(());
    }
    let body = resp.text().await.unwrap_or_default();
    Err(ProviderError::Rejected {
        provider,
        status: status.as_u16(),
        body,
    })
}
