use thiserror::Error;

/// A single email provider attempt failed. Recovered locally by falling
/// through to the next provider in the configured order.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Transport-level failure (connect, TLS, client-side timeout).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider API answered with a non-2xx status.
    #[error("{provider} rejected the message (HTTP {status}): {body}")]
    Rejected {
        provider: &'static str,
        status: u16,
        body: String,
    },

    /// The attempt exceeded its time budget.
    #[error("Send timed out after {ms}ms")]
    Timeout { ms: u64 },
}
