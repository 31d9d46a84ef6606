use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{info, warn};

use quiet_core::config::{NotifyConfig, PROVIDER_TIMEOUT_SECS};
use quiet_core::error::StoreError;
use quiet_core::notify::{EmailMessage, IdentityProvider, NotificationStore};
use quiet_core::types::{DispatchFailure, DispatchReport, QuietBlock};

use crate::error::ProviderError;
use crate::provider::EmailProvider;
use crate::select::{select_due, select_late};
use crate::template;

/// The run as a whole failed: the store itself was unreachable. Per-block
/// problems never surface here; they go in the report's `failures` and are
/// retried next run.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("store unavailable: {0}")]
    Store(#[from] StoreError),
}

/// Walks due blocks and delivers reminders through the provider chain.
///
/// Holds only trait objects so tests (and any future store) can swap the
/// collaborators without touching dispatch logic.
pub struct Dispatcher {
    store: Arc<dyn NotificationStore>,
    identity: Arc<dyn IdentityProvider>,
    providers: Vec<Box<dyn EmailProvider>>,
    lookahead_minutes: i64,
    grace_minutes: i64,
    from_name: String,
    from_address: String,
}

enum Outcome {
    Sent,
    AlreadyHandled,
    Failed(String),
}

impl Dispatcher {
    pub fn new(
        store: Arc<dyn NotificationStore>,
        identity: Arc<dyn IdentityProvider>,
        providers: Vec<Box<dyn EmailProvider>>,
        cfg: &NotifyConfig,
    ) -> Self {
        Self {
            store,
            identity,
            providers,
            lookahead_minutes: cfg.lookahead_minutes,
            grace_minutes: cfg.grace_minutes,
            from_name: cfg.from_name.clone(),
            from_address: cfg.from_address.clone(),
        }
    }

    /// Run one dispatch pass at `now`.
    ///
    /// Late (missed-window) blocks are attempted before upcoming ones so the
    /// most overdue reminder goes out first. One block's failure never stops
    /// the rest of the batch.
    pub async fn dispatch(&self, now: DateTime<Utc>) -> Result<DispatchReport, DispatchError> {
        let pending = self.store.list_not_notified()?;

        let mut batch = select_late(now, self.grace_minutes, &pending);
        batch.extend(select_due(now, self.lookahead_minutes, &pending));

        let mut report = DispatchReport::default();
        for block in &batch {
            report.attempted += 1;
            match self.notify_one(block, now).await {
                Outcome::Sent => report.sent += 1,
                Outcome::AlreadyHandled => {
                    info!(block_id = %block.id, "block already handled by a concurrent run");
                    report.already_handled += 1;
                }
                Outcome::Failed(reason) => {
                    warn!(block_id = %block.id, %reason, "reminder not delivered this run");
                    report.failures.push(DispatchFailure {
                        block_id: block.id.clone(),
                        reason,
                    });
                }
            }
        }
        Ok(report)
    }

    /// Resolve, render, and deliver one reminder, then record the outcome.
    async fn notify_one(&self, block: &QuietBlock, now: DateTime<Utc>) -> Outcome {
        let to = match self.identity.email_for_owner(&block.owner_id) {
            Ok(Some(email)) => email,
            Ok(None) => {
                return Outcome::Failed(format!(
                    "no email on record for owner {}",
                    block.owner_id
                ))
            }
            Err(e) => return Outcome::Failed(format!("identity lookup failed: {e}")),
        };

        let rendered = template::render(&block.description, block.starts_at, block.ends_at);
        let msg = EmailMessage {
            to,
            from_name: self.from_name.clone(),
            from_address: self.from_address.clone(),
            subject: rendered.subject,
            html_body: rendered.html,
            text_body: rendered.text,
        };

        match self.try_providers(&msg).await {
            Ok(provider) => {
                info!(block_id = %block.id, provider, "reminder sent");
                // The conditional flip decides whether *this* run owns the
                // delivery; a lost race means a concurrent run beat us to it
                // and the block is done either way.
                match self.store.try_mark_notified(&block.id, now) {
                    Ok(true) => Outcome::Sent,
                    Ok(false) => Outcome::AlreadyHandled,
                    Err(e) => Outcome::Failed(format!("sent but failed to record delivery: {e}")),
                }
            }
            Err(reason) => Outcome::Failed(reason),
        }
    }

    /// Walk the provider chain in strict configured order. Returns the name
    /// of the provider that accepted the message, or the last failure reason
    /// once the chain is exhausted.
    async fn try_providers(&self, msg: &EmailMessage) -> Result<&'static str, String> {
        let mut last_error = "no email providers configured".to_string();
        for provider in &self.providers {
            let budget = Duration::from_secs(PROVIDER_TIMEOUT_SECS);
            match tokio::time::timeout(budget, provider.send(msg)).await {
                Ok(Ok(())) => return Ok(provider.name()),
                Ok(Err(e)) => {
                    warn!(
                        provider = provider.name(),
                        error = %e,
                        "provider attempt failed; falling through"
                    );
                    last_error = e.to_string();
                }
                Err(_) => {
                    let e = ProviderError::Timeout {
                        ms: budget.as_millis() as u64,
                    };
                    warn!(
                        provider = provider.name(),
                        error = %e,
                        "provider attempt timed out; falling through"
                    );
                    last_error = e.to_string();
                }
            }
        }
        Err(last_error)
    }

    /// Send a plumbing-test email to `to` through the real provider chain.
    /// Used by the API's email-test route; no store writes involved.
    pub async fn send_test_email(
        &self,
        to: &str,
        now: DateTime<Utc>,
    ) -> Result<&'static str, String> {
        let rendered = template::render(
            "Provider configuration test",
            now,
            now + chrono::Duration::minutes(30),
        );
        let msg = EmailMessage {
            to: to.to_string(),
            from_name: self.from_name.clone(),
            from_address: self.from_address.clone(),
            subject: rendered.subject,
            html_body: rendered.html,
            text_body: rendered.text,
        };
        self.try_providers(&msg).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use quiet_core::error::{IdentityError, StoreResult};
    use uuid::Uuid;

    fn t(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s)
            .unwrap()
            .with_timezone(&Utc)
    }

    fn block(start: &str, end: &str) -> QuietBlock {
        QuietBlock {
            id: Uuid::new_v4().to_string(),
            owner_id: "owner-1".to_string(),
            starts_at: t(start),
            ends_at: t(end),
            description: "physics revision".to_string(),
            notified: false,
            created_at: t("2024-01-01T00:00:00Z"),
            updated_at: t("2024-01-01T00:00:00Z"),
        }
    }

    /// In-memory store with real conditional-update semantics.
    struct MemStore {
        blocks: Mutex<Vec<QuietBlock>>,
    }

    impl MemStore {
        fn with(blocks: Vec<QuietBlock>) -> Arc<Self> {
            Arc::new(Self {
                blocks: Mutex::new(blocks),
            })
        }

        fn notified(&self, id: &str) -> bool {
            self.blocks
                .lock()
                .unwrap()
                .iter()
                .find(|b| b.id == id)
                .map(|b| b.notified)
                .unwrap_or(false)
        }
    }

    impl NotificationStore for MemStore {
        fn list_not_notified(&self) -> StoreResult<Vec<QuietBlock>> {
            Ok(self
                .blocks
                .lock()
                .unwrap()
                .iter()
                .filter(|b| !b.notified)
                .cloned()
                .collect())
        }

        fn try_mark_notified(&self, id: &str, now: DateTime<Utc>) -> StoreResult<bool> {
            let mut blocks = self.blocks.lock().unwrap();
            match blocks.iter_mut().find(|b| b.id == id && !b.notified) {
                Some(b) => {
                    b.notified = true;
                    b.updated_at = now;
                    Ok(true)
                }
                None => Ok(false),
            }
        }
    }

    /// Store where every flip is lost. Simulates a concurrent run that
    /// always wins the compare-and-set.
    struct RacedStore {
        inner: Arc<MemStore>,
    }

    impl NotificationStore for RacedStore {
        fn list_not_notified(&self) -> StoreResult<Vec<QuietBlock>> {
            self.inner.list_not_notified()
        }

        fn try_mark_notified(&self, _id: &str, _now: DateTime<Utc>) -> StoreResult<bool> {
            Ok(false)
        }
    }

    /// Store that is down entirely.
    struct DownStore;

    impl NotificationStore for DownStore {
        fn list_not_notified(&self) -> StoreResult<Vec<QuietBlock>> {
            Err(StoreError::Database("connection refused".to_string()))
        }

        fn try_mark_notified(&self, _id: &str, _now: DateTime<Utc>) -> StoreResult<bool> {
            Err(StoreError::Database("connection refused".to_string()))
        }
    }

    struct FixedIdentity(Option<String>);

    impl IdentityProvider for FixedIdentity {
        fn email_for_owner(&self, _owner_id: &str) -> Result<Option<String>, IdentityError> {
            Ok(self.0.clone())
        }
    }

    /// Provider that records send counts and can be told to fail.
    struct MockProvider {
        label: &'static str,
        fail: bool,
        sends: Arc<AtomicUsize>,
    }

    impl MockProvider {
        fn ok(label: &'static str, sends: Arc<AtomicUsize>) -> Box<dyn EmailProvider> {
            Box::new(Self {
                label,
                fail: false,
                sends,
            })
        }

        fn failing(label: &'static str) -> Box<dyn EmailProvider> {
            Box::new(Self {
                label,
                fail: true,
                sends: Arc::new(AtomicUsize::new(0)),
            })
        }
    }

    #[async_trait]
    impl EmailProvider for MockProvider {
        fn name(&self) -> &'static str {
            self.label
        }

        async fn send(&self, _msg: &EmailMessage) -> Result<(), ProviderError> {
            if self.fail {
                return Err(ProviderError::Rejected {
                    provider: self.label,
                    status: 500,
                    body: "boom".to_string(),
                });
            }
            self.sends.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn dispatcher(
        store: Arc<dyn NotificationStore>,
        providers: Vec<Box<dyn EmailProvider>>,
    ) -> Dispatcher {
        Dispatcher::new(
            store,
            Arc::new(FixedIdentity(Some("ana@example.com".to_string()))),
            providers,
            &NotifyConfig::default(),
        )
    }

    const NOW: &str = "2024-01-16T09:50:00Z";

    #[tokio::test]
    async fn due_block_is_sent_and_marked() {
        let b = block("2024-01-16T09:55:00Z", "2024-01-16T10:55:00Z");
        let id = b.id.clone();
        let store = MemStore::with(vec![b]);
        let sends = Arc::new(AtomicUsize::new(0));

        let d = dispatcher(store.clone(), vec![MockProvider::ok("resend", sends.clone())]);
        let report = d.dispatch(t(NOW)).await.unwrap();

        assert_eq!(report.attempted, 1);
        assert_eq!(report.sent, 1);
        assert!(report.failures.is_empty());
        assert_eq!(sends.load(Ordering::SeqCst), 1);
        assert!(store.notified(&id));
    }

    #[tokio::test]
    async fn fallback_to_second_provider_counts_as_clean_send() {
        let b = block("2024-01-16T09:55:00Z", "2024-01-16T10:55:00Z");
        let id = b.id.clone();
        let store = MemStore::with(vec![b]);
        let sends = Arc::new(AtomicUsize::new(0));

        let d = dispatcher(
            store.clone(),
            vec![
                MockProvider::failing("resend"),
                MockProvider::ok("brevo", sends.clone()),
            ],
        );
        let report = d.dispatch(t(NOW)).await.unwrap();

        assert_eq!(report.sent, 1);
        assert!(report.failures.is_empty());
        assert_eq!(sends.load(Ordering::SeqCst), 1);
        assert!(store.notified(&id));
    }

    #[tokio::test]
    async fn all_providers_failing_leaves_block_retryable() {
        let b = block("2024-01-16T09:55:00Z", "2024-01-16T10:55:00Z");
        let id = b.id.clone();
        let store = MemStore::with(vec![b]);

        let d = dispatcher(
            store.clone(),
            vec![
                MockProvider::failing("resend"),
                MockProvider::failing("brevo"),
            ],
        );
        let report = d.dispatch(t(NOW)).await.unwrap();
        assert_eq!(report.sent, 0);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].block_id, id);
        assert!(!store.notified(&id));

        // Same now, same block: still eligible, retried.
        let report = d.dispatch(t(NOW)).await.unwrap();
        assert_eq!(report.attempted, 1);
        assert_eq!(report.failures.len(), 1);
    }

    #[tokio::test]
    async fn missing_owner_email_is_terminal_for_the_run() {
        let b = block("2024-01-16T09:55:00Z", "2024-01-16T10:55:00Z");
        let store = MemStore::with(vec![b]);
        let sends = Arc::new(AtomicUsize::new(0));

        let d = Dispatcher::new(
            store.clone(),
            Arc::new(FixedIdentity(None)),
            vec![MockProvider::ok("resend", sends.clone())],
            &NotifyConfig::default(),
        );
        let report = d.dispatch(t(NOW)).await.unwrap();

        assert_eq!(report.failures.len(), 1);
        assert!(report.failures[0].reason.contains("no email on record"));
        // No provider was even tried.
        assert_eq!(sends.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn lost_conditional_update_reports_already_handled() {
        let b = block("2024-01-16T09:55:00Z", "2024-01-16T10:55:00Z");
        let store = Arc::new(RacedStore {
            inner: MemStore::with(vec![b]),
        });
        let sends = Arc::new(AtomicUsize::new(0));

        let d = dispatcher(store, vec![MockProvider::ok("resend", sends.clone())]);
        let report = d.dispatch(t(NOW)).await.unwrap();

        assert_eq!(report.sent, 0);
        assert_eq!(report.already_handled, 1);
        assert!(report.failures.is_empty());
    }

    #[tokio::test]
    async fn concurrent_dispatchers_send_exactly_once() {
        let b = block("2024-01-16T09:55:00Z", "2024-01-16T10:55:00Z");
        let id = b.id.clone();
        let store = MemStore::with(vec![b]);
        let sends = Arc::new(AtomicUsize::new(0));

        let d1 = dispatcher(store.clone(), vec![MockProvider::ok("resend", sends.clone())]);
        let d2 = dispatcher(store.clone(), vec![MockProvider::ok("resend", sends.clone())]);

        let (r1, r2) = tokio::join!(d1.dispatch(t(NOW)), d2.dispatch(t(NOW)));
        let (r1, r2) = (r1.unwrap(), r2.unwrap());

        // However the two runs interleave, the flag flips once and the
        // reports agree: one combined send, never two.
        assert_eq!(r1.sent + r2.sent, 1);
        assert!(r1.failures.is_empty() && r2.failures.is_empty());
        assert!(store.notified(&id));
    }

    #[tokio::test]
    async fn late_block_within_grace_still_gets_a_reminder() {
        // Started 20 minutes ago, grace is 30: late but eligible.
        let b = block("2024-01-16T09:30:00Z", "2024-01-16T10:30:00Z");
        let id = b.id.clone();
        let store = MemStore::with(vec![b]);
        let sends = Arc::new(AtomicUsize::new(0));

        let d = dispatcher(store.clone(), vec![MockProvider::ok("resend", sends.clone())]);
        let report = d.dispatch(t(NOW)).await.unwrap();

        assert_eq!(report.sent, 1);
        assert!(store.notified(&id));
    }

    #[tokio::test]
    async fn block_past_grace_is_dropped() {
        // Started 40 minutes ago, grace is 30: permanently ineligible.
        let b = block("2024-01-16T09:10:00Z", "2024-01-16T10:10:00Z");
        let store = MemStore::with(vec![b]);

        let d = dispatcher(store, vec![MockProvider::failing("resend")]);
        let report = d.dispatch(t(NOW)).await.unwrap();
        assert_eq!(report.attempted, 0);
    }

    #[tokio::test]
    async fn unreachable_store_fails_the_run() {
        let d = dispatcher(Arc::new(DownStore), vec![MockProvider::failing("resend")]);
        let err = d.dispatch(t(NOW)).await.unwrap_err();
        assert!(matches!(err, DispatchError::Store(_)));
    }

    #[tokio::test]
    async fn one_bad_block_does_not_abort_the_batch() {
        // Two due blocks for different owners; identity knows only one.
        let mut b1 = block("2024-01-16T09:52:00Z", "2024-01-16T10:52:00Z");
        b1.owner_id = "known".to_string();
        let mut b2 = block("2024-01-16T09:54:00Z", "2024-01-16T10:54:00Z");
        b2.owner_id = "unknown".to_string();
        let store = MemStore::with(vec![b1.clone(), b2]);
        let sends = Arc::new(AtomicUsize::new(0));

        struct OneKnown;
        impl IdentityProvider for OneKnown {
            fn email_for_owner(&self, owner_id: &str) -> Result<Option<String>, IdentityError> {
                Ok((owner_id == "known").then(|| "k@example.com".to_string()))
            }
        }

        let d = Dispatcher::new(
            store.clone(),
            Arc::new(OneKnown),
            vec![MockProvider::ok("resend", sends.clone())],
            &NotifyConfig::default(),
        );
        let report = d.dispatch(t(NOW)).await.unwrap();

        assert_eq!(report.attempted, 2);
        assert_eq!(report.sent, 1);
        assert_eq!(report.failures.len(), 1);
        assert!(store.notified(&b1.id));
    }
}
