use std::sync::Arc;

use chrono::Utc;
use tokio::sync::watch;
use tracing::{error, info};

use crate::dispatch::Dispatcher;

/// Drives a dispatch run on a fixed cadence until shutdown.
///
/// The dispatcher is shared (`Arc`) so the manual `/api/dispatch` trigger
/// and the engine use the same instance; the store's conditional update
/// keeps their overlapping runs safe.
pub struct NotifierEngine {
    dispatcher: Arc<Dispatcher>,
    interval: std::time::Duration,
}

impl NotifierEngine {
    pub fn new(dispatcher: Arc<Dispatcher>, interval_secs: u64) -> Self {
        Self {
            dispatcher,
            interval: std::time::Duration::from_secs(interval_secs),
        }
    }

    /// Main loop. Ticks until `shutdown` broadcasts `true`.
    ///
    /// A failed run (store unreachable) is logged and the loop keeps going;
    /// the next tick retries from scratch.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(interval_secs = self.interval.as_secs(), "notifier engine started");

        let mut interval = tokio::time::interval(self.interval);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match self.dispatcher.dispatch(Utc::now()).await {
                        Ok(report) if report.attempted > 0 => {
                            info!(
                                attempted = report.attempted,
                                sent = report.sent,
                                already_handled = report.already_handled,
                                failed = report.failures.len(),
                                "dispatch run complete"
                            );
                        }
                        Ok(_) => {} // nothing due; stay quiet
                        Err(e) => error!("dispatch run failed: {e}"),
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("notifier engine shutting down");
                        break;
                    }
                }
            }
        }
    }
}
