//! Periodic removal of expired refresh credentials.
//!
//! The sweeper runs for the life of the process. Each cycle it probes the
//! store first with a bounded timeout; a slow or failing probe skips the
//! cycle instead of stalling the interval, and the next tick retries. A
//! failed cleanup is logged and never escalates: the sweep is hygiene, not
//! correctness -- expired credentials are also rejected at refresh time.

use std::sync::Arc;
use std::time::Duration;

use planeja_types::credential::CleanupReport;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::auth::store::CredentialStore;

pub struct ExpirySweeper<C: CredentialStore> {
    store: Arc<C>,
    interval: Duration,
    probe_timeout: Duration,
}

impl<C: CredentialStore> ExpirySweeper<C> {
    pub fn new(store: Arc<C>, interval: Duration, probe_timeout: Duration) -> Self {
        Self {
            store,
            interval,
            probe_timeout,
        }
    }

    /// Sweep loop. The first cycle runs immediately, then every `interval`
    /// until the token is cancelled.
    pub async fn run(self, shutdown: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        info!(interval_secs = self.interval.as_secs(), "expiry sweeper started");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    debug!("expiry sweeper stopping");
                    break;
                }
                _ = ticker.tick() => {
                    self.run_once().await;
                }
            }
        }
    }

    /// One sweep cycle: bounded probe, then cleanup. Returns the report
    /// when a cleanup actually ran.
    pub async fn run_once(&self) -> Option<CleanupReport> {
        match tokio::time::timeout(self.probe_timeout, self.store.probe()).await {
            Err(_) => {
                warn!(
                    timeout_secs = self.probe_timeout.as_secs(),
                    "credential store probe timed out, skipping sweep cycle"
                );
                return None;
            }
            Ok(Err(err)) => {
                warn!(error = %err, "credential store probe failed, skipping sweep cycle");
                return None;
            }
            Ok(Ok(())) => {}
        }

        match self.store.cleanup_expired().await {
            Ok(report) => {
                if report.removed > 0 {
                    info!(removed = report.removed, backend = %report.backend, "expired credentials removed");
                } else {
                    debug!(backend = %report.backend, "no expired credentials");
                }
                Some(report)
            }
            Err(err) => {
                warn!(error = %err, "credential cleanup failed");
                None
            }
        }
    }
}
