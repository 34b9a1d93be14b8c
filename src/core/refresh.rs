//! Background refresh of the portfolio valuation on a fixed interval.

use crate::core::analytics::PortfolioValuation;
use crate::core::portfolio::PortfolioEngine;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, warn};

pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(15);

pub type LatestValuation = watch::Receiver<Option<Arc<PortfolioValuation>>>;

pub struct RefreshScheduler {
    engine: Arc<PortfolioEngine>,
    interval: Duration,
}

impl RefreshScheduler {
    pub fn new(engine: Arc<PortfolioEngine>) -> Self {
        Self {
            engine,
            interval: DEFAULT_REFRESH_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Spawns the refresh loop. The first cycle runs immediately.
    ///
    /// Returns `None` when there is nothing to value. Ticks that arrive while
    /// a cycle is still running are dropped rather than queued.
    pub fn start(self) -> Option<RefreshHandle> {
        if self.engine.holdings().is_empty() {
            info!("No holdings configured, refresh scheduler not started");
            return None;
        }

        let (latest_tx, latest_rx) = watch::channel(None);
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let engine = self.engine;
        let period = self.interval;

        let task = tokio::spawn(async move {
            info!(interval_secs = period.as_secs(), "Refresh scheduler started");
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => break,
                    _ = ticker.tick() => {}
                }

                match engine.try_run_cycle().await {
                    Some(valuation) => {
                        latest_tx.send_replace(Some(Arc::new(valuation)));
                    }
                    None => debug!("Scheduled refresh skipped, a cycle is already running"),
                }
            }
            info!("Refresh scheduler stopped");
        });

        Some(RefreshHandle {
            latest: latest_rx,
            shutdown: shutdown_tx,
            task,
        })
    }
}

/// Owner of a running refresh loop. Dropping it also ends the loop after the
/// current cycle.
pub struct RefreshHandle {
    latest: LatestValuation,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl RefreshHandle {
    /// Most recently published valuation, if any cycle has completed.
    pub fn latest(&self) -> Option<Arc<PortfolioValuation>> {
        self.latest.borrow().clone()
    }

    pub fn subscribe(&self) -> LatestValuation {
        self.latest.clone()
    }

    /// Signals the loop to exit and waits for an in-flight cycle to drain.
    pub async fn stop(self) {
        self.shutdown.send_replace(true);
        if let Err(e) = self.task.await {
            warn!(error = %e, "Refresh task ended abnormally");
        }
    }
}
