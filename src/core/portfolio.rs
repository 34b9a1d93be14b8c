//! Runs full valuation cycles over the configured holdings.
use crate::core::analytics::{PortfolioValuation, valuate};
use crate::core::cache::Clock;
use crate::core::fetcher::BatchFetcher;
use crate::core::holding::{Holding, HoldingKey};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Owns the static holdings and runs enrichment and aggregation cycles.
///
/// Cycles are serialized: the cycle lock is held for the whole fetch and
/// valuation, so two cycles never write the same cache keys concurrently.
pub struct PortfolioEngine {
    holdings: Vec<Holding>,
    fetcher: Arc<BatchFetcher>,
    clock: Arc<dyn Clock>,
    cycle: Mutex<()>,
}

impl PortfolioEngine {
    pub fn new(holdings: Vec<Holding>, fetcher: Arc<BatchFetcher>, clock: Arc<dyn Clock>) -> Self {
        Self {
            holdings,
            fetcher,
            clock,
            cycle: Mutex::new(()),
        }
    }

    pub fn holdings(&self) -> &[Holding] {
        &self.holdings
    }

    pub fn fetcher(&self) -> &BatchFetcher {
        &self.fetcher
    }

    /// Runs one cycle, waiting for any cycle already in flight to finish first.
    pub async fn run_cycle(&self) -> PortfolioValuation {
        let _guard = self.cycle.lock().await;
        self.cycle_locked(&|| {}).await
    }

    /// Like [`run_cycle`](Self::run_cycle) but reports each settled lookup.
    pub async fn run_cycle_with_progress(
        &self,
        on_settled: &(dyn Fn() + Send + Sync),
    ) -> PortfolioValuation {
        let _guard = self.cycle.lock().await;
        self.cycle_locked(on_settled).await
    }

    /// Runs one cycle unless another is in flight, in which case `None`.
    pub async fn try_run_cycle(&self) -> Option<PortfolioValuation> {
        let Ok(_guard) = self.cycle.try_lock() else {
            debug!("Cycle already in flight, skipping");
            return None;
        };
        Some(self.cycle_locked(&|| {}).await)
    }

    async fn cycle_locked(&self, on_settled: &(dyn Fn() + Send + Sync)) -> PortfolioValuation {
        let keys: Vec<HoldingKey> = self.holdings.iter().map(Holding::key).collect();
        let outcome = self.fetcher.fetch_all_with_progress(&keys, on_settled).await;
        let valuation = valuate(&self.holdings, &outcome, self.clock.now());
        info!(
            holdings = valuation.stocks.len(),
            successful = valuation.successful,
            failed = valuation.failed,
            "Portfolio cycle complete"
        );
        valuation
    }
}
