use crate::core::analytics::PortfolioValuation;
use crate::core::portfolio::PortfolioEngine;
use crate::core::refresh::LatestValuation;
use std::sync::Arc;

/// Shared state for all handlers
pub struct AppState {
    pub engine: Arc<PortfolioEngine>,
    // Absent when no scheduler runs, e.g. an empty holding list
    pub latest: Option<LatestValuation>,
}

impl AppState {
    pub fn new(engine: Arc<PortfolioEngine>, latest: Option<LatestValuation>) -> Arc<Self> {
        Arc::new(Self { engine, latest })
    }

    /// Valuation published by the last scheduled cycle, if there is one.
    pub fn latest_valuation(&self) -> Option<Arc<PortfolioValuation>> {
        self.latest.as_ref().and_then(|rx| rx.borrow().clone())
    }
}
