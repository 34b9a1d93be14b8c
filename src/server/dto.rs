use crate::core::analytics::PortfolioValuation;
use crate::core::fetcher::BatchItem;
use crate::core::holding::Holding;
use crate::core::price::Snapshot;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Deserialize)]
pub struct StockRequest {
    pub symbol: String,
    pub exchange: String,
}

#[derive(Debug, Serialize)]
pub struct HoldingsResponse {
    pub success: bool,
    pub data: Vec<Holding>,
    pub total: usize,
}

/// One entry of a batch price response: the snapshot, or why it is missing.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum PriceEntry {
    Found(Snapshot),
    Failed {
        error: String,
        symbol: String,
        exchange: String,
    },
}

impl From<BatchItem> for PriceEntry {
    fn from(item: BatchItem) -> Self {
        match item.result {
            Ok(snapshot) => PriceEntry::Found(snapshot),
            Err(e) => PriceEntry::Failed {
                error: e.to_string(),
                symbol: item.key.symbol,
                exchange: item.key.exchange,
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PricesResponse {
    pub success: bool,
    pub data: BTreeMap<String, PriceEntry>,
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct SnapshotResponse {
    pub success: bool,
    pub data: Snapshot,
}

#[derive(Debug, Serialize)]
pub struct ValuationResponse {
    pub success: bool,
    pub data: PortfolioValuation,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct NotFoundResponse {
    pub success: bool,
    pub error: &'static str,
    pub path: String,
}
