//! Market data abstractions and core types

use crate::core::error::FetchError;
use crate::core::holding::HoldingKey;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Price data class. Short-lived, refreshed on the quote TTL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub symbol: String,
    pub long_name: Option<String>,
    pub cmp: Decimal,
    pub change: Decimal,
    pub change_percent: Decimal,
    pub previous_close: Option<Decimal>,
    pub open: Option<Decimal>,
    pub day_high: Option<Decimal>,
    pub day_low: Option<Decimal>,
}

impl Quote {
    /// Builds a quote whose change figures are derived from the previous close.
    pub fn from_price(symbol: &str, cmp: Decimal, previous_close: Option<Decimal>) -> Self {
        let (change, change_percent) = match previous_close {
            Some(prev) if !prev.is_zero() => {
                let change = cmp - prev;
                (change, change / prev * Decimal::ONE_HUNDRED)
            }
            _ => (Decimal::ZERO, Decimal::ZERO),
        };
        Quote {
            symbol: symbol.to_string(),
            long_name: None,
            cmp,
            change,
            change_percent,
            previous_close,
            open: None,
            day_high: None,
            day_low: None,
        }
    }
}

/// Fundamentals data class. Changes slowly, refreshed on the longer TTL.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fundamentals {
    pub pe_ratio: Option<Decimal>,
    #[serde(alias = "currentYear")]
    pub earnings_year: Option<i32>,
    pub yearly_revenue: Option<Decimal>,
    pub yearly_earnings: Option<Decimal>,
}

/// Point-in-time reading for one holding, merged from both data classes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub symbol: String,
    pub long_name: Option<String>,
    pub cmp: Decimal,
    pub change: Decimal,
    pub change_percent: Decimal,
    pub previous_close: Option<Decimal>,
    pub open: Option<Decimal>,
    pub day_high: Option<Decimal>,
    pub day_low: Option<Decimal>,
    pub pe_ratio: Option<Decimal>,
    #[serde(alias = "currentYear")]
    pub earnings_year: Option<i32>,
    pub yearly_revenue: Option<Decimal>,
    pub yearly_earnings: Option<Decimal>,
    pub fetched_at: DateTime<Utc>,
    /// Set when the price is the last known value served after a failed refetch.
    pub stale: bool,
}

impl Snapshot {
    pub fn new(
        quote: Quote,
        fundamentals: Option<Fundamentals>,
        fetched_at: DateTime<Utc>,
        stale: bool,
    ) -> Self {
        let fundamentals = fundamentals.unwrap_or_default();
        Snapshot {
            symbol: quote.symbol,
            long_name: quote.long_name,
            cmp: quote.cmp,
            change: quote.change,
            change_percent: quote.change_percent,
            previous_close: quote.previous_close,
            open: quote.open,
            day_high: quote.day_high,
            day_low: quote.day_low,
            pe_ratio: fundamentals.pe_ratio,
            earnings_year: fundamentals.earnings_year,
            yearly_revenue: fundamentals.yearly_revenue,
            yearly_earnings: fundamentals.yearly_earnings,
            fetched_at,
            stale,
        }
    }
}

#[async_trait]
pub trait QuoteProvider: Send + Sync {
    async fn fetch_quote(&self, key: &HoldingKey) -> Result<Quote, FetchError>;
}

#[async_trait]
pub trait FundamentalsProvider: Send + Sync {
    async fn fetch_fundamentals(&self, key: &HoldingKey) -> Result<Fundamentals, FetchError>;
}
