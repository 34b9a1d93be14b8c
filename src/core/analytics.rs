//! Provides functions for valuing holdings against their latest market data.
use crate::core::allocation::{SectorSummary, summarize_by_sector};
use crate::core::error::FetchError;
use crate::core::fetcher::BatchOutcome;
use crate::core::holding::Holding;
use crate::core::price::Snapshot;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::debug;

/// A holding together with its derived market metrics for one cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedHolding {
    #[serde(flatten)]
    pub holding: Holding,
    pub long_name: Option<String>,
    /// `None` when the holding could not be priced.
    pub cmp: Option<Decimal>,
    pub investment: Decimal,
    pub present_value: Decimal,
    pub gain_loss: Option<Decimal>,
    pub gain_loss_percent: Option<Decimal>,
    pub portfolio_percent: Decimal,
    pub pe_ratio: Option<Decimal>,
    pub yearly_earnings: Option<Decimal>,
    pub stale: bool,
    pub error: Option<String>,
}

impl EnrichedHolding {
    pub fn is_priced(&self) -> bool {
        self.cmp.is_some()
    }
}

/// Result of one full enrichment and aggregation cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioValuation {
    pub stocks: Vec<EnrichedHolding>,
    pub sectors: Vec<SectorSummary>,
    pub total_investment: Decimal,
    pub total_present_value: Decimal,
    pub total_gain_loss: Decimal,
    pub total_gain_loss_percent: Decimal,
    pub successful: usize,
    pub failed: usize,
    pub refreshed_at: DateTime<Utc>,
}

/// `part / whole * 100`, or zero when `whole` is not positive.
pub fn percent_of(part: Decimal, whole: Decimal) -> Decimal {
    if whole > Decimal::ZERO {
        part / whole * Decimal::ONE_HUNDRED
    } else {
        Decimal::ZERO
    }
}

/// Values a single holding. `portfolio_percent` is left at zero; it needs the
/// batch total and is filled in by [`apply_portfolio_weights`].
pub fn value_holding(holding: &Holding, price: Result<&Snapshot, &FetchError>) -> EnrichedHolding {
    let investment = holding.investment();

    match price {
        Ok(snapshot) => {
            let present_value = snapshot.cmp * holding.quantity;
            let gain_loss = present_value - investment;
            EnrichedHolding {
                holding: holding.clone(),
                long_name: snapshot.long_name.clone(),
                cmp: Some(snapshot.cmp),
                investment,
                present_value,
                gain_loss: Some(gain_loss),
                gain_loss_percent: Some(percent_of(gain_loss, investment)),
                portfolio_percent: Decimal::ZERO,
                pe_ratio: snapshot.pe_ratio,
                yearly_earnings: snapshot.yearly_earnings,
                stale: snapshot.stale,
                error: None,
            }
        }
        Err(e) => {
            debug!("Price fetch error for {}: {}", holding.key(), e);
            EnrichedHolding {
                holding: holding.clone(),
                long_name: None,
                cmp: None,
                investment,
                present_value: Decimal::ZERO,
                gain_loss: None,
                gain_loss_percent: None,
                portfolio_percent: Decimal::ZERO,
                pe_ratio: None,
                yearly_earnings: None,
                stale: false,
                error: Some(e.to_string()),
            }
        }
    }
}

/// Second pass: weights every holding by its share of total investment and
/// returns that total.
pub fn apply_portfolio_weights(stocks: &mut [EnrichedHolding]) -> Decimal {
    let total_investment: Decimal = stocks.iter().map(|s| s.investment).sum();
    for stock in stocks.iter_mut() {
        stock.portfolio_percent = percent_of(stock.investment, total_investment);
    }
    total_investment
}

/// Builds the full valuation from the holdings and the batch that priced them.
///
/// `outcome` must be the result of fetching `holdings` in order, so that item
/// `i` belongs to holding `i`. A holding without a matching item is treated
/// as unpriced.
pub fn valuate(
    holdings: &[Holding],
    outcome: &BatchOutcome,
    refreshed_at: DateTime<Utc>,
) -> PortfolioValuation {
    let missing = FetchError::NotFound("no lookup result".to_string());
    let mut stocks: Vec<EnrichedHolding> = holdings
        .iter()
        .enumerate()
        .map(|(i, holding)| {
            let price = match outcome.items.get(i) {
                Some(item) if item.key == holding.key() => item.result.as_ref(),
                _ => Err(&missing),
            };
            value_holding(holding, price)
        })
        .collect();

    let total_investment = apply_portfolio_weights(&mut stocks);
    let total_present_value: Decimal = stocks.iter().map(|s| s.present_value).sum();
    let total_gain_loss = total_present_value - total_investment;
    let successful = stocks.iter().filter(|s| s.is_priced()).count();

    PortfolioValuation {
        sectors: summarize_by_sector(&stocks, total_investment),
        failed: stocks.len() - successful,
        successful,
        total_investment,
        total_present_value,
        total_gain_loss,
        total_gain_loss_percent: percent_of(total_gain_loss, total_investment),
        refreshed_at,
        stocks,
    }
}
