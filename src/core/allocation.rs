//! Groups valued holdings into sector roll-ups.
use crate::core::analytics::{EnrichedHolding, percent_of};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;

/// Roll-up of every holding that shares a sector label.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectorSummary {
    pub sector: String,
    pub total_investment: Decimal,
    pub total_present_value: Decimal,
    pub total_gain_loss: Decimal,
    pub gain_loss_percent: Decimal,
    pub portfolio_percent: Decimal,
    pub stocks: Vec<EnrichedHolding>,
}

/// Groups holdings by exact sector string and totals each group.
///
/// Labels are not normalized, so `"IT"` and `"it "` are separate sectors.
/// Output is sorted by descending total investment; equal totals keep the
/// order in which their sector first appeared.
pub fn summarize_by_sector(
    stocks: &[EnrichedHolding],
    portfolio_investment: Decimal,
) -> Vec<SectorSummary> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<(&str, Vec<&EnrichedHolding>)> = Vec::new();

    for stock in stocks {
        let sector = stock.holding.sector.as_str();
        let slot = *index.entry(sector).or_insert_with(|| {
            groups.push((sector, Vec::new()));
            groups.len() - 1
        });
        groups[slot].1.push(stock);
    }

    let mut summaries: Vec<SectorSummary> = groups
        .into_iter()
        .map(|(sector, members)| {
            let total_investment: Decimal = members.iter().map(|s| s.investment).sum();
            let total_present_value: Decimal = members.iter().map(|s| s.present_value).sum();
            let total_gain_loss = total_present_value - total_investment;
            SectorSummary {
                sector: sector.to_string(),
                total_investment,
                total_present_value,
                total_gain_loss,
                gain_loss_percent: percent_of(total_gain_loss, total_investment),
                portfolio_percent: percent_of(total_investment, portfolio_investment),
                stocks: members.into_iter().cloned().collect(),
            }
        })
        .collect();

    summaries.sort_by(|a, b| b.total_investment.cmp(&a.total_investment));
    summaries
}
