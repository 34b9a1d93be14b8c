use super::ui;
use crate::core::fetcher::BatchFetcher;
use crate::core::holding::HoldingKey;
use crate::core::price::Snapshot;
use anyhow::{Context, Result};
use comfy_table::Cell;

impl Snapshot {
    pub fn display_as_table(&self) -> String {
        let mut table = ui::new_styled_table();
        table.set_header(vec![ui::header_cell("Field"), ui::header_cell("Value")]);

        let amount = |v: rust_decimal::Decimal| format!("{v:.2}");
        let rows = vec![
            ("CMP", ui::amount_cell(self.cmp)),
            ("Change", ui::gain_loss_cell(self.change, "")),
            ("Change (%)", ui::gain_loss_cell(self.change_percent, "%")),
            ("Previous Close", ui::format_optional_cell(self.previous_close, amount)),
            ("Open", ui::format_optional_cell(self.open, amount)),
            ("Day High", ui::format_optional_cell(self.day_high, amount)),
            ("Day Low", ui::format_optional_cell(self.day_low, amount)),
            ("P/E", ui::format_optional_cell(self.pe_ratio, amount)),
            ("Year", ui::format_optional_cell(self.earnings_year, |y| y.to_string())),
            ("Revenue", ui::format_optional_cell(self.yearly_revenue, amount)),
            ("Earnings", ui::format_optional_cell(self.yearly_earnings, amount)),
        ];
        for (label, value) in rows {
            table.add_row(vec![Cell::new(label), value]);
        }

        let title = match &self.long_name {
            Some(name) => format!("{name} ({})", self.symbol),
            None => self.symbol.clone(),
        };
        let mut output = format!("{}\n\n", ui::style_text(&title, ui::StyleType::Title));
        output.push_str(&table.to_string());
        output.push_str(&format!(
            "\n\n{}",
            ui::style_text(
                &format!(
                    "Fetched at {}{}",
                    self.fetched_at.format("%Y-%m-%d %H:%M:%S UTC"),
                    if self.stale { " (stale)" } else { "" }
                ),
                ui::StyleType::Subtle
            )
        ));
        output
    }
}

/// Fetches and prints a single snapshot.
pub async fn run(fetcher: &BatchFetcher, symbol: &str, exchange: &str) -> Result<()> {
    let key = HoldingKey::new(symbol, exchange);
    let snapshot = fetcher
        .fetch_one(&key)
        .await
        .with_context(|| format!("Failed to fetch quote for {key}"))?;
    println!("{}", snapshot.display_as_table());
    Ok(())
}
