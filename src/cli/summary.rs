use super::ui;
use crate::core::analytics::PortfolioValuation;
use crate::core::portfolio::PortfolioEngine;
use anyhow::Result;
use comfy_table::Cell;

impl PortfolioValuation {
    pub fn display_as_table(&self) -> String {
        let mut table = ui::new_styled_table();

        table.set_header(vec![
            ui::header_cell("Particulars"),
            ui::header_cell("Exchange"),
            ui::header_cell("Qty"),
            ui::header_cell("Purchase"),
            ui::header_cell("CMP"),
            ui::header_cell("Investment"),
            ui::header_cell("Present Value"),
            ui::header_cell("Gain/Loss"),
            ui::header_cell("Weight (%)"),
            ui::header_cell("P/E"),
        ]);

        for stock in &self.stocks {
            let has_error = stock.error.is_some();
            let name = match &stock.long_name {
                Some(name) if stock.stale => format!("{name} (stale)"),
                Some(name) => name.clone(),
                None => stock.holding.particulars.clone(),
            };

            let cmp = match stock.cmp {
                Some(cmp) => ui::amount_cell(cmp),
                None => ui::na_cell(has_error),
            };
            let gain_loss = match stock.gain_loss {
                Some(gain_loss) => ui::gain_loss_cell(gain_loss, ""),
                None => ui::na_cell(has_error),
            };

            table.add_row(vec![
                Cell::new(name),
                Cell::new(&stock.holding.exchange),
                ui::amount_cell(stock.holding.quantity),
                ui::amount_cell(stock.holding.purchase_price),
                cmp,
                ui::amount_cell(stock.investment),
                ui::amount_cell(stock.present_value),
                gain_loss,
                ui::amount_cell(stock.portfolio_percent),
                ui::format_optional_cell(stock.pe_ratio, |pe| format!("{pe:.2}")),
            ]);
        }

        let mut output = format!(
            "{}\n\n",
            ui::style_text("Holdings", ui::StyleType::Title)
        );
        output.push_str(&table.to_string());

        for stock in self.stocks.iter().filter(|s| s.error.is_some()) {
            output.push_str(&format!(
                "\n{} {}",
                ui::style_text(&stock.holding.key().to_string(), ui::StyleType::Error),
                ui::style_text(stock.error.as_deref().unwrap_or_default(), ui::StyleType::Subtle)
            ));
        }
        output
    }

    pub fn display_sectors_as_table(&self) -> String {
        let mut table = ui::new_styled_table();

        table.set_header(vec![
            ui::header_cell("Sector"),
            ui::header_cell("Holdings"),
            ui::header_cell("Investment"),
            ui::header_cell("Present Value"),
            ui::header_cell("Gain/Loss"),
            ui::header_cell("Gain/Loss (%)"),
            ui::header_cell("Weight (%)"),
        ]);

        for sector in &self.sectors {
            table.add_row(vec![
                Cell::new(&sector.sector),
                Cell::new(sector.stocks.len()),
                ui::amount_cell(sector.total_investment),
                ui::amount_cell(sector.total_present_value),
                ui::gain_loss_cell(sector.total_gain_loss, ""),
                ui::gain_loss_cell(sector.gain_loss_percent, "%"),
                ui::amount_cell(sector.portfolio_percent),
            ]);
        }

        let total_style_type = if self.failed == 0 {
            ui::StyleType::TotalValue
        } else {
            ui::StyleType::Error
        };

        let mut output = format!(
            "{}\n\n",
            ui::style_text("Sectors", ui::StyleType::Title)
        );
        output.push_str(&table.to_string());
        output.push_str(&format!(
            "\n\n{} {:.2}\n{} {}\n{} {:.2} ({:.2}%)\n{}",
            ui::style_text("Total Investment:", ui::StyleType::TotalLabel),
            self.total_investment,
            ui::style_text("Total Present Value:", ui::StyleType::TotalLabel),
            ui::style_text(&format!("{:.2}", self.total_present_value), total_style_type),
            ui::style_text("Total Gain/Loss:", ui::StyleType::TotalLabel),
            self.total_gain_loss,
            self.total_gain_loss_percent,
            ui::style_text(
                &format!(
                    "{} of {} holdings priced at {}",
                    self.successful,
                    self.stocks.len(),
                    self.refreshed_at.format("%Y-%m-%d %H:%M:%S UTC")
                ),
                ui::StyleType::Subtle
            ),
        ));
        output
    }
}

/// Runs one valuation cycle and prints the holdings and sector tables.
pub async fn run(engine: &PortfolioEngine) -> Result<()> {
    let pb = ui::new_progress_bar(engine.holdings().len() as u64, true);
    pb.set_message("Fetching prices...");

    let valuation = engine.run_cycle_with_progress(&|| pb.inc(1)).await;
    pb.finish_and_clear();

    println!("{}", valuation.display_as_table());
    ui::print_separator();
    println!("{}", valuation.display_sectors_as_table());
    Ok(())
}
