//! Forecast command - what-if CGT comparison for a hypothetical sell

use crate::cmd::{format_aud, format_quantity, load_store, settle_sells};
use crate::forecast::{forecast, StrategyForecast};
use crate::matching::Strategy;
use chrono::NaiveDate;
use clap::Args;
use rust_decimal::Decimal;
use std::path::PathBuf;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};

#[derive(Args, Debug)]
pub struct ForecastCommand {
    /// Trades CSV file (SelfWealth export or canonical columns)
    #[arg(short, long)]
    file: PathBuf,

    /// Ticker of the security to sell
    #[arg(short, long)]
    ticker: String,

    /// Units to sell
    #[arg(short, long)]
    quantity: Decimal,

    /// Sell price per unit, in AUD
    #[arg(short, long)]
    price: Decimal,

    /// Hypothetical sell date (defaults to today)
    #[arg(short, long)]
    date: Option<NaiveDate>,

    /// Output as JSON instead of formatted tables
    #[arg(long)]
    json: bool,
}

impl ForecastCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let (store, _) = load_store(&self.file)?;
        // Bring lot state up to date: recorded sells consume parcels first.
        settle_sells(&store, &Strategy::EarliestFirst);

        let security = store
            .security_by_ticker(&self.ticker)
            .ok_or_else(|| anyhow::anyhow!("unknown security: {}", self.ticker))?;
        let sell_date = self
            .date
            .unwrap_or_else(|| chrono::Local::now().date_naive());

        let report = forecast(&store, &security, self.quantity, self.price, sell_date)?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
            return Ok(());
        }

        println!();
        println!(
            "FORECAST {} x{} @ {} on {}",
            report.ticker,
            format_quantity(report.quantity),
            format_aud(report.unit_price),
            report.sell_date
        );

        let comparison = vec![
            comparison_row("earliest-first", &report.earliest_first),
            comparison_row("latest-first", &report.latest_first),
            comparison_row("highest-cost-first", &report.highest_cost_first),
        ];
        println!();
        let table = Table::new(comparison)
            .with(Style::rounded())
            .with(Modify::new(Rows::new(1..)).with(Alignment::right()))
            .to_string();
        println!("{}", table);

        print_strategy("earliest-first", &report.earliest_first);
        print_strategy("latest-first", &report.latest_first);
        print_strategy("highest-cost-first", &report.highest_cost_first);
        Ok(())
    }
}

fn comparison_row(name: &str, outcome: &StrategyForecast) -> ComparisonRow {
    ComparisonRow {
        strategy: name.to_string(),
        cost_base: format_aud(outcome.total_cost_base),
        proceeds: format_aud(outcome.total_proceeds),
        gain_loss: format_aud(outcome.total_gain_loss),
        discount: format_aud(outcome.total_discount),
        net_gain: format_aud(outcome.total_net_gain),
    }
}

fn print_strategy(name: &str, outcome: &StrategyForecast) {
    println!();
    println!("{} parcels", name);
    let rows: Vec<LotRow> = outcome
        .lines
        .iter()
        .map(|line| LotRow {
            acquired: line.acquisition_date.to_string(),
            quantity: format_quantity(line.matched_quantity),
            cost_per_unit: format_aud(line.cost_per_unit),
            cost_base: format_aud(line.cost_base),
            gain_loss: format_aud(line.gain_loss),
            days: line.holding_days.to_string(),
            discounted: if line.discount_eligible { "yes" } else { "no" }.to_string(),
            net_gain: format_aud(line.net_gain),
        })
        .collect();
    let table = Table::new(rows)
        .with(Style::rounded())
        .with(Modify::new(Rows::new(1..)).with(Alignment::right()))
        .to_string();
    println!("{}", table);
}

#[derive(Debug, Clone, Tabled)]
struct ComparisonRow {
    #[tabled(rename = "Strategy")]
    strategy: String,
    #[tabled(rename = "Cost Base")]
    cost_base: String,
    #[tabled(rename = "Proceeds")]
    proceeds: String,
    #[tabled(rename = "Gain/Loss")]
    gain_loss: String,
    #[tabled(rename = "Discount")]
    discount: String,
    #[tabled(rename = "Net Gain")]
    net_gain: String,
}

#[derive(Debug, Clone, Tabled)]
struct LotRow {
    #[tabled(rename = "Acquired")]
    acquired: String,
    #[tabled(rename = "Quantity")]
    quantity: String,
    #[tabled(rename = "Cost/Unit")]
    cost_per_unit: String,
    #[tabled(rename = "Cost Base")]
    cost_base: String,
    #[tabled(rename = "Gain/Loss")]
    gain_loss: String,
    #[tabled(rename = "Days")]
    days: String,
    #[tabled(rename = "Discounted")]
    discounted: String,
    #[tabled(rename = "Net Gain")]
    net_gain: String,
}
