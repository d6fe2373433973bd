//! Match command - allocate and commit every sell against the parcel inventory

use crate::cmd::{format_aud, format_quantity, load_store, settle_sells, StrategyArg};
use crate::core::parcel::Allocation;
use crate::matching::Strategy;
use crate::store::memory::MemoryStore;
use crate::store::ParcelStore;
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};

#[derive(Args, Debug)]
pub struct MatchCommand {
    /// Trades CSV file (SelfWealth export or canonical columns)
    #[arg(short, long)]
    file: PathBuf,

    /// Parcel selection strategy for the sells
    #[arg(short, long, value_enum, default_value_t = StrategyArg::EarliestFirst)]
    strategy: StrategyArg,

    /// Output as JSON instead of formatted table
    #[arg(long)]
    json: bool,
}

impl MatchCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let (store, _) = load_store(&self.file)?;
        let strategy = Strategy::from(self.strategy);
        let results = settle_sells(&store, &strategy);

        let mut rows = Vec::new();
        let mut failures = Vec::new();
        for (sell, outcome) in &results {
            let ticker = store
                .security(sell.security_id)
                .map(|s| s.ticker)
                .unwrap_or_default();
            match outcome {
                Ok(allocations) => {
                    for allocation in allocations {
                        rows.push(match_row(&store, &ticker, sell.trade_date, allocation));
                    }
                }
                Err(err) => failures.push(FailureView {
                    sell_date: sell.trade_date.to_string(),
                    ticker,
                    quantity: format_quantity(sell.quantity),
                    reason: err.to_string(),
                }),
            }
        }

        if self.json {
            let view = MatchOutput {
                strategy: strategy.name().to_string(),
                allocations: store.allocation_details(),
                unmatched: failures,
            };
            println!("{}", serde_json::to_string_pretty(&view)?);
            return Ok(());
        }

        println!();
        println!("PARCEL MATCHES ({})", strategy.name());
        println!();
        if rows.is_empty() {
            println!("No sells matched");
        } else {
            let table = Table::new(rows)
                .with(Style::rounded())
                .with(Modify::new(Rows::new(1..)).with(Alignment::right()))
                .to_string();
            println!("{}", table);
        }

        if !failures.is_empty() {
            println!();
            println!("UNMATCHED SELLS");
            for failure in &failures {
                println!(
                    "  {} {} x{}: {}",
                    failure.sell_date, failure.ticker, failure.quantity, failure.reason
                );
            }
        }
        Ok(())
    }
}

fn match_row(
    store: &MemoryStore,
    ticker: &str,
    sell_date: chrono::NaiveDate,
    allocation: &Allocation,
) -> MatchRow {
    let acquired = store
        .parcel(allocation.parcel_id)
        .map(|p| p.acquisition_date.to_string())
        .unwrap_or_default();
    MatchRow {
        sell_date: sell_date.to_string(),
        ticker: ticker.to_string(),
        acquired,
        quantity: format_quantity(allocation.matched_quantity),
        cost_base: format_aud(allocation.cost_base),
        proceeds: format_aud(allocation.proceeds),
        gain_loss: format_aud(allocation.gain_loss),
        days: allocation.holding_days.to_string(),
        discount: format_aud(allocation.discount_amount),
        net_gain: format_aud(allocation.net_gain),
    }
}

#[derive(Debug, Clone, Tabled)]
struct MatchRow {
    #[tabled(rename = "Sell Date")]
    sell_date: String,
    #[tabled(rename = "Ticker")]
    ticker: String,
    #[tabled(rename = "Acquired")]
    acquired: String,
    #[tabled(rename = "Quantity")]
    quantity: String,
    #[tabled(rename = "Cost Base")]
    cost_base: String,
    #[tabled(rename = "Proceeds")]
    proceeds: String,
    #[tabled(rename = "Gain/Loss")]
    gain_loss: String,
    #[tabled(rename = "Days")]
    days: String,
    #[tabled(rename = "Discount")]
    discount: String,
    #[tabled(rename = "Net Gain")]
    net_gain: String,
}

#[derive(Debug, Serialize)]
struct FailureView {
    sell_date: String,
    ticker: String,
    quantity: String,
    reason: String,
}

#[derive(Debug, Serialize)]
struct MatchOutput {
    strategy: String,
    allocations: Vec<crate::store::AllocationDetail>,
    unmatched: Vec<FailureView>,
}
