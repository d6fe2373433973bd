//! Report command - financial-year CGT summary

use crate::cmd::{format_aud, load_store, settle_sells, StrategyArg};
use crate::matching::Strategy;
use crate::store::ParcelStore;
use crate::tax::summary::{fy_summary, FySummary};
use crate::tax::year::FinancialYear;
use clap::Args;
use std::collections::BTreeSet;
use std::path::PathBuf;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};

#[derive(Args, Debug)]
pub struct ReportCommand {
    /// Trades CSV file (SelfWealth export or canonical columns)
    #[arg(short, long)]
    file: PathBuf,

    /// Financial year to report (e.g. 2025 for FY2024-25); all years if omitted
    #[arg(short, long)]
    year: Option<i32>,

    /// Parcel selection strategy for the sells
    #[arg(short, long, value_enum, default_value_t = StrategyArg::EarliestFirst)]
    strategy: StrategyArg,

    /// Output as JSON instead of formatted tables
    #[arg(long)]
    json: bool,
}

impl ReportCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let (store, _) = load_store(&self.file)?;
        let strategy = Strategy::from(self.strategy);
        settle_sells(&store, &strategy);

        let details = store.allocation_details();
        let years: Vec<FinancialYear> = match self.year {
            Some(year) => vec![FinancialYear(year)],
            None => details
                .iter()
                .map(|d| FinancialYear::from_date(d.sell_date))
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect(),
        };

        let summaries: Vec<FySummary> = years
            .iter()
            .map(|&year| fy_summary(year, &details))
            .collect();

        if self.json {
            println!("{}", serde_json::to_string_pretty(&summaries)?);
            return Ok(());
        }

        if summaries.is_empty() {
            println!("No committed allocations to report");
            return Ok(());
        }

        for summary in &summaries {
            self.print_summary(summary);
        }
        Ok(())
    }

    fn print_summary(&self, summary: &FySummary) {
        println!();
        println!(
            "CGT SUMMARY {} ({} to {})",
            summary.label,
            FinancialYear(summary.year).start_date(),
            FinancialYear(summary.year).end_date()
        );
        println!();

        let totals = vec![TotalsRow {
            allocations: summary.allocation_count,
            gains: format_aud(summary.gains),
            losses: format_aud(summary.losses),
            discounts: format_aud(summary.discounts),
            net_gain: format_aud(summary.net_gain),
        }];
        let table = Table::new(totals)
            .with(Style::rounded())
            .with(Modify::new(Rows::new(1..)).with(Alignment::right()))
            .to_string();
        println!("{}", table);

        if summary.per_security.is_empty() {
            return;
        }
        let rows: Vec<SecurityRow> = summary
            .per_security
            .iter()
            .map(|s| SecurityRow {
                ticker: s.ticker.clone(),
                allocations: s.allocation_count,
                gains: format_aud(s.gains),
                losses: format_aud(s.losses),
                discounts: format_aud(s.discounts),
                net_gain: format_aud(s.net_gain),
            })
            .collect();
        println!();
        let table = Table::new(rows)
            .with(Style::rounded())
            .with(Modify::new(Rows::new(1..)).with(Alignment::right()))
            .to_string();
        println!("{}", table);
    }
}

#[derive(Debug, Clone, Tabled)]
struct TotalsRow {
    #[tabled(rename = "Allocations")]
    allocations: usize,
    #[tabled(rename = "Gains")]
    gains: String,
    #[tabled(rename = "Losses")]
    losses: String,
    #[tabled(rename = "Discounts")]
    discounts: String,
    #[tabled(rename = "Net Gain")]
    net_gain: String,
}

#[derive(Debug, Clone, Tabled)]
struct SecurityRow {
    #[tabled(rename = "Ticker")]
    ticker: String,
    #[tabled(rename = "Allocations")]
    allocations: usize,
    #[tabled(rename = "Gains")]
    gains: String,
    #[tabled(rename = "Losses")]
    losses: String,
    #[tabled(rename = "Discounts")]
    discounts: String,
    #[tabled(rename = "Net Gain")]
    net_gain: String,
}
