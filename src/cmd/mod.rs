pub mod forecast;
pub mod import;
pub mod matching;
pub mod report;

use crate::core::parcel::Allocation;
use crate::core::transaction::Transaction;
use crate::import::{
    canonical_mapping, detect_selfwealth, import_trades, selfwealth_mapping, ImportOutcome,
    SourceKind,
};
use crate::matching::{allocate, AllocationError, Strategy};
use crate::store::memory::MemoryStore;
use crate::store::ParcelStore;
use anyhow::Context;
use clap::ValueEnum;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Auto strategies selectable from the command line.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum StrategyArg {
    #[default]
    EarliestFirst,
    LatestFirst,
    HighestCostFirst,
}

impl From<StrategyArg> for Strategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::EarliestFirst => Strategy::EarliestFirst,
            StrategyArg::LatestFirst => Strategy::LatestFirst,
            StrategyArg::HighestCostFirst => Strategy::HighestCostFirst,
        }
    }
}

/// Work out the column mapping for a trades file: SelfWealth exports are
/// recognised by their headers, anything else is expected to use the
/// canonical column names.
pub fn detect_mapping(content: &str) -> anyhow::Result<(HashMap<String, String>, SourceKind)> {
    let mut reader = csv::Reader::from_reader(content.as_bytes());
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(String::from)
        .collect();

    if detect_selfwealth(&headers) {
        Ok((selfwealth_mapping(), SourceKind::SelfWealth))
    } else {
        Ok((canonical_mapping(), SourceKind::Generic))
    }
}

/// Read a trades CSV and load it into a fresh store.
pub fn load_store(path: &Path) -> anyhow::Result<(MemoryStore, ImportOutcome)> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading trades file {}", path.display()))?;
    let (mapping, source) = detect_mapping(&content)?;

    let store = MemoryStore::new();
    let outcome = import_trades(&store, &content, &mapping, source)
        .with_context(|| format!("importing {}", path.display()))?;
    Ok((store, outcome))
}

/// Allocate and commit every recorded sell in trade-date order. A sell
/// that cannot be satisfied is reported, not fatal.
pub fn settle_sells(
    store: &MemoryStore,
    strategy: &Strategy,
) -> Vec<(Transaction, Result<Vec<Allocation>, AllocationError>)> {
    store
        .sell_transactions()
        .into_iter()
        .map(|sell| {
            let outcome = allocate(store, &sell, strategy).and_then(|p| store.commit(&p));
            if let Err(err) = &outcome {
                log::warn!("sell {} not matched: {}", sell.id, err);
            }
            (sell, outcome)
        })
        .collect()
}

pub fn format_aud(amount: Decimal) -> String {
    format!("${:.2}", amount)
}

pub fn format_quantity(qty: Decimal) -> String {
    let s = format!("{:.8}", qty);
    let trimmed = s.trim_end_matches('0').trim_end_matches('.');
    trimmed.to_string()
}
