//! Import command - parse and validate a trades CSV

use crate::cmd::detect_mapping;
use crate::import::{import_trades, ImportOutcome};
use crate::store::memory::MemoryStore;
use anyhow::Context;
use clap::Args;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};

#[derive(Args, Debug)]
pub struct ImportCommand {
    /// Trades CSV file (SelfWealth export or canonical columns)
    #[arg(short, long)]
    file: PathBuf,

    /// Output as JSON instead of formatted text
    #[arg(long)]
    json: bool,
}

impl ImportCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let content = fs::read_to_string(&self.file)
            .with_context(|| format!("reading trades file {}", self.file.display()))?;
        let (mapping, source) = detect_mapping(&content)?;

        let store = MemoryStore::new();
        let outcome = import_trades(&store, &content, &mapping, source)?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&ImportView::from(&outcome))?);
        } else {
            self.print_summary(&outcome);
        }
        Ok(())
    }

    fn print_summary(&self, outcome: &ImportOutcome) {
        println!();
        println!("IMPORT {} ({})", self.file.display(), outcome.source);
        println!("sha256 {}", outcome.file_hash);
        println!();

        let rows = vec![SummaryRow {
            total: outcome.rows.len(),
            valid: outcome.valid_count(),
            errors: outcome.error_count(),
            duplicates: outcome.duplicate_count(),
            recorded: outcome.inserted,
        }];
        let table = Table::new(rows)
            .with(Style::rounded())
            .with(Modify::new(Rows::new(1..)).with(Alignment::right()))
            .to_string();
        println!("{}", table);

        let bad: Vec<ErrorRow> = outcome
            .rows
            .iter()
            .filter(|r| !r.is_valid())
            .map(|r| ErrorRow {
                row: r.row_number,
                errors: r.errors.join("; "),
            })
            .collect();
        if !bad.is_empty() {
            println!();
            println!("ROWS WITH ERRORS");
            let table = Table::new(bad).with(Style::rounded()).to_string();
            println!("{}", table);
        }
    }
}

#[derive(Debug, Clone, Tabled)]
struct SummaryRow {
    #[tabled(rename = "Rows")]
    total: usize,
    #[tabled(rename = "Valid")]
    valid: usize,
    #[tabled(rename = "Errors")]
    errors: usize,
    #[tabled(rename = "Duplicates")]
    duplicates: usize,
    #[tabled(rename = "Recorded")]
    recorded: usize,
}

#[derive(Debug, Clone, Tabled)]
struct ErrorRow {
    #[tabled(rename = "Row")]
    row: usize,
    #[tabled(rename = "Errors")]
    errors: String,
}

#[derive(Debug, Serialize)]
struct ImportView {
    file_hash: String,
    source: String,
    total_rows: usize,
    valid: usize,
    errors: usize,
    duplicates: usize,
    recorded: usize,
    row_errors: Vec<RowErrorView>,
}

#[derive(Debug, Serialize)]
struct RowErrorView {
    row: usize,
    errors: Vec<String>,
}

impl From<&ImportOutcome> for ImportView {
    fn from(outcome: &ImportOutcome) -> Self {
        ImportView {
            file_hash: outcome.file_hash.clone(),
            source: outcome.source.to_string(),
            total_rows: outcome.rows.len(),
            valid: outcome.valid_count(),
            errors: outcome.error_count(),
            duplicates: outcome.duplicate_count(),
            recorded: outcome.inserted,
            row_errors: outcome
                .rows
                .iter()
                .filter(|r| !r.is_valid())
                .map(|r| RowErrorView {
                    row: r.row_number,
                    errors: r.errors.clone(),
                })
                .collect(),
        }
    }
}
