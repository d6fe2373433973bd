//! Broker CSV ingestion.
//!
//! Upload flow: parse with a column mapping -> per-row validation ->
//! duplicate check -> record. SelfWealth exports are recognised by their
//! headers; anything else goes through a caller-supplied mapping of CSV
//! column names to the canonical fields below. A bad row never aborts the
//! file; it carries its errors and is skipped at confirm time.

use crate::core::security::{AssetType, Currency, Exchange};
use crate::core::transaction::{TradeDraft, TradeKey, TradeSide};
use crate::store::memory::MemoryStore;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};

/// Canonical field names expected after mapping.
pub const CANONICAL_FIELDS: &[&str] = &[
    "trade_date",
    "transaction_type",
    "ticker",
    "quantity",
    "unit_price",
    "brokerage",
    "total_value",
    "exchange_rate",
    "currency",
    "exchange",
    "asset_type",
];

pub const REQUIRED_FIELDS: &[&str] = &[
    "trade_date",
    "transaction_type",
    "ticker",
    "quantity",
    "unit_price",
];

/// Where the file came from, for the import record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    SelfWealth,
    Generic,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SourceKind::SelfWealth => "SELFWEALTH",
            SourceKind::Generic => "GENERIC",
        };
        write!(f, "{}", s)
    }
}

/// The fixed SelfWealth column mapping.
pub fn selfwealth_mapping() -> HashMap<String, String> {
    [
        ("Trade Date", "trade_date"),
        ("Action", "transaction_type"),
        ("Code", "ticker"),
        ("Units", "quantity"),
        ("Average Price", "unit_price"),
        ("Brokerage", "brokerage"),
        ("Total", "total_value"),
    ]
    .iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

/// Identity mapping for files whose headers already use canonical names.
pub fn canonical_mapping() -> HashMap<String, String> {
    CANONICAL_FIELDS
        .iter()
        .map(|f| (f.to_string(), f.to_string()))
        .collect()
}

/// Whether CSV headers look like a SelfWealth export.
pub fn detect_selfwealth(headers: &[String]) -> bool {
    ["Trade Date", "Action", "Code", "Units", "Average Price"]
        .iter()
        .all(|required| headers.iter().any(|h| h == required))
}

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("failed to read CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("CSV file is empty")]
    EmptyFile,
}

/// A single CSV row in canonical form, with any per-field errors.
#[derive(Debug, Clone)]
pub struct ParsedRow {
    pub trade_date: NaiveDate,
    pub side: TradeSide,
    pub ticker: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub brokerage: Decimal,
    pub total_value: Decimal,
    pub fx_rate: Decimal,
    pub currency: Currency,
    pub exchange: Exchange,
    pub asset_type: AssetType,
    pub raw: serde_json::Value,
    /// 1-based line in the file; the header is row 1.
    pub row_number: usize,
    pub errors: Vec<String>,
}

impl ParsedRow {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Parse a date string, trying the formats brokers actually emit.
fn parse_date(value: &str) -> Result<NaiveDate, String> {
    const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%m/%d/%Y"];
    const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%d/%m/%Y %H:%M:%S"];

    let trimmed = value.trim();
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, fmt) {
            return Ok(date);
        }
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Ok(dt.date());
        }
    }
    Err(format!("cannot parse date: {:?}", value))
}

/// Parse a decimal, stripping currency symbols and thousands separators.
fn parse_decimal(value: &str) -> Result<Decimal, String> {
    let cleaned = value.trim().replace(['$', ','], "");
    if cleaned.is_empty() {
        return Ok(Decimal::ZERO);
    }
    cleaned
        .parse::<Decimal>()
        .map_err(|_| format!("cannot parse decimal: {:?}", value))
}

fn parse_side(value: &str) -> Result<TradeSide, String> {
    if let Some(side) = TradeSide::parse(value.trim()) {
        return Ok(side);
    }
    let upper = value.trim().to_uppercase();
    if upper == "IN" || upper == "OUT" {
        return Err(format!(
            "corporate action {:?} (transfer/conversion) is not a trade",
            value
        ));
    }
    Err(format!("unknown transaction type: {:?}", value))
}

/// Parse CSV content using the given column mapping
/// (CSV column name -> canonical field name).
/// Returns the original headers and every row, valid or not.
pub fn parse_csv(
    content: &str,
    mapping: &HashMap<String, String>,
) -> Result<(Vec<String>, Vec<ParsedRow>), ImportError> {
    if content.trim().is_empty() {
        return Err(ImportError::EmptyFile);
    }

    let mut reader = csv::Reader::from_reader(content.as_bytes());
    let headers: Vec<String> = reader.headers()?.iter().map(String::from).collect();

    // Invert the mapping: canonical field -> csv column.
    let reverse: HashMap<&str, &str> = mapping
        .iter()
        .map(|(col, field)| (field.as_str(), col.as_str()))
        .collect();

    let mut rows = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record?;
        let row_number = i + 2; // row 1 is the header

        let values: HashMap<&str, &str> = headers
            .iter()
            .zip(record.iter())
            .map(|(h, v)| (h.as_str(), v))
            .collect();
        let field = |name: &str| -> Option<&str> {
            reverse
                .get(name)
                .and_then(|col| values.get(col))
                .copied()
                .filter(|v| !v.trim().is_empty())
        };

        let mut errors: Vec<String> = Vec::new();

        let trade_date = match field("trade_date") {
            Some(v) => parse_date(v).unwrap_or_else(|e| {
                errors.push(format!("trade_date: {}", e));
                NaiveDate::default()
            }),
            None => {
                errors.push("trade_date: missing".to_string());
                NaiveDate::default()
            }
        };

        let side = match field("transaction_type") {
            Some(v) => parse_side(v).unwrap_or_else(|e| {
                errors.push(format!("transaction_type: {}", e));
                TradeSide::Buy
            }),
            None => {
                errors.push("transaction_type: missing".to_string());
                TradeSide::Buy
            }
        };

        let ticker = match field("ticker") {
            Some(v) => v.trim().to_uppercase(),
            None => {
                errors.push("ticker: missing".to_string());
                String::new()
            }
        };

        let mut decimal_field = |name: &str, default: Decimal, absolute: bool| -> Decimal {
            match field(name) {
                Some(v) => match parse_decimal(v) {
                    Ok(d) => {
                        if absolute {
                            d.abs()
                        } else {
                            d
                        }
                    }
                    Err(e) => {
                        errors.push(format!("{}: {}", name, e));
                        default
                    }
                },
                None if REQUIRED_FIELDS.contains(&name) => {
                    errors.push(format!("{}: missing", name));
                    default
                }
                None => default,
            }
        };

        let quantity = decimal_field("quantity", Decimal::ZERO, true);
        let unit_price = decimal_field("unit_price", Decimal::ZERO, false);
        let brokerage = decimal_field("brokerage", Decimal::ZERO, false);
        let mut total_value = decimal_field("total_value", Decimal::ZERO, true);
        let fx_rate = decimal_field("exchange_rate", Decimal::ONE, false);

        let currency = match field("currency") {
            Some(v) => Currency::parse(v).unwrap_or_else(|| {
                errors.push(format!("currency: unknown currency {:?}", v));
                Currency::default()
            }),
            None => Currency::default(),
        };
        let exchange = match field("exchange") {
            Some(v) => Exchange::parse(v).unwrap_or_else(|| {
                errors.push(format!("exchange: unknown exchange {:?}", v));
                Exchange::default()
            }),
            None => Exchange::default(),
        };
        let asset_type = match field("asset_type") {
            Some(v) => AssetType::parse(v).unwrap_or_else(|| {
                errors.push(format!("asset_type: unknown asset type {:?}", v));
                AssetType::default()
            }),
            None => AssetType::default(),
        };

        if total_value.is_zero() && errors.is_empty() {
            total_value = quantity * unit_price;
        }

        let raw: serde_json::Map<String, serde_json::Value> = headers
            .iter()
            .zip(record.iter())
            .map(|(h, v)| (h.clone(), serde_json::Value::String(v.to_string())))
            .collect();

        rows.push(ParsedRow {
            trade_date,
            side,
            ticker,
            quantity,
            unit_price,
            brokerage,
            total_value,
            fx_rate,
            currency,
            exchange,
            asset_type,
            raw: serde_json::Value::Object(raw),
            row_number,
            errors,
        });
    }

    Ok((headers, rows))
}

/// Everything the caller needs to show for an import: the parsed rows,
/// which were duplicates, how many were recorded, and a content
/// fingerprint of the source file for audit.
#[derive(Debug)]
pub struct ImportOutcome {
    pub file_hash: String,
    pub source: SourceKind,
    pub rows: Vec<ParsedRow>,
    pub duplicate_rows: HashSet<usize>,
    pub inserted: usize,
}

impl ImportOutcome {
    pub fn valid_count(&self) -> usize {
        self.rows.iter().filter(|r| r.is_valid()).count()
    }

    pub fn error_count(&self) -> usize {
        self.rows.len() - self.valid_count()
    }

    pub fn duplicate_count(&self) -> usize {
        self.duplicate_rows.len()
    }
}

/// SHA-256 fingerprint of the raw file content.
pub fn file_fingerprint(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}

fn dedup_key(store: &MemoryStore, row: &ParsedRow) -> Option<TradeKey> {
    let security = store.security_by_ticker(&row.ticker)?;
    Some(TradeKey {
        trade_date: row.trade_date,
        security_id: security.id,
        side: row.side,
        quantity: row.quantity,
        unit_price: row.unit_price,
    })
}

/// Parse and check against the store without recording anything.
pub fn preview_trades(
    store: &MemoryStore,
    content: &str,
    mapping: &HashMap<String, String>,
    source: SourceKind,
) -> Result<ImportOutcome, ImportError> {
    let (_headers, rows) = parse_csv(content, mapping)?;

    let mut duplicate_rows = HashSet::new();
    let mut seen = HashSet::new();
    for row in rows.iter().filter(|r| r.is_valid()) {
        if let Some(key) = dedup_key(store, row) {
            if store.is_duplicate(&key) || !seen.insert(key) {
                duplicate_rows.insert(row.row_number);
            }
        }
    }

    Ok(ImportOutcome {
        file_hash: file_fingerprint(content),
        source,
        rows,
        duplicate_rows,
        inserted: 0,
    })
}

/// Parse, skip duplicates, and record transactions (buys also create
/// their parcels). Securities are created on first reference.
pub fn import_trades(
    store: &MemoryStore,
    content: &str,
    mapping: &HashMap<String, String>,
    source: SourceKind,
) -> Result<ImportOutcome, ImportError> {
    let (_headers, rows) = parse_csv(content, mapping)?;

    let mut duplicate_rows = HashSet::new();
    let mut inserted = 0usize;

    for row in &rows {
        if !row.is_valid() {
            log::debug!("row {} skipped: {}", row.row_number, row.errors.join("; "));
            continue;
        }

        let security =
            store.get_or_create_security(&row.ticker, row.exchange, row.currency, row.asset_type);

        let draft = TradeDraft {
            security_id: security.id,
            trade_date: row.trade_date,
            side: row.side,
            quantity: row.quantity,
            unit_price: row.unit_price,
            brokerage: row.brokerage,
            total_value: row.total_value,
            currency: row.currency,
            fx_rate: row.fx_rate,
            raw_source: row.raw.clone(),
        };

        match store.record_trade(draft) {
            Ok(_) => inserted += 1,
            Err(duplicate) => {
                log::debug!("row {} is a duplicate: {}", row.row_number, duplicate);
                duplicate_rows.insert(row.row_number);
            }
        }
    }

    log::info!(
        "imported {} of {} rows ({} duplicates)",
        inserted,
        rows.len(),
        duplicate_rows.len()
    );

    Ok(ImportOutcome {
        file_hash: file_fingerprint(content),
        source,
        rows,
        duplicate_rows,
        inserted,
    })
}
