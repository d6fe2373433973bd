use super::security::{Currency, SecurityId};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub type TransactionId = u64;

/// Direction of an executed trade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TradeSide {
    Buy,
    Sell,
}

impl TradeSide {
    pub fn is_buy(self) -> bool {
        matches!(self, TradeSide::Buy)
    }

    pub fn is_sell(self) -> bool {
        matches!(self, TradeSide::Sell)
    }

    pub fn parse(s: &str) -> Option<TradeSide> {
        match s.to_uppercase().as_str() {
            "BUY" | "B" => Some(TradeSide::Buy),
            "SELL" | "S" => Some(TradeSide::Sell),
            _ => None,
        }
    }
}

impl std::fmt::Display for TradeSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TradeSide::Buy => "BUY",
            TradeSide::Sell => "SELL",
        };
        write!(f, "{}", s)
    }
}

/// An executed trade. Immutable once recorded; downstream entities
/// (parcels, allocations) reference it but never change it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub security_id: SecurityId,
    pub trade_date: NaiveDate,
    pub side: TradeSide,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub brokerage: Decimal,
    pub total_value: Decimal,
    pub currency: Currency,
    /// Conversion factor to the reporting currency (AUD). 1 for AUD trades.
    pub fx_rate: Decimal,
    /// Original source row, kept verbatim for audit.
    pub raw_source: serde_json::Value,
}

impl Transaction {
    /// The tuple that identifies a trade for duplicate protection.
    pub fn dedup_key(&self) -> TradeKey {
        TradeKey {
            trade_date: self.trade_date,
            security_id: self.security_id,
            side: self.side,
            quantity: self.quantity,
            unit_price: self.unit_price,
        }
    }
}

/// Duplicate-protection key: two trades with the same date, security,
/// direction, quantity and unit price are considered the same trade.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TradeKey {
    pub trade_date: NaiveDate,
    pub security_id: SecurityId,
    pub side: TradeSide,
    pub quantity: Decimal,
    pub unit_price: Decimal,
}

/// Fields for a trade about to be recorded (everything but the id,
/// which the store assigns).
#[derive(Debug, Clone)]
pub struct TradeDraft {
    pub security_id: SecurityId,
    pub trade_date: NaiveDate,
    pub side: TradeSide,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub brokerage: Decimal,
    pub total_value: Decimal,
    pub currency: Currency,
    pub fx_rate: Decimal,
    pub raw_source: serde_json::Value,
}

impl TradeDraft {
    pub fn dedup_key(&self) -> TradeKey {
        TradeKey {
            trade_date: self.trade_date,
            security_id: self.security_id,
            side: self.side,
            quantity: self.quantity,
            unit_price: self.unit_price,
        }
    }
}
