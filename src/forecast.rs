//! What-if CGT forecasting.
//!
//! Simulates a hypothetical sell under the three automatic strategies and
//! reports each outcome side by side. Pure preview: the store is only read,
//! and the consumption path is the allocation engine's own, so confirming
//! the same sell later produces identical numbers.

use crate::core::parcel::{Parcel, ParcelId, ProposedAllocation};
use crate::core::security::{Security, SecurityId};
use crate::core::transaction::{TradeSide, Transaction};
use crate::matching::consume_ordered;
use crate::store::{ParcelOrder, ParcelStore};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ForecastError {
    #[error("quantity must be positive")]
    NonPositiveQuantity,
    #[error("sell price must be positive")]
    NonPositivePrice,
    #[error("no available parcels for {ticker}")]
    NoParcels { ticker: String },
    #[error("insufficient parcels: need {needed} units, only {available} available for {ticker}")]
    InsufficientParcels {
        ticker: String,
        needed: Decimal,
        available: Decimal,
    },
}

/// One parcel slice inside a simulated strategy outcome.
#[derive(Debug, Clone, Serialize)]
pub struct ForecastLine {
    pub parcel_id: ParcelId,
    pub acquisition_date: NaiveDate,
    pub cost_per_unit: Decimal,
    pub matched_quantity: Decimal,
    pub cost_base: Decimal,
    pub proceeds: Decimal,
    pub gain_loss: Decimal,
    pub holding_days: i64,
    pub discount_eligible: bool,
    pub discount_amount: Decimal,
    pub net_gain: Decimal,
}

/// Aggregated outcome of one strategy.
#[derive(Debug, Clone, Serialize)]
pub struct StrategyForecast {
    pub lines: Vec<ForecastLine>,
    pub total_cost_base: Decimal,
    pub total_proceeds: Decimal,
    pub total_gain_loss: Decimal,
    pub total_discount: Decimal,
    pub total_net_gain: Decimal,
    pub quantity_matched: Decimal,
    pub quantity_shortfall: Decimal,
}

/// Side-by-side comparison of the three automatic strategies.
#[derive(Debug, Clone, Serialize)]
pub struct ForecastReport {
    pub ticker: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub sell_date: NaiveDate,
    pub earliest_first: StrategyForecast,
    pub latest_first: StrategyForecast,
    pub highest_cost_first: StrategyForecast,
}

/// Forecast a hypothetical sell of `quantity` units at `unit_price` AUD.
///
/// The price is taken as already in the reporting currency (FX rate 1).
/// Nothing is persisted and lot state is untouched.
pub fn forecast(
    store: &dyn ParcelStore,
    security: &Security,
    quantity: Decimal,
    unit_price: Decimal,
    sell_date: NaiveDate,
) -> Result<ForecastReport, ForecastError> {
    if quantity <= Decimal::ZERO {
        return Err(ForecastError::NonPositiveQuantity);
    }
    if unit_price <= Decimal::ZERO {
        return Err(ForecastError::NonPositivePrice);
    }

    let candidates = store.available_parcels(security.id, ParcelOrder::AcquisitionAsc);
    if candidates.is_empty() {
        return Err(ForecastError::NoParcels {
            ticker: security.ticker.clone(),
        });
    }

    let available: Decimal = candidates.iter().map(|p| p.remaining_quantity).sum();
    if available < quantity {
        return Err(ForecastError::InsufficientParcels {
            ticker: security.ticker.clone(),
            needed: quantity,
            available,
        });
    }

    let sell = synthetic_sell(security.id, quantity, unit_price, sell_date);

    Ok(ForecastReport {
        ticker: security.ticker.clone(),
        quantity,
        unit_price,
        sell_date,
        earliest_first: simulate(store, security.id, &sell, ParcelOrder::AcquisitionAsc),
        latest_first: simulate(store, security.id, &sell, ParcelOrder::AcquisitionDesc),
        highest_cost_first: simulate(store, security.id, &sell, ParcelOrder::CostPerUnitDesc),
    })
}

/// An unpersisted stand-in sell, priced directly in AUD.
fn synthetic_sell(
    security_id: SecurityId,
    quantity: Decimal,
    unit_price: Decimal,
    sell_date: NaiveDate,
) -> Transaction {
    Transaction {
        id: 0,
        security_id,
        trade_date: sell_date,
        side: TradeSide::Sell,
        quantity,
        unit_price,
        brokerage: Decimal::ZERO,
        total_value: quantity * unit_price,
        currency: Default::default(),
        fx_rate: Decimal::ONE,
        raw_source: serde_json::Value::Null,
    }
}

fn simulate(
    store: &dyn ParcelStore,
    security_id: SecurityId,
    sell: &Transaction,
    order: ParcelOrder,
) -> StrategyForecast {
    let parcels = store.available_parcels(security_id, order);
    let (proposals, shortfall) = consume_ordered(&parcels, sell, sell.quantity);

    let by_id: HashMap<ParcelId, &Parcel> = parcels.iter().map(|p| (p.id, p)).collect();

    let mut outcome = StrategyForecast {
        lines: Vec::with_capacity(proposals.len()),
        total_cost_base: Decimal::ZERO,
        total_proceeds: Decimal::ZERO,
        total_gain_loss: Decimal::ZERO,
        total_discount: Decimal::ZERO,
        total_net_gain: Decimal::ZERO,
        quantity_matched: sell.quantity - shortfall,
        quantity_shortfall: shortfall,
    };

    for proposal in &proposals {
        outcome.total_cost_base += proposal.cost_base;
        outcome.total_proceeds += proposal.proceeds;
        outcome.total_gain_loss += proposal.gain_loss;
        outcome.total_discount += proposal.discount_amount;
        outcome.total_net_gain += proposal.net_gain;
        outcome.lines.push(line(proposal, &by_id));
    }

    outcome
}

fn line(proposal: &ProposedAllocation, parcels: &HashMap<ParcelId, &Parcel>) -> ForecastLine {
    let parcel = parcels[&proposal.parcel_id];
    ForecastLine {
        parcel_id: proposal.parcel_id,
        acquisition_date: parcel.acquisition_date,
        cost_per_unit: parcel.cost_per_unit,
        matched_quantity: proposal.matched_quantity,
        cost_base: proposal.cost_base,
        proceeds: proposal.proceeds,
        gain_loss: proposal.gain_loss,
        holding_days: proposal.holding_days,
        discount_eligible: proposal.discount_eligible,
        discount_amount: proposal.discount_amount,
        net_gain: proposal.net_gain,
    }
}
