//! Financial-year aggregation over committed allocations.

use super::year::FinancialYear;
use crate::store::AllocationDetail;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;

/// Aggregated CGT outcome for one security within a financial year.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SecuritySummary {
    pub ticker: String,
    pub gains: Decimal,
    pub losses: Decimal,
    pub discounts: Decimal,
    pub net_gain: Decimal,
    pub allocation_count: usize,
}

/// Aggregated CGT outcome for a financial year.
#[derive(Debug, Clone, Serialize)]
pub struct FySummary {
    pub year: i32,
    pub label: String,
    pub gains: Decimal,
    pub losses: Decimal,
    pub discounts: Decimal,
    pub net_gain: Decimal,
    pub allocation_count: usize,
    /// Per-security breakdown, sorted by ticker.
    pub per_security: Vec<SecuritySummary>,
}

/// Aggregate committed allocations whose sell date falls inside the
/// financial year. Gains and losses are split by the sign of the gross
/// gain/loss; discounts and net gain are summed regardless of sign.
pub fn fy_summary(year: FinancialYear, allocations: &[AllocationDetail]) -> FySummary {
    let mut gains = Decimal::ZERO;
    let mut losses = Decimal::ZERO;
    let mut discounts = Decimal::ZERO;
    let mut net_gain = Decimal::ZERO;
    let mut count = 0usize;
    // BTreeMap keeps the per-security breakdown sorted by ticker.
    let mut per_security: BTreeMap<String, SecuritySummary> = BTreeMap::new();

    for detail in allocations {
        if !year.contains(detail.sell_date) {
            continue;
        }

        let allocation = &detail.allocation;
        count += 1;

        if allocation.gain_loss > Decimal::ZERO {
            gains += allocation.gain_loss;
        } else {
            losses += allocation.gain_loss;
        }
        discounts += allocation.discount_amount;
        net_gain += allocation.net_gain;

        let entry = per_security
            .entry(detail.ticker.clone())
            .or_insert_with(|| SecuritySummary {
                ticker: detail.ticker.clone(),
                ..SecuritySummary::default()
            });
        if allocation.gain_loss > Decimal::ZERO {
            entry.gains += allocation.gain_loss;
        } else {
            entry.losses += allocation.gain_loss;
        }
        entry.discounts += allocation.discount_amount;
        entry.net_gain += allocation.net_gain;
        entry.allocation_count += 1;
    }

    FySummary {
        year: year.0,
        label: year.display(),
        gains,
        losses,
        discounts,
        net_gain,
        allocation_count: count,
        per_security: per_security.into_values().collect(),
    }
}
