//! Storage port for the matching engines.
//!
//! The allocation and forecast engines never touch tables directly; they
//! see ordered snapshots through this trait, and every mutation of lot
//! state goes through `commit`.

pub mod memory;

use crate::core::parcel::{Allocation, Parcel, ParcelId, ProposedAllocation};
use crate::core::security::SecurityId;
use crate::matching::AllocationError;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

/// Orderings the engines ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParcelOrder {
    /// Oldest acquisition first.
    AcquisitionAsc,
    /// Newest acquisition first.
    AcquisitionDesc,
    /// Most expensive cost per unit first.
    CostPerUnitDesc,
}

/// A committed allocation joined with what reporting needs: the sell's
/// trade date and the security ticker.
#[derive(Debug, Clone, Serialize)]
pub struct AllocationDetail {
    pub allocation: Allocation,
    pub sell_date: NaiveDate,
    pub ticker: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("duplicate trade: {side} {quantity} @ {unit_price} on {trade_date} already recorded")]
pub struct DuplicateTradeError {
    pub trade_date: NaiveDate,
    pub side: crate::core::transaction::TradeSide,
    pub quantity: Decimal,
    pub unit_price: Decimal,
}

pub trait ParcelStore {
    /// Snapshots of all parcels for a security with remaining quantity > 0,
    /// in the requested order.
    fn available_parcels(&self, security_id: SecurityId, order: ParcelOrder) -> Vec<Parcel>;

    /// Snapshot of a single parcel.
    fn parcel(&self, id: ParcelId) -> Option<Parcel>;

    /// Commit proposals as a single all-or-nothing unit: re-validate each
    /// parcel's remaining quantity under its lot lock, decrement, flag
    /// depletion at zero, and persist the allocation records. A lost race
    /// rolls back every decrement applied in this attempt.
    fn commit(&self, proposed: &[ProposedAllocation]) -> Result<Vec<Allocation>, AllocationError>;

    /// All committed allocations joined with sell date and ticker.
    fn allocation_details(&self) -> Vec<AllocationDetail>;
}
