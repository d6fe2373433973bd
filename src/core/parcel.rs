use super::security::SecurityId;
use super::transaction::{Transaction, TransactionId};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub type ParcelId = u64;
pub type AllocationId = u64;

/// A cost-basis lot: the units acquired by a single BUY transaction,
/// consumed over time by sell allocations.
///
/// `remaining_quantity` only ever decreases, and only inside the store's
/// commit path. Invariant: `0 <= remaining_quantity <= original_quantity`
/// and `fully_depleted` iff `remaining_quantity == 0`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parcel {
    pub id: ParcelId,
    pub transaction_id: TransactionId,
    pub security_id: SecurityId,
    pub acquisition_date: NaiveDate,
    pub original_quantity: Decimal,
    pub remaining_quantity: Decimal,
    /// Cost per unit in AUD. Acquisition brokerage and FX conversion are
    /// already baked in.
    pub cost_per_unit: Decimal,
    pub total_cost_base: Decimal,
    pub fully_depleted: bool,
}

impl Parcel {
    /// Build the parcel for a BUY transaction.
    ///
    /// Cost base = (quantity x unit price + brokerage) x FX rate, all in AUD.
    pub fn from_acquisition(id: ParcelId, buy: &Transaction) -> Parcel {
        let total_cost_base = (buy.quantity * buy.unit_price + buy.brokerage) * buy.fx_rate;
        let cost_per_unit = if buy.quantity.is_zero() {
            Decimal::ZERO
        } else {
            total_cost_base / buy.quantity
        };
        Parcel {
            id,
            transaction_id: buy.id,
            security_id: buy.security_id,
            acquisition_date: buy.trade_date,
            original_quantity: buy.quantity,
            remaining_quantity: buy.quantity,
            cost_per_unit,
            total_cost_base,
            fully_depleted: false,
        }
    }
}

/// A not-yet-committed slice of a parcel consumed by a sell.
///
/// Plain value object: the caller holds these between `allocate` and
/// `commit`, and discarding them has no effect on stored state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposedAllocation {
    pub parcel_id: ParcelId,
    pub sell_transaction_id: TransactionId,
    pub matched_quantity: Decimal,
    pub cost_base: Decimal,
    pub proceeds: Decimal,
    pub gain_loss: Decimal,
    pub holding_days: i64,
    pub discount_eligible: bool,
    pub discount_amount: Decimal,
    pub net_gain: Decimal,
}

/// A committed parcel-to-sell match with its tax outcome. Created only by
/// the store's commit path; immutable thereafter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Allocation {
    pub id: AllocationId,
    pub parcel_id: ParcelId,
    pub sell_transaction_id: TransactionId,
    pub matched_quantity: Decimal,
    pub cost_base: Decimal,
    pub proceeds: Decimal,
    pub gain_loss: Decimal,
    pub holding_days: i64,
    pub discount_eligible: bool,
    pub discount_amount: Decimal,
    pub net_gain: Decimal,
}

impl Allocation {
    pub fn from_proposed(id: AllocationId, proposed: &ProposedAllocation) -> Allocation {
        Allocation {
            id,
            parcel_id: proposed.parcel_id,
            sell_transaction_id: proposed.sell_transaction_id,
            matched_quantity: proposed.matched_quantity,
            cost_base: proposed.cost_base,
            proceeds: proposed.proceeds,
            gain_loss: proposed.gain_loss,
            holding_days: proposed.holding_days,
            discount_eligible: proposed.discount_eligible,
            discount_amount: proposed.discount_amount,
            net_gain: proposed.net_gain,
        }
    }
}
