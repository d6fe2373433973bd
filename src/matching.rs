//! Parcel matching engine.
//!
//! `allocate` selects which parcels a sell consumes and computes the tax
//! outcome per slice, returning unpersisted proposals. Nothing here mutates
//! lot state; that is the store's commit path.

use crate::core::parcel::{Parcel, ParcelId, ProposedAllocation};
use crate::core::transaction::{Transaction, TransactionId};
use crate::store::{ParcelOrder, ParcelStore};
use crate::tax::cgt::calculate_cgt;
use rust_decimal::Decimal;

/// One caller-chosen slice for manual matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManualLot {
    pub parcel_id: ParcelId,
    pub quantity: Decimal,
}

/// How parcels are selected for a sell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Strategy {
    /// Oldest acquisition first (FIFO).
    EarliestFirst,
    /// Newest acquisition first (LIFO).
    LatestFirst,
    /// Highest cost per unit first, minimising the gain. Used by the
    /// forecast comparison.
    HighestCostFirst,
    /// Caller supplies the exact parcel/quantity pairs.
    Manual(Vec<ManualLot>),
}

impl Strategy {
    pub fn name(&self) -> &'static str {
        match self {
            Strategy::EarliestFirst => "earliest-first",
            Strategy::LatestFirst => "latest-first",
            Strategy::HighestCostFirst => "highest-cost-first",
            Strategy::Manual(_) => "manual",
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AllocationError {
    #[error("transaction {0} is not a sell")]
    NotASell(TransactionId),
    #[error("insufficient parcels: need {needed} units, only {available} available")]
    InsufficientParcels { needed: Decimal, available: Decimal },
    #[error("unknown parcel: {0}")]
    UnknownParcel(ParcelId),
    #[error("manual matching requires at least one parcel")]
    ManualEmpty,
    #[error("cannot match {requested} from parcel {parcel}: only {remaining} remaining")]
    QuantityExceedsRemaining {
        parcel: ParcelId,
        requested: Decimal,
        remaining: Decimal,
    },
    #[error("parcel {parcel} is for a different security")]
    SecurityMismatch { parcel: ParcelId },
    #[error("total matched quantity ({matched}) does not equal sell quantity ({required})")]
    ManualTotalMismatch { matched: Decimal, required: Decimal },
    #[error("matched quantity must be positive: {quantity} for parcel {parcel}")]
    InvalidQuantity { parcel: ParcelId, quantity: Decimal },
    #[error("commit lost race on parcel {parcel}: only {remaining} remaining, {requested} matched")]
    CommitRace {
        parcel: ParcelId,
        requested: Decimal,
        remaining: Decimal,
    },
}

/// Build the proposals for a sell under the given strategy.
///
/// Auto strategies consume the store's ordered candidates until the sell
/// quantity is satisfied and fail on any shortfall; manual validates the
/// caller's pairs and requires them to sum to the sell quantity exactly.
/// Never returns a partial result.
pub fn allocate(
    store: &dyn ParcelStore,
    sell: &Transaction,
    strategy: &Strategy,
) -> Result<Vec<ProposedAllocation>, AllocationError> {
    if !sell.side.is_sell() {
        return Err(AllocationError::NotASell(sell.id));
    }

    match strategy {
        Strategy::Manual(lots) => allocate_manual(store, sell, lots),
        Strategy::EarliestFirst => allocate_auto(store, sell, ParcelOrder::AcquisitionAsc),
        Strategy::LatestFirst => allocate_auto(store, sell, ParcelOrder::AcquisitionDesc),
        Strategy::HighestCostFirst => allocate_auto(store, sell, ParcelOrder::CostPerUnitDesc),
    }
}

fn allocate_auto(
    store: &dyn ParcelStore,
    sell: &Transaction,
    order: ParcelOrder,
) -> Result<Vec<ProposedAllocation>, AllocationError> {
    let candidates = store.available_parcels(sell.security_id, order);
    let (proposals, shortfall) = consume_ordered(&candidates, sell, sell.quantity);

    if shortfall > Decimal::ZERO {
        return Err(AllocationError::InsufficientParcels {
            needed: sell.quantity,
            available: sell.quantity - shortfall,
        });
    }

    Ok(proposals)
}

/// Walk ordered parcels taking `min(remaining, still needed)` from each.
/// Returns the proposals plus any unsatisfied quantity. Shared with the
/// forecast engine so previews follow the identical consumption path.
pub(crate) fn consume_ordered(
    parcels: &[Parcel],
    sell: &Transaction,
    quantity: Decimal,
) -> (Vec<ProposedAllocation>, Decimal) {
    let mut remaining = quantity;
    let mut proposals = Vec::new();

    for parcel in parcels {
        if remaining <= Decimal::ZERO {
            break;
        }
        let qty = parcel.remaining_quantity.min(remaining);
        log::debug!(
            "consuming {} of parcel {} (acquired {}, {} remaining)",
            qty,
            parcel.id,
            parcel.acquisition_date,
            parcel.remaining_quantity
        );
        proposals.push(build_proposal(parcel, sell, qty));
        remaining -= qty;
    }

    (proposals, remaining)
}

fn allocate_manual(
    store: &dyn ParcelStore,
    sell: &Transaction,
    lots: &[ManualLot],
) -> Result<Vec<ProposedAllocation>, AllocationError> {
    if lots.is_empty() {
        return Err(AllocationError::ManualEmpty);
    }

    let mut proposals = Vec::new();
    let mut matched = Decimal::ZERO;

    for lot in lots {
        if lot.quantity <= Decimal::ZERO {
            continue;
        }

        let parcel = store
            .parcel(lot.parcel_id)
            .ok_or(AllocationError::UnknownParcel(lot.parcel_id))?;

        if lot.quantity > parcel.remaining_quantity {
            return Err(AllocationError::QuantityExceedsRemaining {
                parcel: parcel.id,
                requested: lot.quantity,
                remaining: parcel.remaining_quantity,
            });
        }
        if parcel.security_id != sell.security_id {
            return Err(AllocationError::SecurityMismatch { parcel: parcel.id });
        }

        proposals.push(build_proposal(&parcel, sell, lot.quantity));
        matched += lot.quantity;
    }

    if matched != sell.quantity {
        return Err(AllocationError::ManualTotalMismatch {
            matched,
            required: sell.quantity,
        });
    }

    Ok(proposals)
}

/// One proposal slice with its CGT breakdown.
fn build_proposal(parcel: &Parcel, sell: &Transaction, quantity: Decimal) -> ProposedAllocation {
    let cgt = calculate_cgt(parcel, sell, quantity);
    ProposedAllocation {
        parcel_id: parcel.id,
        sell_transaction_id: sell.id,
        matched_quantity: quantity,
        cost_base: cgt.cost_base,
        proceeds: cgt.proceeds,
        gain_loss: cgt.gain_loss,
        holding_days: cgt.holding_days,
        discount_eligible: cgt.discount_eligible,
        discount_amount: cgt.discount_amount,
        net_gain: cgt.net_gain,
    }
}
