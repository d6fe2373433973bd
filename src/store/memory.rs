//! In-memory tables behind the `ParcelStore` port.
//!
//! Parcels sit behind per-lot mutexes: commits touching disjoint lots run
//! concurrently, commits touching the same lot serialize on that lot's
//! lock. Remaining quantity is only ever changed inside `commit`.

use super::{AllocationDetail, DuplicateTradeError, ParcelOrder, ParcelStore};
use crate::core::parcel::{Allocation, Parcel, ParcelId, ProposedAllocation};
use crate::core::security::{AssetType, Currency, Exchange, Security, SecurityId};
use crate::core::transaction::{TradeDraft, TradeKey, Transaction, TransactionId};
use crate::matching::AllocationError;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

#[derive(Default)]
pub struct MemoryStore {
    securities: RwLock<Vec<Security>>,
    transactions: RwLock<Vec<Transaction>>,
    trade_keys: RwLock<HashSet<TradeKey>>,
    parcels: RwLock<BTreeMap<ParcelId, Arc<Mutex<Parcel>>>>,
    allocations: Mutex<Vec<Allocation>>,
    next_security_id: AtomicU64,
    next_transaction_id: AtomicU64,
    next_parcel_id: AtomicU64,
    next_allocation_id: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a security by ticker, creating it on first reference.
    pub fn get_or_create_security(
        &self,
        ticker: &str,
        exchange: Exchange,
        currency: Currency,
        asset_type: AssetType,
    ) -> Security {
        let mut securities = self.securities.write().expect("securities lock poisoned");
        if let Some(existing) = securities.iter().find(|s| s.ticker == ticker) {
            return existing.clone();
        }
        let security = Security {
            id: self.next_security_id.fetch_add(1, Ordering::Relaxed) + 1,
            ticker: ticker.to_string(),
            name: String::new(),
            exchange,
            currency,
            asset_type,
        };
        log::debug!("created security {} ({})", security.ticker, security.id);
        securities.push(security.clone());
        security
    }

    pub fn security_by_ticker(&self, ticker: &str) -> Option<Security> {
        let securities = self.securities.read().expect("securities lock poisoned");
        securities.iter().find(|s| s.ticker == ticker).cloned()
    }

    pub fn security(&self, id: SecurityId) -> Option<Security> {
        let securities = self.securities.read().expect("securities lock poisoned");
        securities.iter().find(|s| s.id == id).cloned()
    }

    pub fn securities(&self) -> Vec<Security> {
        self.securities.read().expect("securities lock poisoned").clone()
    }

    /// Whether a trade with this dedup key has already been recorded.
    pub fn is_duplicate(&self, key: &TradeKey) -> bool {
        self.trade_keys.read().expect("trade keys lock poisoned").contains(key)
    }

    /// Record a validated trade. Rejects duplicates of the
    /// (date, security, side, quantity, price) tuple; a BUY also creates
    /// its parcel atomically with the transaction.
    pub fn record_trade(
        &self,
        draft: TradeDraft,
    ) -> Result<(Transaction, Option<Parcel>), DuplicateTradeError> {
        let key = draft.dedup_key();
        {
            let mut keys = self.trade_keys.write().expect("trade keys lock poisoned");
            if !keys.insert(key) {
                return Err(DuplicateTradeError {
                    trade_date: draft.trade_date,
                    side: draft.side,
                    quantity: draft.quantity,
                    unit_price: draft.unit_price,
                });
            }
        }

        let transaction = Transaction {
            id: self.next_transaction_id.fetch_add(1, Ordering::Relaxed) + 1,
            security_id: draft.security_id,
            trade_date: draft.trade_date,
            side: draft.side,
            quantity: draft.quantity,
            unit_price: draft.unit_price,
            brokerage: draft.brokerage,
            total_value: draft.total_value,
            currency: draft.currency,
            fx_rate: draft.fx_rate,
            raw_source: draft.raw_source,
        };

        let parcel = if transaction.side.is_buy() {
            let id = self.next_parcel_id.fetch_add(1, Ordering::Relaxed) + 1;
            let parcel = Parcel::from_acquisition(id, &transaction);
            log::debug!(
                "parcel {} created: {} units of security {} at {}",
                parcel.id,
                parcel.original_quantity,
                parcel.security_id,
                parcel.cost_per_unit
            );
            self.parcels
                .write()
                .expect("parcels lock poisoned")
                .insert(id, Arc::new(Mutex::new(parcel.clone())));
            Some(parcel)
        } else {
            None
        };

        self.transactions
            .write()
            .expect("transactions lock poisoned")
            .push(transaction.clone());

        Ok((transaction, parcel))
    }

    pub fn transactions(&self) -> Vec<Transaction> {
        self.transactions.read().expect("transactions lock poisoned").clone()
    }

    /// Sell transactions in trade-date order (ties by insertion).
    pub fn sell_transactions(&self) -> Vec<Transaction> {
        let mut sells: Vec<Transaction> = self
            .transactions
            .read()
            .expect("transactions lock poisoned")
            .iter()
            .filter(|t| t.side.is_sell())
            .cloned()
            .collect();
        sells.sort_by(|a, b| a.trade_date.cmp(&b.trade_date).then(a.id.cmp(&b.id)));
        sells
    }

    fn parcel_handles(
        &self,
        proposed: &[ProposedAllocation],
    ) -> Result<Vec<Arc<Mutex<Parcel>>>, AllocationError> {
        let parcels = self.parcels.read().expect("parcels lock poisoned");
        proposed
            .iter()
            .map(|p| {
                parcels
                    .get(&p.parcel_id)
                    .cloned()
                    .ok_or(AllocationError::UnknownParcel(p.parcel_id))
            })
            .collect()
    }

    fn rollback(applied: &[(Arc<Mutex<Parcel>>, Decimal)]) {
        for (handle, quantity) in applied {
            let mut parcel = handle.lock().expect("parcel lock poisoned");
            parcel.remaining_quantity += *quantity;
            parcel.fully_depleted = false;
            log::warn!("rolled back {} units to parcel {}", quantity, parcel.id);
        }
    }
}

impl ParcelStore for MemoryStore {
    fn available_parcels(&self, security_id: SecurityId, order: ParcelOrder) -> Vec<Parcel> {
        let parcels = self.parcels.read().expect("parcels lock poisoned");
        let mut available: Vec<Parcel> = parcels
            .values()
            .map(|handle| handle.lock().expect("parcel lock poisoned").clone())
            .filter(|p| p.security_id == security_id && p.remaining_quantity > Decimal::ZERO)
            .collect();

        match order {
            ParcelOrder::AcquisitionAsc => {
                available.sort_by(|a, b| a.acquisition_date.cmp(&b.acquisition_date).then(a.id.cmp(&b.id)));
            }
            ParcelOrder::AcquisitionDesc => {
                available.sort_by(|a, b| b.acquisition_date.cmp(&a.acquisition_date).then(b.id.cmp(&a.id)));
            }
            ParcelOrder::CostPerUnitDesc => {
                available.sort_by(|a, b| b.cost_per_unit.cmp(&a.cost_per_unit).then(a.id.cmp(&b.id)));
            }
        }

        available
    }

    fn parcel(&self, id: ParcelId) -> Option<Parcel> {
        let parcels = self.parcels.read().expect("parcels lock poisoned");
        parcels
            .get(&id)
            .map(|handle| handle.lock().expect("parcel lock poisoned").clone())
    }

    fn commit(&self, proposed: &[ProposedAllocation]) -> Result<Vec<Allocation>, AllocationError> {
        for p in proposed {
            if p.matched_quantity <= Decimal::ZERO {
                return Err(AllocationError::InvalidQuantity {
                    parcel: p.parcel_id,
                    quantity: p.matched_quantity,
                });
            }
        }

        let handles = self.parcel_handles(proposed)?;

        // Decrement lot by lot; a proposal that lost a race against a
        // concurrent commit fails the whole batch and undoes the rest.
        let mut applied: Vec<(Arc<Mutex<Parcel>>, Decimal)> = Vec::with_capacity(proposed.len());
        for (handle, p) in handles.iter().zip(proposed) {
            let mut parcel = handle.lock().expect("parcel lock poisoned");
            if p.matched_quantity > parcel.remaining_quantity {
                let err = AllocationError::CommitRace {
                    parcel: parcel.id,
                    requested: p.matched_quantity,
                    remaining: parcel.remaining_quantity,
                };
                drop(parcel);
                Self::rollback(&applied);
                return Err(err);
            }
            parcel.remaining_quantity -= p.matched_quantity;
            parcel.fully_depleted = parcel.remaining_quantity.is_zero();
            log::debug!(
                "parcel {}: -{} units, {} remaining{}",
                parcel.id,
                p.matched_quantity,
                parcel.remaining_quantity,
                if parcel.fully_depleted { " (depleted)" } else { "" }
            );
            drop(parcel);
            applied.push((Arc::clone(handle), p.matched_quantity));
        }

        let mut allocations = self.allocations.lock().expect("allocations lock poisoned");
        let committed: Vec<Allocation> = proposed
            .iter()
            .map(|p| {
                let id = self.next_allocation_id.fetch_add(1, Ordering::Relaxed) + 1;
                Allocation::from_proposed(id, p)
            })
            .collect();
        allocations.extend(committed.iter().cloned());

        Ok(committed)
    }

    fn allocation_details(&self) -> Vec<AllocationDetail> {
        let transactions = self.transactions.read().expect("transactions lock poisoned");
        let by_id: HashMap<TransactionId, &Transaction> =
            transactions.iter().map(|t| (t.id, t)).collect();
        let securities = self.securities.read().expect("securities lock poisoned");
        let tickers: HashMap<SecurityId, &str> =
            securities.iter().map(|s| (s.id, s.ticker.as_str())).collect();

        let allocations = self.allocations.lock().expect("allocations lock poisoned");
        allocations
            .iter()
            .filter_map(|allocation| {
                let sell = by_id.get(&allocation.sell_transaction_id)?;
                let ticker = tickers.get(&sell.security_id)?;
                Some(AllocationDetail {
                    allocation: allocation.clone(),
                    sell_date: sell.trade_date,
                    ticker: ticker.to_string(),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::{allocate, Strategy};
    use crate::store::testutil::{record_buy, record_sell, store_with_security};
    use rust_decimal_macros::dec;
    use std::thread;

    #[test]
    fn duplicate_trade_rejected() {
        let (store, security) = store_with_security("BHP.AX");
        record_buy(&store, &security, "2024-01-10", dec!(100), dec!(40.00));

        let draft = TradeDraft {
            security_id: security.id,
            trade_date: "2024-01-10".parse().unwrap(),
            side: crate::core::transaction::TradeSide::Buy,
            quantity: dec!(100),
            unit_price: dec!(40.00),
            brokerage: dec!(9.50),
            total_value: dec!(4000),
            currency: Currency::Aud,
            fx_rate: Decimal::ONE,
            raw_source: serde_json::Value::Null,
        };
        assert!(store.record_trade(draft).is_err());
    }

    #[test]
    fn get_or_create_security_is_idempotent() {
        let store = MemoryStore::new();
        let a = store.get_or_create_security("BHP.AX", Default::default(), Default::default(), Default::default());
        let b = store.get_or_create_security("BHP.AX", Default::default(), Default::default(), Default::default());
        assert_eq!(a.id, b.id);
        assert_eq!(store.securities().len(), 1);
    }

    #[test]
    fn available_parcels_excludes_depleted() {
        let (store, security) = store_with_security("BHP.AX");
        let (_, parcel) = record_buy(&store, &security, "2024-01-10", dec!(30), dec!(40.00));
        record_buy(&store, &security, "2024-02-10", dec!(50), dec!(42.00));
        let sell = record_sell(&store, &security, "2025-06-15", dec!(30), dec!(55.00));

        let proposals = allocate(&store, &sell, &Strategy::EarliestFirst).unwrap();
        store.commit(&proposals).unwrap();

        let drained = store.parcel(parcel.id).unwrap();
        assert_eq!(drained.remaining_quantity, Decimal::ZERO);
        assert!(drained.fully_depleted);

        let available = store.available_parcels(security.id, ParcelOrder::AcquisitionAsc);
        assert_eq!(available.len(), 1);
        assert_ne!(available[0].id, parcel.id);
    }

    #[test]
    fn cost_order_puts_most_expensive_first() {
        let (store, security) = store_with_security("BHP.AX");
        record_buy(&store, &security, "2024-01-10", dec!(10), dec!(40.00));
        record_buy(&store, &security, "2024-02-10", dec!(10), dec!(80.00));
        record_buy(&store, &security, "2024-03-10", dec!(10), dec!(60.00));

        let ordered = store.available_parcels(security.id, ParcelOrder::CostPerUnitDesc);
        let costs: Vec<Decimal> = ordered.iter().map(|p| p.cost_per_unit).collect();
        assert_eq!(costs, vec![dec!(80.95), dec!(60.95), dec!(40.95)]);
    }

    #[test]
    fn sell_spanning_two_parcels_updates_both_remainders() {
        // 60 units against parcels of 30 and 50: 30 from each, leaving 0 and 20.
        let (store, security) = store_with_security("BHP.AX");
        let (_, first) = record_buy(&store, &security, "2024-01-10", dec!(30), dec!(40.00));
        let (_, second) = record_buy(&store, &security, "2024-02-10", dec!(50), dec!(42.00));
        let sell = record_sell(&store, &security, "2025-06-15", dec!(60), dec!(55.00));

        let proposals = allocate(&store, &sell, &Strategy::EarliestFirst).unwrap();
        store.commit(&proposals).unwrap();

        assert_eq!(store.parcel(first.id).unwrap().remaining_quantity, Decimal::ZERO);
        assert_eq!(store.parcel(second.id).unwrap().remaining_quantity, dec!(20));
    }

    #[test]
    fn commit_race_rolls_back_earlier_decrements() {
        let (store, security) = store_with_security("BHP.AX");
        let (_, a) = record_buy(&store, &security, "2024-01-10", dec!(100), dec!(40.00));
        let (_, b) = record_buy(&store, &security, "2024-02-10", dec!(10), dec!(42.00));
        let sell = record_sell(&store, &security, "2025-06-15", dec!(70), dec!(55.00));

        // Hand-built proposals where the second slice oversells parcel b.
        let good = ProposedAllocation {
            parcel_id: a.id,
            sell_transaction_id: sell.id,
            matched_quantity: dec!(50),
            cost_base: dec!(2004.75),
            proceeds: dec!(2750),
            gain_loss: dec!(745.25),
            holding_days: 522,
            discount_eligible: true,
            discount_amount: dec!(372.625),
            net_gain: dec!(372.625),
        };
        let stale = ProposedAllocation {
            parcel_id: b.id,
            matched_quantity: dec!(20),
            ..good.clone()
        };

        let err = store.commit(&[good, stale]).unwrap_err();
        assert!(matches!(err, AllocationError::CommitRace { parcel, .. } if parcel == b.id));

        // Both parcels back at their pre-commit values, nothing persisted.
        assert_eq!(store.parcel(a.id).unwrap().remaining_quantity, dec!(100));
        assert_eq!(store.parcel(b.id).unwrap().remaining_quantity, dec!(10));
        assert!(store.allocation_details().is_empty());
    }

    #[test]
    fn commit_rejects_non_positive_quantity_before_mutation() {
        let (store, security) = store_with_security("BHP.AX");
        let (_, parcel) = record_buy(&store, &security, "2024-01-10", dec!(100), dec!(40.00));
        let sell = record_sell(&store, &security, "2025-06-15", dec!(50), dec!(55.00));

        let bogus = ProposedAllocation {
            parcel_id: parcel.id,
            sell_transaction_id: sell.id,
            matched_quantity: dec!(-5),
            cost_base: Decimal::ZERO,
            proceeds: Decimal::ZERO,
            gain_loss: Decimal::ZERO,
            holding_days: 0,
            discount_eligible: false,
            discount_amount: Decimal::ZERO,
            net_gain: Decimal::ZERO,
        };

        let err = store.commit(&[bogus]).unwrap_err();
        assert!(matches!(err, AllocationError::InvalidQuantity { .. }));
        assert_eq!(store.parcel(parcel.id).unwrap().remaining_quantity, dec!(100));
    }

    #[test]
    fn concurrent_commits_never_oversell_a_lot() {
        let (store, security) = store_with_security("BHP.AX");
        let (_, parcel) = record_buy(&store, &security, "2024-01-10", dec!(100), dec!(40.00));

        // Ten sells of 15 units each, all proposed against the same
        // pre-commit snapshot. At most six can succeed (6 x 15 = 90).
        let mut proposals = Vec::new();
        for i in 0..10 {
            let sell = record_sell(
                &store,
                &security,
                "2025-06-15",
                dec!(15),
                dec!(55.00) + Decimal::from(i),
            );
            proposals.push(allocate(&store, &sell, &Strategy::EarliestFirst).unwrap());
        }

        let store = Arc::new(store);
        let handles: Vec<_> = proposals
            .into_iter()
            .map(|proposal| {
                let store = Arc::clone(&store);
                thread::spawn(move || store.commit(&proposal).is_ok())
            })
            .collect();

        let successes = handles
            .into_iter()
            .map(|h| h.join().expect("commit thread panicked"))
            .filter(|committed| *committed)
            .count();

        assert_eq!(successes, 6);
        let consumed = Decimal::from(successes as u32) * dec!(15);
        let remaining = store.parcel(parcel.id).unwrap().remaining_quantity;
        assert_eq!(remaining, dec!(100) - consumed);
        assert_eq!(store.allocation_details().len(), successes);
    }

    #[test]
    fn commits_on_disjoint_lots_all_succeed() {
        let (store, security) = store_with_security("BHP.AX");
        let mut proposals = Vec::new();
        for i in 0..4 {
            let date = format!("2024-0{}-10", i + 1);
            record_buy(&store, &security, &date, dec!(50), dec!(40.00) + Decimal::from(i));
            let sell = record_sell(
                &store,
                &security,
                "2025-06-15",
                dec!(50),
                dec!(60.00) + Decimal::from(i),
            );
            // Latest-first keeps each sell on the parcel bought just before it.
            proposals.push(allocate(&store, &sell, &Strategy::LatestFirst).unwrap());
        }

        let store = Arc::new(store);
        let handles: Vec<_> = proposals
            .into_iter()
            .map(|proposal| {
                let store = Arc::clone(&store);
                thread::spawn(move || store.commit(&proposal).is_ok())
            })
            .collect();

        let successes = handles
            .into_iter()
            .map(|h| h.join().expect("commit thread panicked"))
            .filter(|committed| *committed)
            .count();

        assert_eq!(successes, 4);
        assert_eq!(store.allocation_details().len(), 4);
    }
}
