pub mod parcel;
pub mod security;
pub mod transaction;

// Flat public surface for domain types.
pub use parcel::{Allocation, AllocationId, Parcel, ParcelId, ProposedAllocation};
pub use security::{AssetType, Currency, Exchange, Security, SecurityId};
pub use transaction::{TradeDraft, TradeKey, TradeSide, Transaction, TransactionId};
