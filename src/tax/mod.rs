pub mod cgt;
pub mod summary;
pub mod year;

pub use cgt::{calculate_cgt, CgtBreakdown, DISCOUNT_HOLDING_DAYS};
pub use summary::{fy_summary, FySummary, SecuritySummary};
pub use year::FinancialYear;
