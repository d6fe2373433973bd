//! Per-slice CGT calculation.
//!
//! Australian rules as applied here:
//! - 50% discount for holdings strictly longer than 365 days
//! - the discount applies only to positive gains
//! - a parcel's cost per unit already includes acquisition brokerage and
//!   FX conversion; sell-side brokerage is recorded on the transaction but
//!   not subtracted from proceeds

use crate::core::parcel::Parcel;
use crate::core::transaction::Transaction;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Holding period above which a positive gain earns the discount.
/// Strictly greater-than: 365 days is ineligible, 366 is eligible.
pub const DISCOUNT_HOLDING_DAYS: i64 = 365;

/// The tax outcome of consuming `matched_quantity` units of one parcel
/// with one sell, all amounts in AUD.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CgtBreakdown {
    pub cost_base: Decimal,
    pub proceeds: Decimal,
    pub gain_loss: Decimal,
    pub holding_days: i64,
    pub discount_eligible: bool,
    pub discount_amount: Decimal,
    pub net_gain: Decimal,
}

/// Compute the CGT breakdown for a slice of a parcel consumed by a sell.
///
/// Pure: no state, no side effects. The caller guarantees the quantity is
/// positive and does not exceed the parcel's remaining units.
pub fn calculate_cgt(parcel: &Parcel, sell: &Transaction, matched_quantity: Decimal) -> CgtBreakdown {
    let cost_base = parcel.cost_per_unit * matched_quantity;

    let proceeds_per_unit = sell.unit_price * sell.fx_rate;
    let proceeds = proceeds_per_unit * matched_quantity;

    let gain_loss = proceeds - cost_base;

    let holding_days = (sell.trade_date - parcel.acquisition_date).num_days();

    let discount_eligible = holding_days > DISCOUNT_HOLDING_DAYS && gain_loss > Decimal::ZERO;
    let discount_amount = if discount_eligible {
        gain_loss * dec!(0.5)
    } else {
        Decimal::ZERO
    };

    let net_gain = gain_loss - discount_amount;

    CgtBreakdown {
        cost_base,
        proceeds,
        gain_loss,
        holding_days,
        discount_eligible,
        discount_amount,
        net_gain,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::security::Currency;
    use crate::core::transaction::TradeSide;

    fn parcel(acquired: &str, qty: Decimal, cost_per_unit: Decimal) -> Parcel {
        Parcel {
            id: 1,
            transaction_id: 1,
            security_id: 1,
            acquisition_date: acquired.parse().unwrap(),
            original_quantity: qty,
            remaining_quantity: qty,
            cost_per_unit,
            total_cost_base: cost_per_unit * qty,
            fully_depleted: false,
        }
    }

    fn sell(date: &str, qty: Decimal, price: Decimal, fx: Decimal) -> Transaction {
        Transaction {
            id: 2,
            security_id: 1,
            trade_date: date.parse().unwrap(),
            side: TradeSide::Sell,
            quantity: qty,
            unit_price: price,
            brokerage: dec!(9.50),
            total_value: qty * price,
            currency: Currency::Aud,
            fx_rate: fx,
            raw_source: serde_json::Value::Null,
        }
    }

    #[test]
    fn worked_example_long_hold_gain() {
        // 100 units at cost/unit 40.095, sell 50 on 2025-06-15 at 55.00
        let p = parcel("2024-01-10", dec!(100), dec!(40.095));
        let s = sell("2025-06-15", dec!(50), dec!(55.00), dec!(1));

        let cgt = calculate_cgt(&p, &s, dec!(50));

        assert_eq!(cgt.cost_base, dec!(2004.750));
        assert_eq!(cgt.proceeds, dec!(2750.0000));
        assert_eq!(cgt.gain_loss, dec!(745.2500));
        assert_eq!(cgt.holding_days, 522);
        assert!(cgt.discount_eligible);
        assert_eq!(cgt.discount_amount, dec!(372.625000));
        assert_eq!(cgt.net_gain, dec!(372.625000));
    }

    #[test]
    fn gain_identity_holds() {
        let p = parcel("2023-03-01", dec!(200), dec!(12.34));
        let s = sell("2025-02-20", dec!(75), dec!(19.99), dec!(1));

        let cgt = calculate_cgt(&p, &s, dec!(75));

        assert_eq!(cgt.gain_loss, cgt.proceeds - cgt.cost_base);
        assert_eq!(cgt.net_gain, cgt.gain_loss - cgt.discount_amount);
    }

    #[test]
    fn exactly_365_days_not_eligible() {
        // 2025-01-10 -> 2026-01-10 is 365 days (no leap day in between)
        let p = parcel("2025-01-10", dec!(100), dec!(30.00));
        let s = sell("2026-01-10", dec!(50), dec!(55.00), dec!(1));

        let cgt = calculate_cgt(&p, &s, dec!(50));

        assert_eq!(cgt.holding_days, 365);
        assert!(!cgt.discount_eligible);
        assert_eq!(cgt.discount_amount, Decimal::ZERO);
        assert_eq!(cgt.net_gain, cgt.gain_loss);
    }

    #[test]
    fn day_366_is_eligible() {
        let p = parcel("2025-01-10", dec!(100), dec!(30.00));
        let s = sell("2026-01-11", dec!(50), dec!(55.00), dec!(1));

        let cgt = calculate_cgt(&p, &s, dec!(50));

        assert_eq!(cgt.holding_days, 366);
        assert!(cgt.discount_eligible);
        assert_eq!(cgt.discount_amount, cgt.gain_loss * dec!(0.5));
    }

    #[test]
    fn loss_never_discounted() {
        // Held well over a year, but sold below cost
        let p = parcel("2022-01-10", dec!(100), dec!(60.00));
        let s = sell("2025-06-15", dec!(50), dec!(30.00), dec!(1));

        let cgt = calculate_cgt(&p, &s, dec!(50));

        assert!(cgt.gain_loss < Decimal::ZERO);
        assert!(!cgt.discount_eligible);
        assert_eq!(cgt.discount_amount, Decimal::ZERO);
        assert_eq!(cgt.net_gain, cgt.gain_loss);
    }

    #[test]
    fn same_day_sale_has_zero_holding_days() {
        let p = parcel("2025-01-10", dec!(100), dec!(30.00));
        let s = sell("2025-01-10", dec!(50), dec!(35.00), dec!(1));

        let cgt = calculate_cgt(&p, &s, dec!(50));

        assert_eq!(cgt.holding_days, 0);
        assert!(!cgt.discount_eligible);
    }

    #[test]
    fn sell_fx_rate_converts_proceeds() {
        // USD sale: proceeds = 200 * 5 * 1.60 = 1600 AUD
        let p = parcel("2024-01-10", dec!(10), dec!(226.50));
        let s = sell("2025-06-15", dec!(5), dec!(200.00), dec!(1.60));

        let cgt = calculate_cgt(&p, &s, dec!(5));

        assert_eq!(cgt.proceeds, dec!(1600.0000));
        assert_eq!(cgt.cost_base, dec!(1132.50));
    }

    #[test]
    fn sell_brokerage_does_not_reduce_proceeds() {
        let p = parcel("2024-01-10", dec!(100), dec!(40.00));
        let mut s = sell("2025-06-15", dec!(50), dec!(55.00), dec!(1));
        s.brokerage = dec!(100.00);

        let cgt = calculate_cgt(&p, &s, dec!(50));

        // Proceeds stay gross of the sell-side fee.
        assert_eq!(cgt.proceeds, dec!(2750.0000));
    }

    #[test]
    fn holding_days_across_leap_day() {
        let p = parcel("2024-01-10", dec!(100), dec!(40.00));
        let s = sell("2025-01-10", dec!(50), dec!(55.00), dec!(1));

        let cgt = calculate_cgt(&p, &s, dec!(50));

        // 2024 is a leap year, so a calendar year here is 366 days.
        assert_eq!(cgt.holding_days, 366);
        assert!(cgt.discount_eligible);
    }
}
