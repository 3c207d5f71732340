//! Rounding helpers shared by the production and stock computations.

use rust_decimal::{Decimal, RoundingStrategy};

/// Largest value of a `DECIMAL(18, 3)` quantity column.
pub const MAX_QUANTITY: Decimal = Decimal::from_parts(2_808_348_671, 232_830_643, 0, false, 3);
/// Largest value of a `DECIMAL(18, 4)` unit price or PMP column.
pub const MAX_PRICE: Decimal = Decimal::from_parts(2_808_348_671, 232_830_643, 0, false, 4);
/// Largest value of a `DECIMAL(18, 2)` amount column.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(2_808_348_671, 232_830_643, 0, false, 2);

/// Monetary amounts are stored with two decimals.
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Quantities (kg, litres, units) are stored with three decimals.
pub fn round_qty(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(3, RoundingStrategy::MidpointAwayFromZero)
}

/// Unit costs (PMP) keep four decimals.
pub fn round_cost(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(4, RoundingStrategy::MidpointAwayFromZero)
}

/// `part / whole * 100`, two decimals. An empty `whole` yields zero.
pub fn percent(part: Decimal, whole: Decimal) -> Decimal {
    if whole.is_zero() {
        return Decimal::ZERO;
    }
    round_money(part * Decimal::ONE_HUNDRED / whole)
}

/// `quantity * price` rounded to an amount, or `None` when the product
/// does not fit an amount column.
pub fn checked_amount(quantity: Decimal, price: Decimal) -> Option<Decimal> {
    quantity
        .checked_mul(price)
        .map(round_money)
        .filter(|amount| amount.abs() <= MAX_AMOUNT)
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn money_rounds_half_away_from_zero() {
        assert_eq!(round_money(dec!(2.345)), dec!(2.35));
        assert_eq!(round_money(dec!(-2.345)), dec!(-2.35));
        assert_eq!(round_money(dec!(2.344)), dec!(2.34));
    }

    #[test]
    fn qty_and_cost_precision() {
        assert_eq!(round_qty(dec!(1.23456)), dec!(1.235));
        assert_eq!(round_cost(dec!(0.123456)), dec!(0.1235));
    }

    #[test]
    fn percent_of_empty_whole_is_zero() {
        assert_eq!(percent(dec!(5), Decimal::ZERO), Decimal::ZERO);
    }

    #[test]
    fn percent_rounds_to_two_decimals() {
        assert_eq!(percent(dec!(1), dec!(3)), dec!(33.33));
        assert_eq!(percent(dec!(45), dec!(1500)), dec!(3.00));
    }

    #[test]
    fn column_limits_have_eighteen_digits() {
        assert_eq!(MAX_QUANTITY, dec!(999999999999999.999));
        assert_eq!(MAX_PRICE, dec!(99999999999999.9999));
        assert_eq!(MAX_AMOUNT, dec!(9999999999999999.99));
    }

    #[test]
    fn amount_is_rounded_product() {
        assert_eq!(checked_amount(dec!(3.333), dec!(0.3125)), Some(dec!(1.04)));
    }

    #[test]
    fn amount_out_of_range_is_none() {
        let huge = Decimal::from_i128_with_scale(10_i128.pow(20), 0);
        assert_eq!(checked_amount(huge, huge), None);
        assert_eq!(checked_amount(MAX_QUANTITY, MAX_PRICE), None);
        assert_eq!(checked_amount(dec!(1000), dec!(10000000000000)), None);
    }
}
