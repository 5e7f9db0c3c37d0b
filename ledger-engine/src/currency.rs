//! Currency minor-unit handling for monetary rounding

use rust_decimal::prelude::RoundingStrategy;
use rust_decimal::Decimal;

/// Number of minor-unit digits for an ISO-4217 currency code.
///
/// Unknown codes fall back to two decimal places, which covers every
/// currency the clinic network currently operates in.
pub fn minor_units(currency: &str) -> u32 {
    match currency {
        "CLP" | "JPY" | "KRW" | "PYG" | "VND" => 0,
        "BHD" | "KWD" | "OMR" | "TND" => 3,
        _ => 2,
    }
}

/// Round a monetary amount to the currency's minor unit.
///
/// All ledger arithmetic rounds half away from zero so that repeated
/// partial payments cannot drift the balance by a sub-unit remainder.
pub fn round_amount(amount: Decimal, currency: &str) -> Decimal {
    amount.round_dp_with_strategy(minor_units(currency), RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_minor_units_defaults_to_two() {
        assert_eq!(minor_units("MXN"), 2);
        assert_eq!(minor_units("USD"), 2);
        assert_eq!(minor_units("XXX"), 2);
    }

    #[test]
    fn test_zero_decimal_currencies() {
        assert_eq!(minor_units("CLP"), 0);
        assert_eq!(minor_units("JPY"), 0);
    }

    #[test]
    fn test_round_half_away_from_zero() {
        assert_eq!(round_amount(dec!(10.005), "MXN"), dec!(10.01));
        assert_eq!(round_amount(dec!(10.004), "MXN"), dec!(10.00));
        assert_eq!(round_amount(dec!(1500.5), "CLP"), dec!(1501));
    }
}
