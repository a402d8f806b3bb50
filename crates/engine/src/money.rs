//! Conversions between API amounts and stored minor units.
//!
//! Amounts travel through the engine as [`Decimal`] and are stored as
//! **integer cents** (`i64`) so that SQL aggregates stay exact.
//!
//! ```rust
//! use engine::money::{from_minor, to_minor};
//! use rust_decimal::Decimal;
//!
//! let amount = Decimal::new(1234, 2);
//! assert_eq!(to_minor(amount, "amount").unwrap(), 1234);
//! assert_eq!(from_minor(1234), amount);
//! ```

use rust_decimal::{Decimal, prelude::ToPrimitive};

use crate::{EngineError, ResultEngine};

const SCALE: u32 = 2;

/// Converts a positive decimal amount to cents.
///
/// Rejects zero, negative amounts and amounts with more than two fractional
/// digits. `field` names the offending input in the validation error.
pub fn to_minor(amount: Decimal, field: &str) -> ResultEngine<i64> {
    if amount <= Decimal::ZERO {
        return Err(EngineError::validation(field, "must be positive"));
    }
    let normalized = amount.normalize();
    if normalized.scale() > SCALE {
        return Err(EngineError::validation(
            field,
            "must have at most 2 decimal places",
        ));
    }
    normalized
        .checked_mul(Decimal::ONE_HUNDRED)
        .and_then(|cents| cents.trunc().to_i64())
        .ok_or_else(|| EngineError::validation(field, "is too large"))
}

/// Converts stored cents back to a decimal with two fractional digits.
pub fn from_minor(minor: i64) -> Decimal {
    Decimal::new(minor, SCALE)
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn converts_whole_and_fractional_amounts() {
        assert_eq!(to_minor(dec!(10), "amount").unwrap(), 1000);
        assert_eq!(to_minor(dec!(10.5), "amount").unwrap(), 1050);
        assert_eq!(to_minor(dec!(0.01), "amount").unwrap(), 1);
        assert_eq!(to_minor(dec!(12.340), "amount").unwrap(), 1234);
    }

    #[test]
    fn rejects_non_positive_amounts() {
        assert_eq!(
            to_minor(Decimal::ZERO, "limit"),
            Err(EngineError::validation("limit", "must be positive"))
        );
        assert_eq!(
            to_minor(dec!(-5), "amount"),
            Err(EngineError::validation("amount", "must be positive"))
        );
    }

    #[test]
    fn rejects_sub_cent_precision() {
        assert_eq!(
            to_minor(dec!(12.345), "amount"),
            Err(EngineError::validation(
                "amount",
                "must have at most 2 decimal places"
            ))
        );
    }

    #[test]
    fn from_minor_keeps_two_decimals() {
        assert_eq!(from_minor(8000).to_string(), "80.00");
        assert_eq!(from_minor(1), dec!(0.01));
    }
}
