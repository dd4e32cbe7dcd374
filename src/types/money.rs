//! Monetary amount handling
//!
//! Balances and amounts are kept at two decimal places. Amounts with more
//! precision are truncated (never rounded) before use.

use super::error::LedgerError;
use rust_decimal::Decimal;

/// Number of decimal places kept for balances and amounts
pub const MONEY_SCALE: u32 = 2;

/// A zero balance at money scale (`0.00`)
pub fn zero() -> Decimal {
    Decimal::new(0, MONEY_SCALE)
}

/// Truncate an amount to two decimal places and pad it to exactly two
pub fn to_money(amount: Decimal) -> Decimal {
    let mut value = amount.trunc_with_scale(MONEY_SCALE);
    value.rescale(MONEY_SCALE);
    value
}

/// Validate that an amount is strictly positive after truncation
///
/// # Arguments
///
/// * `field` - Input field name reported on failure
/// * `amount` - The raw amount supplied by the caller
///
/// # Returns
///
/// * `Ok(Decimal)` - The truncated amount with scale 2
/// * `Err(LedgerError::ValidationError)` - If the truncated amount is zero or negative
pub fn positive_amount(field: &str, amount: Decimal) -> Result<Decimal, LedgerError> {
    let value = to_money(amount);
    if value <= Decimal::ZERO {
        return Err(LedgerError::validation(
            field,
            format!("must be a positive amount, got {amount}"),
        ));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Decimal::new(30, 0), "30.00")]
    #[case(Decimal::new(12999, 3), "12.99")]
    #[case(Decimal::new(5, 1), "0.50")]
    fn test_to_money_truncates_and_pads(#[case] input: Decimal, #[case] expected: &str) {
        assert_eq!(to_money(input).to_string(), expected);
    }

    #[rstest]
    #[case::zero(Decimal::ZERO)]
    #[case::negative(Decimal::new(-100, 2))]
    #[case::truncates_to_zero(Decimal::new(9, 3))]
    fn test_positive_amount_rejects(#[case] input: Decimal) {
        let result = positive_amount("amount", input);
        assert!(matches!(
            result,
            Err(LedgerError::ValidationError { ref field, .. }) if field == "amount"
        ));
    }

    #[test]
    fn test_zero_has_money_scale() {
        assert_eq!(zero().to_string(), "0.00");
    }
}
