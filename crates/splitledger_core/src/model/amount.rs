//! Decimal amount helpers.
//!
//! Amounts are persisted as decimal strings with two fraction digits
//! (`"30.00"`). Arithmetic happens on [`Decimal`] so no binary float drift
//! enters the ledger.

use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

/// Parses a plain decimal string such as `"30"`, `"12.5"`, or `" 0.10 "`.
pub fn parse_amount(raw: &str) -> Option<Decimal> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    Decimal::from_str(trimmed).ok()
}

/// Parses an amount and keeps it only when strictly greater than zero.
pub fn parse_positive_amount(raw: &str) -> Option<Decimal> {
    parse_amount(raw).filter(|value| *value > Decimal::ZERO)
}

/// Rounds half away from zero to two decimals and renders exactly two digits.
pub fn format_amount(value: Decimal) -> String {
    let mut rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded.to_string()
}

/// Even share of `total` for `people` heads, rounded to two decimals.
///
/// Returns zero for zero heads. The shares may not add back up to `total`.
pub fn even_share(total: Decimal, people: usize) -> Decimal {
    if people == 0 {
        return Decimal::ZERO;
    }
    (total / Decimal::from(people as u64))
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
mod tests {
    use super::{even_share, format_amount, parse_amount, parse_positive_amount};
    use rust_decimal::Decimal;

    #[test]
    fn format_pads_and_rounds() {
        assert_eq!(format_amount(Decimal::from(30)), "30.00");
        assert_eq!(format_amount(parse_amount("12.5").unwrap()), "12.50");
        assert_eq!(format_amount(parse_amount("0.005").unwrap()), "0.01");
        assert_eq!(format_amount(parse_amount("2.344").unwrap()), "2.34");
    }

    #[test]
    fn positive_amount_rejects_zero_negative_and_garbage() {
        assert!(parse_positive_amount("0").is_none());
        assert!(parse_positive_amount("-4").is_none());
        assert!(parse_positive_amount("abc").is_none());
        assert!(parse_positive_amount("").is_none());
        assert_eq!(parse_positive_amount(" 7.25 "), parse_amount("7.25"));
    }

    #[test]
    fn even_share_tolerates_drift() {
        let share = even_share(Decimal::from(10), 3);
        assert_eq!(format_amount(share), "3.33");
        assert_eq!(even_share(Decimal::from(10), 0), Decimal::ZERO);
    }
}
