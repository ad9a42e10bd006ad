//! Accounting amount parsing.
//!
//! Vendor exports write money the way a spreadsheet displays it:
//! `$1,234.56`, `(500.00)`, ` 12 `. [`parse_amount`] turns that text into a
//! [`Decimal`]; anything it cannot read is `None`, which the pipeline treats
//! as zero.

use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::{Decimal, RoundingStrategy};

/// Currency symbols stripped before parsing.
const CURRENCY_SYMBOLS: &[char] = &['$', '€', '£', '¥'];

/// Anything that cannot be part of a plain decimal number.
static NON_NUMERIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^0-9.\-]").unwrap());

/// Parse accounting text into an amount.
///
/// `(x)` means `-x`, even when the text inside also carries a minus sign.
///
/// ```ignore
/// assert_eq!(parse_amount("$1,234.56"), Some(dec!(1234.56)));
/// assert_eq!(parse_amount("(500)"), Some(dec!(-500)));
/// assert_eq!(parse_amount("12.5.6"), None);
/// ```
pub fn parse_amount(raw: &str) -> Option<Decimal> {
    let trimmed = raw.trim();
    let unsigned = trimmed.trim_start_matches(|c: char| CURRENCY_SYMBOLS.contains(&c) || c.is_whitespace());
    let parenthesized = unsigned.starts_with('(') && unsigned.ends_with(')');

    let cleaned: String = trimmed
        .chars()
        .filter(|c| !CURRENCY_SYMBOLS.contains(c) && !matches!(c, ',' | '(' | ')') && !c.is_whitespace())
        .collect();
    let cleaned = NON_NUMERIC.replace_all(&cleaned, "");

    let value: Decimal = cleaned.parse().ok()?;

    if parenthesized {
        Some(-value.abs())
    } else {
        Some(value)
    }
}

/// Parsed amount, zero when unparseable.
pub fn amount_or_zero(raw: &str) -> Decimal {
    parse_amount(raw).unwrap_or(Decimal::ZERO)
}

/// Round to cents, halves away from zero.
pub fn round_cents(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Fixed two-decimal text (`-12.50`). Zero is always `0.00`.
pub fn format_amount(value: Decimal) -> String {
    let rounded = round_cents(value);
    if rounded.is_zero() {
        return "0.00".to_string();
    }
    format!("{:.2}", rounded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_currency_and_thousands() {
        assert_eq!(parse_amount("$1,234.56"), Some(dec("1234.56")));
        assert_eq!(parse_amount("  1,000,000 "), Some(dec("1000000")));
        assert_eq!(parse_amount("€ 12.50"), Some(dec("12.50")));
    }

    #[test]
    fn test_parentheses_are_negative() {
        assert_eq!(parse_amount("(500)"), Some(dec("-500")));
        assert_eq!(parse_amount("$(1,250.10)"), Some(dec("-1250.10")));
        assert_eq!(parse_amount("(-5)"), Some(dec("-5")));
        assert_eq!(format_amount(amount_or_zero("(500)")), "-500.00");
    }

    #[test]
    fn test_plain_negative() {
        assert_eq!(parse_amount("-42.1"), Some(dec("-42.1")));
        assert_eq!(parse_amount("$-42.10"), Some(dec("-42.10")));
    }

    #[test]
    fn test_unparseable_falls_back_to_zero() {
        assert_eq!(parse_amount(""), None);
        assert_eq!(parse_amount("   "), None);
        assert_eq!(parse_amount("12.5.6"), None);
        assert_eq!(parse_amount("N/A"), None);
        assert_eq!(parse_amount("-"), None);
        assert_eq!(amount_or_zero("12.5.6"), Decimal::ZERO);
        assert_eq!(amount_or_zero(""), Decimal::ZERO);
    }

    #[test]
    fn test_stray_letters_removed() {
        assert_eq!(parse_amount("USD 19.99"), Some(dec("19.99")));
        assert_eq!(parse_amount("19.99 CR"), Some(dec("19.99")));
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(dec("100")), "100.00");
        assert_eq!(format_amount(dec("0.005")), "0.01");
        assert_eq!(format_amount(dec("-0.005")), "-0.01");
        assert_eq!(format_amount(dec("2.345")), "2.35");
        assert_eq!(format_amount(dec("-0.001")), "0.00");
        assert_eq!(format_amount(-Decimal::ZERO), "0.00");
        assert_eq!(format_amount(dec("1234.5")), "1234.50");
    }
}
