/*
[INPUT]:  Atom strings, human-readable values and token decimals
[OUTPUT]: Exact decimal conversions and display strings
[POS]:    Formatting layer - atoms <-> display values
[UPDATE]: When display rules or precision limits change
*/

use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};

use crate::http::{ExchangeError, Result};

/// Largest scale a `Decimal` can carry
const MAX_DECIMALS: u32 = 28;

/// Display precision cap for prices and sizes
const DISPLAY_DECIMALS: u32 = 8;

/// Prices at or above this threshold are shown with two decimals
const LARGE_PRICE_THRESHOLD: Decimal = Decimal::ONE_THOUSAND;

/// Convert an integer atom string into its display value.
///
/// `to_display_value("110000500000", 6)` is `110000.5`.
pub fn to_display_value(atoms: &str, decimals: u32) -> Result<Decimal> {
    check_decimals(decimals)?;
    let raw: i128 = atoms
        .trim()
        .parse()
        .map_err(|_| ExchangeError::validation(format!("invalid atom amount {atoms:?}")))?;
    let value = Decimal::try_from_i128_with_scale(raw, decimals).map_err(|err| {
        ExchangeError::validation(format!("atom amount {atoms} out of range: {err}"))
    })?;
    Ok(value.normalize())
}

/// Convert a display value into atoms, truncating digits past `decimals`.
pub fn to_atoms(value: &str, decimals: u32) -> Result<String> {
    check_decimals(decimals)?;
    let parsed = parse_decimal(value)?;
    let factor = Decimal::try_from_i128_with_scale(10_i128.pow(decimals), 0)
        .map_err(|err| ExchangeError::validation(err.to_string()))?;
    let scaled = parsed
        .checked_mul(factor)
        .ok_or_else(|| ExchangeError::validation(format!("value {value} overflows atoms")))?;
    Ok(scaled.trunc().normalize().to_string())
}

/// Round to at most `max_decimals`, drop trailing zeros and group thousands.
pub fn format_number(value: Decimal, max_decimals: u32) -> String {
    let rounded = value
        .round_dp_with_strategy(max_decimals, RoundingStrategy::MidpointAwayFromZero)
        .normalize();
    if rounded.is_zero() {
        return "0".to_string();
    }

    let text = rounded.abs().to_string();
    let (int_part, frac_part) = match text.split_once('.') {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (text.as_str(), None),
    };

    let mut out = String::with_capacity(text.len() + text.len() / 3 + 1);
    if rounded.is_sign_negative() {
        out.push('-');
    }
    out.push_str(&group_thousands(int_part));
    if let Some(frac) = frac_part {
        out.push('.');
        out.push_str(frac);
    }
    out
}

/// Display an atom price; large prices keep two decimals.
pub fn format_price(atoms: &str, decimals: u32) -> Result<String> {
    let value = to_display_value(atoms, decimals)?;
    let places = if value.abs() >= LARGE_PRICE_THRESHOLD {
        2
    } else {
        decimals.min(DISPLAY_DECIMALS)
    };
    Ok(format_number(value, places))
}

pub fn format_size(atoms: &str, decimals: u32) -> Result<String> {
    let value = to_display_value(atoms, decimals)?;
    Ok(format_number(value, decimals.min(DISPLAY_DECIMALS)))
}

fn parse_decimal(value: &str) -> Result<Decimal> {
    let trimmed = value.trim();
    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .map_err(|_| ExchangeError::validation(format!("invalid decimal value {value:?}")))
}

fn check_decimals(decimals: u32) -> Result<()> {
    if decimals > MAX_DECIMALS {
        return Err(ExchangeError::validation(format!(
            "{decimals} decimals exceeds supported precision of {MAX_DECIMALS}"
        )));
    }
    Ok(())
}

fn group_thousands(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (len - idx) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn dec(value: &str) -> Decimal {
        Decimal::from_str(value).expect("decimal literal")
    }

    #[test]
    fn atoms_and_display_agree_for_price() {
        let atoms = to_atoms("110000.50", 6).expect("to_atoms");
        assert_eq!(atoms, "110000500000");

        let display = to_display_value(&atoms, 6).expect("to_display_value");
        assert_eq!(display, dec("110000.50"));
    }

    #[rstest]
    #[case("1.23456789", 6, "1234567")]
    #[case("0.5", 18, "500000000000000000")]
    #[case("42", 0, "42")]
    #[case("1e3", 2, "100000")]
    fn to_atoms_truncates(#[case] value: &str, #[case] decimals: u32, #[case] expected: &str) {
        assert_eq!(to_atoms(value, decimals).expect("to_atoms"), expected);
    }

    #[rstest]
    #[case(dec("1000.0"), 8, "1,000")]
    #[case(dec("110000.50"), 8, "110,000.5")]
    #[case(dec("0.00000001"), 8, "0.00000001")]
    #[case(dec("-1234567.891"), 2, "-1,234,567.89")]
    #[case(dec("0.125"), 2, "0.13")]
    #[case(dec("-0.001"), 2, "0")]
    fn format_number_cases(#[case] value: Decimal, #[case] places: u32, #[case] expected: &str) {
        assert_eq!(format_number(value, places), expected);
    }

    #[rstest]
    #[case("110000500000", 6, "110,000.5")]
    #[case("1000000000", 6, "1,000")]
    #[case("123456789", 8, "1.23456789")]
    #[case("1", 18, "0")]
    fn format_price_cases(#[case] atoms: &str, #[case] decimals: u32, #[case] expected: &str) {
        assert_eq!(format_price(atoms, decimals).expect("format_price"), expected);
    }

    #[test]
    fn format_size_caps_precision() {
        assert_eq!(format_size("50000000", 8).expect("format_size"), "0.5");
        assert_eq!(format_size("1234567890123", 12).expect("format_size"), "1.23456789");
    }

    #[test]
    fn invalid_inputs_are_validation_errors() {
        assert!(matches!(
            to_display_value("12.5", 6),
            Err(ExchangeError::Validation(_))
        ));
        assert!(matches!(to_atoms("abc", 6), Err(ExchangeError::Validation(_))));
        assert!(matches!(
            to_display_value("1", 40),
            Err(ExchangeError::Validation(_))
        ));
    }
}
