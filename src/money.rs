//! Amount parsing and currency formatting shared by every record type.

use std::sync::OnceLock;

use numfmt::{Formatter, Precision};
use serde_json::Value;

/// Parse a user-entered amount string.
///
/// Blank or malformed input coerces to zero rather than failing, matching
/// how stored records are decoded in [amount_from_value].
pub fn parse_amount(input: &str) -> f64 {
    input.trim().parse().unwrap_or(0.0)
}

/// Coerce a stored amount field to a number.
///
/// Amounts are stored as JSON numbers, but older records hold the raw form
/// string. Anything else (missing, null, objects) counts as zero.
pub fn amount_from_value(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(number)) => number.as_f64().unwrap_or(0.0),
        Some(Value::String(text)) => parse_amount(text),
        _ => 0.0,
    }
}

/// Format an amount in Brazilian real, e.g. `R$ 700.00`.
pub fn format_brl(number: f64) -> String {
    static POSITIVE_FMT: OnceLock<Formatter> = OnceLock::new();

    let positive_fmt = POSITIVE_FMT.get_or_init(|| {
        Formatter::currency("R$ ")
            .unwrap()
            .precision(Precision::Decimals(2))
    });

    static NEGATIVE_FMT: OnceLock<Formatter> = OnceLock::new();

    let negative_fmt = NEGATIVE_FMT.get_or_init(|| {
        Formatter::currency("-R$ ")
            .unwrap()
            .precision(Precision::Decimals(2))
    });

    let mut formatted_string = if number < 0.0 {
        negative_fmt.fmt_string(number.abs())
    } else if number > 0.0 {
        positive_fmt.fmt_string(number)
    } else {
        // Zero is hardcoded as "0", so we must specify the formatted string for zero
        "R$ 0.00".to_owned()
    };

    // numfmt omits the last trailing zero, so we must add it ourselves
    // For example, "12.30" is rendered as "12.3" so we append "0".
    if formatted_string.as_bytes()[formatted_string.len() - 3] != b'.' {
        formatted_string = format!("{formatted_string}0");
    }

    formatted_string
}

#[cfg(test)]
mod parse_amount_tests {
    use super::parse_amount;

    #[test]
    fn parses_plain_decimal() {
        assert_eq!(parse_amount("12.5"), 12.5);
    }

    #[test]
    fn trims_surrounding_whitespace() {
        assert_eq!(parse_amount(" 3 "), 3.0);
    }

    #[test]
    fn blank_input_is_zero() {
        assert_eq!(parse_amount(""), 0.0);
        assert_eq!(parse_amount("   "), 0.0);
    }

    #[test]
    fn malformed_input_is_zero() {
        assert_eq!(parse_amount("abc"), 0.0);
    }
}

#[cfg(test)]
mod amount_from_value_tests {
    use serde_json::json;

    use super::amount_from_value;

    #[test]
    fn reads_json_numbers() {
        assert_eq!(amount_from_value(Some(&json!(700.0))), 700.0);
    }

    #[test]
    fn reads_numeric_strings() {
        assert_eq!(amount_from_value(Some(&json!("42.5"))), 42.5);
    }

    #[test]
    fn missing_and_null_are_zero() {
        assert_eq!(amount_from_value(None), 0.0);
        assert_eq!(amount_from_value(Some(&serde_json::Value::Null)), 0.0);
    }
}
