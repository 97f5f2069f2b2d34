//! Lenient number parsing for quote fields.
//!
//! Upstream values arrive as JSON numbers, as strings with locale punctuation
//! (`"1,234.5"`, `"−3.2%"`, `"+0.52%"`), or not at all. Parsing never fails a
//! run: a bad field degrades to the caller's default and the reason is logged
//! at debug level.

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

/// Why a single field could not be turned into a number.
///
/// Contained inside normalization; never returned from a run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FieldParseError {
    #[error("field is missing")]
    Missing,

    #[error("unsupported value type: {0}")]
    Unsupported(&'static str),

    #[error("malformed number: {0:?}")]
    Malformed(String),

    #[error("non-finite number: {0}")]
    NonFinite(String),
}

/// Parse a raw field, reporting why it failed.
pub fn try_parse_number(value: Option<&Value>) -> Result<f64, FieldParseError> {
    let parsed = match value {
        None | Some(Value::Null) => return Err(FieldParseError::Missing),
        Some(Value::Number(n)) => n
            .as_f64()
            .ok_or_else(|| FieldParseError::Malformed(n.to_string()))?,
        Some(Value::String(s)) => parse_numeric_str(s)?,
        Some(Value::Bool(_)) => return Err(FieldParseError::Unsupported("bool")),
        Some(Value::Array(_)) => return Err(FieldParseError::Unsupported("array")),
        Some(Value::Object(_)) => return Err(FieldParseError::Unsupported("object")),
    };

    if parsed.is_finite() {
        Ok(parsed)
    } else {
        Err(FieldParseError::NonFinite(parsed.to_string()))
    }
}

/// Parse a raw field, substituting `default` on any failure.
pub fn parse_number(value: Option<&Value>, default: f64) -> f64 {
    parse_optional(value).unwrap_or(default)
}

/// Parse a raw field, returning `None` on any failure.
///
/// Failures other than a plain missing field are logged.
pub fn parse_optional(value: Option<&Value>) -> Option<f64> {
    match try_parse_number(value) {
        Ok(v) => Some(v),
        Err(FieldParseError::Missing) => None,
        Err(e) => {
            debug!(error = %e, "field parse fell back to default");
            None
        }
    }
}

/// Strip display punctuation from a numeric string and parse it.
pub fn parse_numeric_str(raw: &str) -> Result<f64, FieldParseError> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter_map(|c| match c {
            // thousands separators
            ',' | ' ' | '\'' | '\u{00A0}' | '\u{2009}' | '\u{202F}' => None,
            '%' | '+' => None,
            '\u{2212}' => Some('-'),
            other => Some(other),
        })
        .collect();

    if cleaned.is_empty() {
        return Err(FieldParseError::Missing);
    }

    cleaned
        .parse::<f64>()
        .map_err(|_| FieldParseError::Malformed(raw.to_string()))
}

/// Round to two decimal places for display. Never returns negative zero.
///
/// Magnitudes too large to scale by 100 are already integral and pass through.
pub fn round2(value: f64) -> f64 {
    if value.abs() > f64::MAX / 100.0 {
        return value;
    }
    let rounded = (value * 100.0).round() / 100.0;
    if !rounded.is_finite() {
        value
    } else if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn thousands_separator_is_removed() {
        assert_eq!(parse_number(Some(&json!("1,234.5")), 0.0), 1234.5);
    }

    #[test]
    fn unicode_minus_and_percent_sign() {
        assert_eq!(parse_number(Some(&json!("\u{2212}3.2%")), 0.0), -3.2);
    }

    #[test]
    fn explicit_plus_sign() {
        assert_eq!(parse_number(Some(&json!("+0.52%")), 0.0), 0.52);
    }

    #[test]
    fn none_and_null_yield_default() {
        assert_eq!(parse_number(None, 7.5), 7.5);
        assert_eq!(parse_number(Some(&Value::Null), -1.0), -1.0);
    }

    #[test]
    fn garbage_yields_default() {
        assert_eq!(parse_number(Some(&json!("abc")), 42.0), 42.0);
        assert_eq!(parse_number(Some(&json!("")), 3.0), 3.0);
        assert_eq!(parse_number(Some(&json!("   ")), 3.0), 3.0);
    }

    #[test]
    fn json_numbers_pass_through() {
        assert_eq!(parse_number(Some(&json!(5123)), 0.0), 5123.0);
        assert_eq!(parse_number(Some(&json!(-0.25)), 0.0), -0.25);
    }

    #[test]
    fn exotic_types_yield_default() {
        assert_eq!(parse_number(Some(&json!(true)), 1.5), 1.5);
        assert_eq!(parse_number(Some(&json!([1, 2])), 1.5), 1.5);
        assert_eq!(parse_number(Some(&json!({"raw": 1.0})), 1.5), 1.5);
    }

    #[test]
    fn non_finite_strings_are_rejected() {
        assert_eq!(
            try_parse_number(Some(&json!("NaN"))),
            Err(FieldParseError::NonFinite("NaN".into()))
        );
        assert_eq!(parse_number(Some(&json!("inf")), 0.0), 0.0);
    }

    #[test]
    fn locale_spaces_are_thousands_separators() {
        assert_eq!(parse_number(Some(&json!("38\u{202F}250.10")), 0.0), 38250.1);
        assert_eq!(parse_number(Some(&json!("12\u{00A0}000")), 0.0), 12000.0);
        assert_eq!(parse_number(Some(&json!("1'024.75")), 0.0), 1024.75);
    }

    #[test]
    fn error_kinds_are_reported() {
        assert_eq!(try_parse_number(None), Err(FieldParseError::Missing));
        assert_eq!(
            try_parse_number(Some(&json!(false))),
            Err(FieldParseError::Unsupported("bool"))
        );
        assert_eq!(
            try_parse_number(Some(&json!("12..3"))),
            Err(FieldParseError::Malformed("12..3".into()))
        );
    }

    #[test]
    fn round2_half_away_from_zero_and_no_negative_zero() {
        assert_eq!(round2(5.263157), 5.26);
        assert_eq!(round2(-1.005_1), -1.01);
        assert_eq!(round2(-0.001), 0.0);
        assert!(round2(-0.001).is_sign_positive());
    }

    #[test]
    fn round2_keeps_huge_values_finite() {
        assert_eq!(round2(1e307), 1e307);
        assert_eq!(round2(-f64::MAX), -f64::MAX);
        assert!(round2(1e306).is_finite());
    }
}
