//! Raw quote → canonical record, with the change-metric fallback chain.
//!
//! Direct fields always win over derived ones:
//! 1. price: direct, else 0.0
//! 2. change amount: direct, else `price - previous_close`, else 0.0
//! 3. change percent: direct, else `change_amount / previous_close * 100`
//!    when the previous close is non-zero, else 0.0
//!
//! Rounding to two decimals happens once, after every derivation.

use super::fields::{Field, FieldMap};
use super::number::{parse_number, parse_optional, round2};
use crate::domain::{CanonicalRecord, DisplayValue, RawQuote};
use crate::fetch::QuoteBatch;
use serde_json::Value;

/// Normalize one raw quote using the source's field map.
pub fn normalize(raw: &RawQuote, map: &FieldMap) -> CanonicalRecord {
    let symbol = map.lookup_text(raw, Field::Symbol).unwrap_or_default();
    let full_name = map
        .lookup_text(raw, Field::FullName)
        .unwrap_or_else(|| symbol.clone());

    let price = parse_number(map.lookup(raw, Field::Price), 0.0);
    let prev_close = parse_optional(map.lookup(raw, Field::PreviousClose));

    let change_amount = match map.lookup(raw, Field::ChangeAmount) {
        Some(direct) => Some(parse_number(Some(direct), 0.0)),
        None => prev_close.map(|prev| price - prev),
    };

    let change_pct = parse_optional(map.lookup(raw, Field::ChangePct))
        .map(|pct| map.percent().to_percent(pct))
        .or_else(|| match (change_amount, prev_close) {
            (Some(amount), Some(prev)) if prev != 0.0 => Some(amount / prev * 100.0),
            _ => None,
        })
        .unwrap_or(0.0);

    CanonicalRecord {
        symbol,
        full_name,
        price: round2(price),
        change_amount: round2(change_amount.unwrap_or(0.0)),
        change_pct: round2(change_pct),
        day_high: display_value(map.lookup(raw, Field::DayHigh)),
        day_low: display_value(map.lookup(raw, Field::DayLow)),
    }
}

/// Normalize every quote in a batch, keeping source order.
pub fn normalize_batch(batch: &QuoteBatch) -> Vec<CanonicalRecord> {
    batch
        .quotes
        .iter()
        .map(|raw| normalize(raw, &batch.field_map))
        .collect()
}

fn display_value(value: Option<&Value>) -> DisplayValue {
    let Some(value) = value else {
        return DisplayValue::Empty;
    };
    match parse_optional(Some(value)) {
        Some(v) => DisplayValue::Number(round2(v)),
        None => match value {
            Value::String(s) if s.trim().is_empty() => DisplayValue::Empty,
            Value::String(s) => DisplayValue::Raw(s.trim().to_string()),
            other => DisplayValue::Raw(other.to_string()),
        },
    }
}
