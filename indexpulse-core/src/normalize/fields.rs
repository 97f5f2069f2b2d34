//! Field maps: where each canonical field lives in a source's raw quote.
//!
//! JSON sources have fixed keys, so their maps are constants. Table sources
//! only know their column headers at fetch time, so their map is built by
//! fuzzy-matching header text against candidate names.

use crate::domain::RawQuote;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};

/// Canonical fields a source may provide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Symbol,
    FullName,
    Price,
    ChangeAmount,
    ChangePct,
    PreviousClose,
    DayHigh,
    DayLow,
}

/// How a source expresses percent change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PercentConvention {
    /// `0.52` means 0.52 %.
    #[default]
    Percent,
    /// `0.0052` means 0.52 %; multiplied by 100 during normalization.
    Fraction,
}

impl PercentConvention {
    pub fn to_percent(self, value: f64) -> f64 {
        match self {
            PercentConvention::Percent => value,
            PercentConvention::Fraction => value * 100.0,
        }
    }
}

/// Header candidates in resolution order. A header claimed by an earlier
/// field is not offered to later ones, so `Change %` never doubles as the
/// change amount and `Prev Close` never doubles as the price.
const HEADER_CANDIDATES: &[(Field, &[&str])] = &[
    (Field::ChangePct, &["%", "pct", "percent"]),
    (Field::ChangeAmount, &["chg", "change"]),
    (Field::PreviousClose, &["prev", "previous"]),
    (Field::Symbol, &["symbol", "ticker", "code"]),
    (Field::FullName, &["name", "index", "description"]),
    (Field::Price, &["last", "price", "close", "value"]),
    (Field::DayHigh, &["high"]),
    (Field::DayLow, &["low"]),
];

/// Mapping from canonical field to ordered candidate raw keys.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FieldMap {
    keys: BTreeMap<Field, Vec<String>>,
    percent: PercentConvention,
}

impl FieldMap {
    pub fn new(percent: PercentConvention) -> Self {
        Self {
            keys: BTreeMap::new(),
            percent,
        }
    }

    /// Add candidate keys for `field`, tried in the given order.
    pub fn with(mut self, field: Field, keys: &[&str]) -> Self {
        self.keys
            .entry(field)
            .or_default()
            .extend(keys.iter().map(|k| k.to_string()));
        self
    }

    pub fn keys(&self, field: Field) -> &[String] {
        self.keys.get(&field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn percent(&self) -> PercentConvention {
        self.percent
    }

    /// First non-null value among the candidates for `field`.
    pub fn lookup<'a>(&self, raw: &'a RawQuote, field: Field) -> Option<&'a Value> {
        self.keys(field).iter().find_map(|k| raw.get(k))
    }

    /// First non-blank textual value among the candidates for `field`.
    pub fn lookup_text(&self, raw: &RawQuote, field: Field) -> Option<String> {
        self.keys(field).iter().find_map(|k| match raw.get(k)? {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
    }

    /// Yahoo Finance v7 quote API.
    pub fn yahoo() -> Self {
        Self::new(PercentConvention::Percent)
            .with(Field::Symbol, &["symbol"])
            .with(Field::FullName, &["shortName", "longName"])
            .with(Field::Price, &["regularMarketPrice"])
            .with(Field::ChangeAmount, &["regularMarketChange"])
            .with(Field::ChangePct, &["regularMarketChangePercent"])
            .with(Field::PreviousClose, &["regularMarketPreviousClose"])
            .with(Field::DayHigh, &["regularMarketDayHigh"])
            .with(Field::DayLow, &["regularMarketDayLow"])
    }

    /// Charting-site scanner rows flattened to `s`, `d[0]`, `d[1]`, ...
    ///
    /// Column positions match `scanner::SCAN_COLUMNS`.
    pub fn scanner() -> Self {
        Self::new(PercentConvention::Percent)
            .with(Field::Symbol, &["s"])
            .with(Field::FullName, &["d[0]"])
            .with(Field::Price, &["d[1]"])
            .with(Field::ChangePct, &["d[2]"])
            .with(Field::ChangeAmount, &["d[3]"])
            .with(Field::DayHigh, &["d[4]"])
            .with(Field::DayLow, &["d[5]"])
            .with(Field::PreviousClose, &["d[6]"])
    }

    /// Build a map from table headers by case-insensitive substring match.
    ///
    /// When no symbol-like header exists, the name column doubles as symbol.
    pub fn from_headers(headers: &[String], percent: PercentConvention) -> Self {
        let lowered: Vec<String> = headers.iter().map(|h| h.to_lowercase()).collect();
        let mut claimed: HashSet<usize> = HashSet::new();
        let mut map = Self::new(percent);

        for (field, candidates) in HEADER_CANDIDATES {
            if let Some(idx) = find_column(&lowered, candidates, &claimed) {
                claimed.insert(idx);
                map.keys.insert(*field, vec![headers[idx].clone()]);
            }
        }

        if map.keys(Field::Symbol).is_empty() {
            if let Some(name_keys) = map.keys.get(&Field::FullName).cloned() {
                map.keys.insert(Field::Symbol, name_keys);
            }
        }

        map
    }
}

/// Index of the first unclaimed header containing a candidate.
/// Earlier candidates win over later ones.
fn find_column(lowered: &[String], candidates: &[&str], claimed: &HashSet<usize>) -> Option<usize> {
    candidates.iter().find_map(|candidate| {
        lowered
            .iter()
            .enumerate()
            .find(|(i, h)| !claimed.contains(i) && h.contains(candidate))
            .map(|(i, _)| i)
    })
}
