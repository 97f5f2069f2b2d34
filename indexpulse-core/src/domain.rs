//! Domain types: canonical quotes, ranked rows, and run identity.

use chrono::{DateTime, SecondsFormat, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Number of top movers persisted per run.
pub const TOP_N: usize = 3;

/// A day high/low cell.
///
/// Sources supply these inconsistently, so a value that cannot be parsed is
/// passed through verbatim instead of being forced to a numeric default.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DisplayValue {
    Number(f64),
    Raw(String),
    #[default]
    Empty,
}

impl DisplayValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            DisplayValue::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, DisplayValue::Empty)
    }
}

impl fmt::Display for DisplayValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayValue::Number(v) => write!(f, "{v:.2}"),
            DisplayValue::Raw(s) => f.write_str(s),
            DisplayValue::Empty => Ok(()),
        }
    }
}

/// Loosely-typed quote exactly as a source delivered it.
///
/// Keys are source-native (`regularMarketPrice`, `d[1]`, a table header).
/// A JSON `null` is treated the same as an absent key.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawQuote {
    fields: Map<String, Value>,
}

impl RawQuote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.fields.insert(key.into(), value);
    }

    pub fn with(mut self, key: impl Into<String>, value: Value) -> Self {
        self.insert(key, value);
        self
    }

    /// Value for `key`, or `None` when absent or null.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key).filter(|v| !v.is_null())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// A quote after normalization. Every numeric field holds a concrete value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    pub symbol: String,
    pub full_name: String,
    pub price: f64,
    pub change_amount: f64,
    pub change_pct: f64,
    pub day_high: DisplayValue,
    pub day_low: DisplayValue,
}

impl CanonicalRecord {
    /// Record with only a symbol and change percent set; everything else defaulted.
    pub fn with_change_pct(symbol: impl Into<String>, change_pct: f64) -> Self {
        let symbol = symbol.into();
        Self {
            full_name: symbol.clone(),
            symbol,
            price: 0.0,
            change_amount: 0.0,
            change_pct,
            day_high: DisplayValue::Empty,
            day_low: DisplayValue::Empty,
        }
    }
}

/// Opaque per-run identifier (`run_` followed by 12 hex characters).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub String);

impl RunId {
    /// Fresh identifier from the thread-local RNG.
    pub fn generate() -> Self {
        Self::from_rng(&mut rand::thread_rng())
    }

    pub fn from_rng<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let token = rng.gen::<u64>() & 0xFFFF_FFFF_FFFF;
        Self(format!("run_{token:012x}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Metadata shared by every row of one run. Created once, then passed down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunContext {
    pub run_id: RunId,
    pub started_at: DateTime<Utc>,
}

impl RunContext {
    /// New context stamped with the current time, truncated to whole seconds.
    pub fn new() -> Self {
        Self::with(RunId::generate(), Utc::now())
    }

    pub fn with(run_id: RunId, started_at: DateTime<Utc>) -> Self {
        let started_at = DateTime::from_timestamp(started_at.timestamp(), 0).unwrap_or(started_at);
        Self { run_id, started_at }
    }

    /// ISO-8601 UTC timestamp with second precision, e.g. `2024-05-01T14:30:00Z`.
    pub fn timestamp(&self) -> String {
        self.started_at.to_rfc3339_opts(SecondsFormat::Secs, true)
    }
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new()
    }
}

/// A canonical record selected for output, with its run metadata and rank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedRecord {
    pub run_id: RunId,
    pub date_time_utc: String,
    pub rank: usize,
    #[serde(flatten)]
    pub record: CanonicalRecord,
}
