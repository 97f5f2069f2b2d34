//! Charting-site scanner endpoint.
//!
//! A POST with a ticker list (or a market-wide filter) and a column list
//! returns `data[] = {s, d: [...]}` rows, with `d` ordered like
//! [`SCAN_COLUMNS`]. Rows are flattened to keys `s`, `d[0]`, `d[1]`, ...

use super::retry::{AttemptError, RetryPolicy, Sleeper, ThreadSleeper};
use super::transport::{HttpRequest, HttpTransport};
use super::{fetch_with_retry, FetchError, QuoteBatch, QuoteSource, SourceKind};
use crate::domain::RawQuote;
use crate::normalize::FieldMap;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

pub const DEFAULT_ENDPOINT: &str = "https://scanner.tradingview.com/global/scan";

/// Requested columns; positions must agree with `FieldMap::scanner`.
pub const SCAN_COLUMNS: &[&str] = &[
    "description",
    "close",
    "change",
    "change_abs",
    "high",
    "low",
    "close[1]",
];

/// Same ten indices as the Yahoo defaults, in exchange-prefixed form.
pub const DEFAULT_TICKERS: &[&str] = &[
    "SP:SPX",
    "DJ:DJI",
    "NASDAQ:IXIC",
    "TVC:UKX",
    "TVC:NI225",
    "TVC:HSI",
    "XETR:DAX",
    "EURONEXT:PX1",
    "SSE:000001",
    "BMFBOVESPA:IBOV",
];

/// Row cap for a market-wide scan.
const SCAN_RANGE: [usize; 2] = [0, 100];

/// Rows stay loose `Value`s so one malformed row cannot sink the payload.
#[derive(Debug, Deserialize)]
struct ScanResponse {
    #[serde(default)]
    data: Option<Vec<Value>>,
}

pub struct ScannerSource {
    endpoint: String,
    transport: Box<dyn HttpTransport>,
    sleeper: Box<dyn Sleeper>,
    retry: RetryPolicy,
}

impl ScannerSource {
    pub fn new(endpoint: impl Into<String>, transport: Box<dyn HttpTransport>) -> Self {
        Self {
            endpoint: endpoint.into(),
            transport,
            sleeper: Box::new(ThreadSleeper),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_sleeper(mut self, sleeper: Box<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Scan request body. An empty ticker list scans every index.
    fn scan_body(symbols: &[String]) -> Value {
        let tickers: Vec<&str> = symbols
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect();

        if tickers.is_empty() {
            json!({
                "filter": [{"left": "type", "operation": "equal", "right": "index"}],
                "columns": SCAN_COLUMNS,
                "sort": {"sortBy": "change", "sortOrder": "desc"},
                "range": SCAN_RANGE,
            })
        } else {
            json!({
                "symbols": {"tickers": tickers, "query": {"types": []}},
                "columns": SCAN_COLUMNS,
            })
        }
    }

    fn decode(body: &str) -> Result<Vec<RawQuote>, AttemptError> {
        let resp: ScanResponse = serde_json::from_str(body)
            .map_err(|e| AttemptError::Transient(format!("undecodable scan payload: {e}")))?;
        let quotes: Vec<RawQuote> = resp
            .data
            .unwrap_or_default()
            .into_iter()
            .filter_map(flatten_row)
            .collect();
        if quotes.is_empty() {
            return Err(AttemptError::Fatal(FetchError::EmptyUpstream {
                kind: SourceKind::Scanner,
            }));
        }
        Ok(quotes)
    }
}

/// `None` only for rows that are not objects. A missing `s` or a `d` that is
/// not an array leaves those keys absent.
fn flatten_row(row: Value) -> Option<RawQuote> {
    let mut fields = match row {
        Value::Object(fields) => fields,
        other => {
            debug!(row = %other, "skipping non-object scan row");
            return None;
        }
    };
    let mut raw = RawQuote::new();
    if let Some(symbol) = fields.remove("s") {
        raw.insert("s", symbol);
    }
    if let Some(Value::Array(values)) = fields.remove("d") {
        for (i, v) in values.into_iter().enumerate() {
            raw.insert(format!("d[{i}]"), v);
        }
    }
    Some(raw)
}

impl QuoteSource for ScannerSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Scanner
    }

    fn fetch(&self, symbols: &[String]) -> Result<QuoteBatch, FetchError> {
        let body = serde_json::to_string(&Self::scan_body(symbols))
            .map_err(|e| FetchError::InvalidRequest(e.to_string()))?;
        let request = HttpRequest::post_json(self.endpoint.clone(), body);
        let quotes = fetch_with_retry(
            self.transport.as_ref(),
            self.sleeper.as_ref(),
            &self.retry,
            &request,
            SourceKind::Scanner,
            Self::decode,
        )?;
        Ok(QuoteBatch {
            quotes,
            field_map: FieldMap::scanner(),
            source: SourceKind::Scanner,
        })
    }
}
