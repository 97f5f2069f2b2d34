//! Yahoo Finance v7 quote API.
//!
//! One GET returns every requested symbol. Yahoo has no official API and the
//! payload shape changes without notice, so undecodable bodies are retried
//! like transport errors.

use super::retry::{AttemptError, RetryPolicy, Sleeper, ThreadSleeper};
use super::transport::{HttpRequest, HttpTransport};
use super::{fetch_with_retry, FetchError, QuoteBatch, QuoteSource, SourceKind};
use crate::domain::RawQuote;
use crate::normalize::FieldMap;
use serde::Deserialize;
use serde_json::{Map, Value};

pub const DEFAULT_ENDPOINT: &str = "https://query1.finance.yahoo.com/v7/finance/quote";

/// S&P 500, Dow, Nasdaq, FTSE 100, Nikkei 225, Hang Seng, DAX, CAC 40,
/// Shanghai Composite, Bovespa.
pub const DEFAULT_SYMBOLS: &[&str] = &[
    "^GSPC", "^DJI", "^IXIC", "^FTSE", "^N225", "^HSI", "^GDAXI", "^FCHI", "^SSEC", "^BVSP",
];

#[derive(Debug, Deserialize)]
struct QuoteEnvelope {
    #[serde(rename = "quoteResponse")]
    quote_response: QuoteResponse,
}

#[derive(Debug, Deserialize)]
struct QuoteResponse {
    #[serde(default)]
    result: Option<Vec<Map<String, Value>>>,
}

pub struct YahooQuoteSource {
    endpoint: String,
    transport: Box<dyn HttpTransport>,
    sleeper: Box<dyn Sleeper>,
    retry: RetryPolicy,
}

impl YahooQuoteSource {
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

    /// Quote URL with the symbols comma-joined and percent-encoded.
    fn quote_url(&self, symbols: &[String]) -> Result<String, FetchError> {
        let joined = symbols
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(",");
        if joined.is_empty() {
            return Err(FetchError::InvalidRequest(
                "the quote API needs at least one symbol".into(),
            ));
        }
        reqwest::Url::parse_with_params(&self.endpoint, [("symbols", joined.as_str())])
            .map(String::from)
            .map_err(|e| FetchError::InvalidRequest(format!("bad endpoint '{}': {e}", self.endpoint)))
    }

    fn decode(body: &str) -> Result<Vec<RawQuote>, AttemptError> {
        let envelope: QuoteEnvelope = serde_json::from_str(body)
            .map_err(|e| AttemptError::Transient(format!("undecodable quote payload: {e}")))?;
        let quotes: Vec<RawQuote> = envelope
            .quote_response
            .result
            .unwrap_or_default()
            .into_iter()
            .map(RawQuote::from_map)
            .collect();
        if quotes.is_empty() {
            return Err(AttemptError::Fatal(FetchError::EmptyUpstream {
                kind: SourceKind::YahooQuote,
            }));
        }
        Ok(quotes)
    }
}

impl QuoteSource for YahooQuoteSource {
    fn kind(&self) -> SourceKind {
        SourceKind::YahooQuote
    }

    fn fetch(&self, symbols: &[String]) -> Result<QuoteBatch, FetchError> {
        let request = HttpRequest::get(self.quote_url(symbols)?).header("Accept", "application/json");
        let quotes = fetch_with_retry(
            self.transport.as_ref(),
            self.sleeper.as_ref(),
            &self.retry,
            &request,
            SourceKind::YahooQuote,
            Self::decode,
        )?;
        Ok(QuoteBatch {
            quotes,
            field_map: FieldMap::yahoo(),
            source: SourceKind::YahooQuote,
        })
    }
}
