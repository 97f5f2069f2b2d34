//! Quote sources and the shared fetch machinery.
//!
//! The `QuoteSource` trait abstracts over upstreams (Yahoo quote API, the
//! charting-site scanner, a static HTML table) so the pipeline can pick one
//! per run and tests can drive any of them through a scripted transport.

pub mod html_table;
pub mod retry;
pub mod scanner;
pub mod testing;
pub mod transport;
pub mod yahoo;

pub use html_table::HtmlTableSource;
pub use retry::{retry_with_backoff, AttemptError, RetryPolicy, Sleeper, ThreadSleeper};
pub use scanner::ScannerSource;
pub use transport::{
    HttpMethod, HttpReply, HttpRequest, HttpSettings, HttpTransport, ReqwestTransport,
    TransportFailure,
};
pub use yahoo::YahooQuoteSource;

use crate::domain::RawQuote;
use crate::normalize::FieldMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

/// Which upstream a batch came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SourceKind {
    #[default]
    #[serde(rename = "yahoo")]
    YahooQuote,
    #[serde(rename = "scanner")]
    Scanner,
    #[serde(rename = "html")]
    HtmlTable,
}

impl SourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SourceKind::YahooQuote => "yahoo",
            SourceKind::Scanner => "scanner",
            SourceKind::HtmlTable => "html",
        }
    }

    /// Symbols requested when the configuration names none.
    ///
    /// The HTML table has no per-symbol filter, so its list is empty.
    pub fn default_symbols(self) -> Vec<String> {
        let list: &[&str] = match self {
            SourceKind::YahooQuote => yahoo::DEFAULT_SYMBOLS,
            SourceKind::Scanner => scanner::DEFAULT_TICKERS,
            SourceKind::HtmlTable => &[],
        };
        list.iter().map(|s| s.to_string()).collect()
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "yahoo" => Ok(SourceKind::YahooQuote),
            "scanner" => Ok(SourceKind::Scanner),
            "html" => Ok(SourceKind::HtmlTable),
            other => Err(format!(
                "unknown source '{other}' (expected yahoo, scanner or html)"
            )),
        }
    }
}

/// Raw quotes from one successful fetch, with the map needed to read them.
#[derive(Debug, Clone)]
pub struct QuoteBatch {
    pub quotes: Vec<RawQuote>,
    pub field_map: FieldMap,
    pub source: SourceKind,
}

/// Errors that end a fetch.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed after {attempts} attempt(s): {message}")]
    Transport { attempts: u32, message: String },

    #[error("{kind} returned no quotes")]
    EmptyUpstream { kind: SourceKind },

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// A market data upstream.
///
/// Implementations retry transient failures internally and only return once
/// they have records or a final error.
pub trait QuoteSource: Send + Sync {
    fn kind(&self) -> SourceKind;

    fn fetch(&self, symbols: &[String]) -> Result<QuoteBatch, FetchError>;
}

/// Send `request` under the retry policy and decode the first usable reply.
///
/// Transport failures, non-2xx statuses and undecodable bodies are retried.
/// An empty 2xx body is final.
pub(crate) fn fetch_with_retry<T>(
    transport: &dyn HttpTransport,
    sleeper: &dyn Sleeper,
    policy: &RetryPolicy,
    request: &HttpRequest,
    kind: SourceKind,
    decode: impl Fn(&str) -> Result<T, AttemptError>,
) -> Result<T, FetchError> {
    retry_with_backoff(policy, sleeper, |attempt| {
        debug!(source = %kind, attempt, url = %request.url, "sending request");
        let reply = transport
            .send(request)
            .map_err(|e| AttemptError::Transient(e.to_string()))?;

        if !reply.is_success() {
            return Err(AttemptError::Transient(format!(
                "HTTP {} from {kind}",
                reply.status
            )));
        }
        if reply.body.trim().is_empty() {
            return Err(AttemptError::Fatal(FetchError::EmptyUpstream { kind }));
        }
        decode(&reply.body)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::testing::{RecordingSleeper, ScriptedTransport};
    use std::time::Duration;

    fn policy() -> RetryPolicy {
        RetryPolicy::new(3, Duration::from_millis(10))
    }

    fn echo(body: &str) -> Result<String, AttemptError> {
        Ok(body.to_string())
    }

    #[test]
    fn source_kind_parses_and_displays() {
        assert_eq!("yahoo".parse::<SourceKind>().unwrap(), SourceKind::YahooQuote);
        assert_eq!(" Scanner ".parse::<SourceKind>().unwrap(), SourceKind::Scanner);
        assert_eq!("html".parse::<SourceKind>().unwrap(), SourceKind::HtmlTable);
        assert!("bloomberg".parse::<SourceKind>().is_err());
        assert_eq!(SourceKind::HtmlTable.to_string(), "html");
    }

    #[test]
    fn default_symbols_per_source() {
        assert_eq!(SourceKind::YahooQuote.default_symbols().len(), 10);
        assert_eq!(SourceKind::Scanner.default_symbols().len(), 10);
        assert!(SourceKind::HtmlTable.default_symbols().is_empty());
        assert_eq!(SourceKind::YahooQuote.default_symbols()[0], "^GSPC");
    }

    #[test]
    fn non_2xx_is_retried() {
        let transport = ScriptedTransport::new()
            .reply(503, "busy")
            .reply(200, "payload");
        let sleeper = RecordingSleeper::new();
        let req = HttpRequest::get("http://example.test");
        let out = fetch_with_retry(&transport, &sleeper, &policy(), &req, SourceKind::YahooQuote, echo);
        assert_eq!(out.unwrap(), "payload");
        assert_eq!(sleeper.delays(), vec![Duration::from_millis(10)]);
    }

    #[test]
    fn empty_body_is_final() {
        let transport = ScriptedTransport::new().reply(200, "  \n").reply(200, "late");
        let sleeper = RecordingSleeper::new();
        let req = HttpRequest::get("http://example.test");
        let out = fetch_with_retry(&transport, &sleeper, &policy(), &req, SourceKind::Scanner, echo);
        assert!(matches!(
            out,
            Err(FetchError::EmptyUpstream { kind: SourceKind::Scanner })
        ));
        assert!(sleeper.delays().is_empty());
        assert_eq!(transport.requests().lock().unwrap().len(), 1);
    }

    #[test]
    fn transport_errors_exhaust_into_transport_error() {
        let transport = ScriptedTransport::new().fail("dns").fail("dns").fail("connect refused");
        let sleeper = RecordingSleeper::new();
        let req = HttpRequest::get("http://example.test");
        let err = fetch_with_retry(&transport, &sleeper, &policy(), &req, SourceKind::YahooQuote, echo)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "request failed after 3 attempt(s): connect refused"
        );
    }
}
