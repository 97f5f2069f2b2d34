//! Static HTML table scraped from an index-quotes page.
//!
//! The first `<table>` is the payload. Header cell text becomes the raw keys
//! and the field map is resolved from those headers at fetch time. The page
//! already is the index list, so requested symbols are not used as a filter.

use super::retry::{AttemptError, RetryPolicy, Sleeper, ThreadSleeper};
use super::transport::{HttpRequest, HttpTransport};
use super::{fetch_with_retry, FetchError, QuoteBatch, QuoteSource, SourceKind};
use crate::domain::RawQuote;
use crate::normalize::{FieldMap, PercentConvention};
use regex::Regex;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::OnceLock;
use tracing::debug;

pub const DEFAULT_ENDPOINT: &str = "https://www.tradingview.com/markets/indices/quotes-major/";

// ─── Patterns ───────────────────────────────────────────────────────

fn table_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<table\b[^>]*>(.*?)</table>").expect("table regex"))
}

fn row_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<tr\b[^>]*>(.*?)</tr>").expect("row regex"))
}

fn cell_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?is)<(td|th)\b[^>]*>(.*?)</(?:td|th)>").expect("cell regex")
    })
}

fn tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<[^>]*>").expect("tag regex"))
}

fn numeric_entity_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"&#(x[0-9a-fA-F]+|[0-9]+);").expect("entity regex"))
}

// ─── Table parsing ──────────────────────────────────────────────────

/// One `<tr>`: cell texts and whether any cell was a `<th>`.
#[derive(Debug)]
struct Row {
    cells: Vec<String>,
    is_header: bool,
}

/// A decoded table: unique headers plus data rows keyed by header.
#[derive(Debug)]
pub struct ParsedTable {
    pub headers: Vec<String>,
    pub rows: Vec<RawQuote>,
}

/// Extract the first table of `html`. `None` when the page has no table.
pub fn parse_first_table(html: &str) -> Option<ParsedTable> {
    let table = table_re().captures(html)?.get(1)?.as_str();

    let rows: Vec<Row> = row_re()
        .captures_iter(table)
        .filter_map(|c| c.get(1))
        .map(|m| parse_row(m.as_str()))
        .filter(|r| !r.cells.is_empty())
        .collect();

    let header_idx = rows.iter().position(|r| r.is_header).unwrap_or(0);
    let headers = unique_headers(&rows.get(header_idx)?.cells);

    let data = rows
        .iter()
        .skip(header_idx + 1)
        .filter(|r| r.cells.iter().any(|c| !c.is_empty()))
        .map(|r| {
            let mut raw = RawQuote::new();
            for (header, cell) in headers.iter().zip(&r.cells) {
                raw.insert(header.clone(), Value::String(cell.clone()));
            }
            raw
        })
        .collect();

    Some(ParsedTable {
        headers,
        rows: data,
    })
}

fn parse_row(inner: &str) -> Row {
    let mut is_header = false;
    let cells = cell_re()
        .captures_iter(inner)
        .map(|c| {
            if c.get(1).is_some_and(|t| t.as_str().eq_ignore_ascii_case("th")) {
                is_header = true;
            }
            c.get(2).map(|m| cell_text(m.as_str())).unwrap_or_default()
        })
        .collect();
    Row { cells, is_header }
}

/// Strip markup, decode entities and collapse whitespace.
fn cell_text(fragment: &str) -> String {
    let stripped = tag_re().replace_all(fragment, " ");
    let decoded = decode_entities(&stripped);
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ─── Text cleanup ───────────────────────────────────────────────────

/// Named entities seen on quote pages. `&amp;` is handled last, separately.
const NAMED_ENTITIES: &[(&str, &str)] = &[
    ("&nbsp;", "\u{00A0}"),
    ("&thinsp;", "\u{2009}"),
    ("&minus;", "\u{2212}"),
    ("&mdash;", "\u{2014}"),
    ("&ndash;", "\u{2013}"),
    ("&hellip;", "\u{2026}"),
    ("&middot;", "\u{00B7}"),
    ("&lsquo;", "\u{2018}"),
    ("&rsquo;", "\u{2019}"),
    ("&ldquo;", "\u{201C}"),
    ("&rdquo;", "\u{201D}"),
    ("&euro;", "\u{20AC}"),
    ("&pound;", "\u{00A3}"),
    ("&yen;", "\u{00A5}"),
    ("&deg;", "\u{00B0}"),
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&quot;", "\""),
    ("&apos;", "'"),
];

fn decode_entities(text: &str) -> String {
    let named = NAMED_ENTITIES
        .iter()
        .fold(text.to_string(), |acc, (entity, glyph)| acc.replace(entity, glyph));
    let numeric = numeric_entity_re().replace_all(&named, |caps: &regex::Captures| {
        let code = &caps[1];
        let parsed = match code.strip_prefix('x') {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => code.parse::<u32>().ok(),
        };
        parsed
            .and_then(char::from_u32)
            .map(String::from)
            .unwrap_or_else(|| caps[0].to_string())
    });
    // last, so "&amp;lt;" stays literal
    numeric.replace("&amp;", "&")
}

/// Blank headers become `column_N`; repeats get the first free ` (2)`,
/// ` (3)`, ... suffix that no other header already uses.
fn unique_headers(cells: &[String]) -> Vec<String> {
    let mut taken: HashSet<String> = cells.iter().filter(|c| !c.is_empty()).cloned().collect();
    let mut emitted: HashSet<String> = HashSet::new();
    cells
        .iter()
        .enumerate()
        .map(|(i, cell)| {
            let base = if cell.is_empty() {
                format!("column_{}", i + 1)
            } else {
                cell.clone()
            };
            let name = if emitted.contains(&base) {
                (2..)
                    .map(|n| format!("{base} ({n})"))
                    .find(|candidate| !taken.contains(candidate))
                    .unwrap_or(base)
            } else {
                base
            };
            taken.insert(name.clone());
            emitted.insert(name.clone());
            name
        })
        .collect()
}

// ─── Source ─────────────────────────────────────────────────────────

pub struct HtmlTableSource {
    endpoint: String,
    transport: Box<dyn HttpTransport>,
    sleeper: Box<dyn Sleeper>,
    retry: RetryPolicy,
}

impl HtmlTableSource {
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

    fn decode(body: &str) -> Result<ParsedTable, AttemptError> {
        let table = parse_first_table(body)
            .ok_or_else(|| AttemptError::Transient("page contains no table".into()))?;
        if table.rows.is_empty() {
            return Err(AttemptError::Fatal(FetchError::EmptyUpstream {
                kind: SourceKind::HtmlTable,
            }));
        }
        Ok(table)
    }
}

impl QuoteSource for HtmlTableSource {
    fn kind(&self) -> SourceKind {
        SourceKind::HtmlTable
    }

    fn fetch(&self, symbols: &[String]) -> Result<QuoteBatch, FetchError> {
        if !symbols.is_empty() {
            debug!(count = symbols.len(), "html table source ignores the symbol list");
        }
        let request = HttpRequest::get(self.endpoint.clone()).header("Accept", "text/html");
        let table = fetch_with_retry(
            self.transport.as_ref(),
            self.sleeper.as_ref(),
            &self.retry,
            &request,
            SourceKind::HtmlTable,
            Self::decode,
        )?;
        let field_map = FieldMap::from_headers(&table.headers, PercentConvention::Percent);
        debug!(headers = ?table.headers, rows = table.rows.len(), "parsed quote table");
        Ok(QuoteBatch {
            quotes: table.rows,
            field_map,
            source: SourceKind::HtmlTable,
        })
    }
}
