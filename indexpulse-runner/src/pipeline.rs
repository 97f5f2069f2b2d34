//! Run pipeline: fetch → normalize → rank → export.
//!
//! Two entry points:
//! - `execute()`: builds the configured source over a real HTTP client. Used by the CLI.
//! - `execute_with()`: takes any `QuoteSource` and a fixed run context. Used by tests.

use std::path::PathBuf;

use indexpulse_core::fetch::{HtmlTableSource, ReqwestTransport, ScannerSource, YahooQuoteSource};
use indexpulse_core::{
    normalize_batch, rank, EmptyInputError, FetchError, QuoteSource, RankedRecord, RunContext,
    RunId, SourceKind, TOP_N,
};
use thiserror::Error;
use tracing::info;

use crate::config::{ConfigError, RunConfig};
use crate::export::{write_rows, ExportError};

/// Errors from a run. Any of them means no rows were written.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("fetch error: {0}")]
    Fetch(#[from] FetchError),
    #[error("ranking error: {0}")]
    EmptyInput(#[from] EmptyInputError),
    #[error("export error: {0}")]
    Export(#[from] ExportError),
}

/// Outcome of a successful run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: RunId,
    pub timestamp: String,
    pub source: SourceKind,
    /// Quotes received before ranking.
    pub fetched: usize,
    pub rows: Vec<RankedRecord>,
    pub output: PathBuf,
}

/// Fetch, normalize and rank, without touching the filesystem.
pub fn run_once(
    source: &dyn QuoteSource,
    symbols: &[String],
    ctx: &RunContext,
) -> Result<(usize, Vec<RankedRecord>), RunError> {
    let batch = source.fetch(symbols)?;
    let fetched = batch.quotes.len();
    let records = normalize_batch(&batch);
    let ranked = rank(records, TOP_N, ctx)?;
    Ok((fetched, ranked))
}

/// Build the configured source over a reqwest transport.
pub fn build_source(config: &RunConfig) -> Result<Box<dyn QuoteSource>, RunError> {
    let transport = Box::new(ReqwestTransport::new(&config.http_settings())?);
    let retry = config.retry_policy();
    let endpoint = config.endpoint().to_string();

    let source: Box<dyn QuoteSource> = match config.source {
        SourceKind::YahooQuote => {
            Box::new(YahooQuoteSource::new(endpoint, transport).with_retry(retry))
        }
        SourceKind::Scanner => Box::new(ScannerSource::new(endpoint, transport).with_retry(retry)),
        SourceKind::HtmlTable => {
            Box::new(HtmlTableSource::new(endpoint, transport).with_retry(retry))
        }
    };
    Ok(source)
}

/// Validate the config, run against the live source and write the CSV.
pub fn execute(config: &RunConfig) -> Result<RunReport, RunError> {
    config.validate()?;
    let source = build_source(config)?;
    execute_with(source.as_ref(), config, &RunContext::new())
}

/// Run against `source` with a caller-supplied context and write the CSV.
pub fn execute_with(
    source: &dyn QuoteSource,
    config: &RunConfig,
    ctx: &RunContext,
) -> Result<RunReport, RunError> {
    let symbols = config.symbols_for_source();
    info!(
        run_id = %ctx.run_id,
        source = %source.kind(),
        symbols = symbols.len(),
        "run started"
    );

    let (fetched, rows) = run_once(source, &symbols, ctx)?;
    write_rows(&config.output, &rows, config.write_policy)?;

    info!(
        run_id = %ctx.run_id,
        fetched,
        rows = rows.len(),
        output = %config.output.display(),
        "run finished"
    );

    Ok(RunReport {
        run_id: ctx.run_id.clone(),
        timestamp: ctx.timestamp(),
        source: source.kind(),
        fetched,
        rows,
        output: config.output.clone(),
    })
}
