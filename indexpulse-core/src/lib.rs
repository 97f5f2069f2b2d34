//! IndexPulse Core: quote sources, normalization and ranking.
//!
//! This crate contains everything up to the ranked row set:
//! - Domain types (raw quotes, canonical records, run identity)
//! - Lenient number parsing and per-source field maps
//! - The change-metric fallback chain
//! - The `QuoteSource` trait with retry/backoff and three upstreams
//! - Top-N ranking by percent change

pub mod domain;
pub mod fetch;
pub mod normalize;
pub mod rank;

pub use domain::{CanonicalRecord, DisplayValue, RankedRecord, RawQuote, RunContext, RunId, TOP_N};
pub use fetch::{FetchError, QuoteBatch, QuoteSource, SourceKind};
pub use normalize::{normalize, normalize_batch, parse_number};
pub use rank::{rank, EmptyInputError};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: sources and run data can move across threads.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<RawQuote>();
        require_sync::<RawQuote>();
        require_send::<CanonicalRecord>();
        require_sync::<CanonicalRecord>();
        require_send::<RankedRecord>();
        require_sync::<RankedRecord>();
        require_send::<RunContext>();
        require_sync::<RunContext>();
        require_send::<QuoteBatch>();
        require_sync::<QuoteBatch>();

        require_send::<fetch::YahooQuoteSource>();
        require_sync::<fetch::YahooQuoteSource>();
        require_send::<fetch::ScannerSource>();
        require_sync::<fetch::ScannerSource>();
        require_send::<fetch::HtmlTableSource>();
        require_sync::<fetch::HtmlTableSource>();
        require_send::<Box<dyn QuoteSource>>();
        require_sync::<Box<dyn QuoteSource>>();
    }
}
