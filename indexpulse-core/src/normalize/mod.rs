//! Raw quote normalization: lenient number parsing, per-source field maps,
//! and the change-metric fallback chain.

pub mod derive;
pub mod fields;
pub mod number;

pub use derive::{normalize, normalize_batch};
pub use fields::{Field, FieldMap, PercentConvention};
pub use number::{parse_number, parse_optional, round2, try_parse_number, FieldParseError};
