//! IndexPulse Runner: run orchestration on top of `indexpulse-core`.
//!
//! This crate builds on `indexpulse-core` to provide:
//! - TOML run configuration with defaults for every field
//! - The fetch → normalize → rank → export pipeline
//! - CSV output with overwrite and append policies
//! - `tracing` subscriber setup

pub mod config;
pub mod export;
pub mod logging;
pub mod pipeline;

pub use config::{ConfigError, RunConfig, WritePolicy};
pub use export::{export_csv, write_rows, ExportError, CSV_COLUMNS};
pub use logging::{init_logging, LogConfig, LogFormat};
pub use pipeline::{build_source, execute, execute_with, run_once, RunError, RunReport};
