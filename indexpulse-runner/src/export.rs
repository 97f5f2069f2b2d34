//! CSV export of ranked rows.
//!
//! Columns: RunID, DateTimeUTC, Rank, Symbol, FullName, Price, ChangePct,
//! ChangeAmount, DayHigh, DayLow. Numbers are written with two decimals and
//! an empty day high/low is an empty cell.
//!
//! Rows are rendered fully in memory before anything touches the output
//! path, so a failed run never leaves a partial file.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use indexpulse_core::RankedRecord;
use thiserror::Error;
use tracing::debug;

use crate::config::WritePolicy;

// ─── CSV rendering ──────────────────────────────────────────────

pub const CSV_COLUMNS: [&str; 10] = [
    "RunID",
    "DateTimeUTC",
    "Rank",
    "Symbol",
    "FullName",
    "Price",
    "ChangePct",
    "ChangeAmount",
    "DayHigh",
    "DayLow",
];

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("I/O error writing {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("CSV encoding failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("CSV output is not UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
}

impl ExportError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        ExportError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Render rows as CSV, with or without the header line.
pub fn render_csv(rows: &[RankedRecord], include_header: bool) -> Result<String, ExportError> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    if include_header {
        wtr.write_record(CSV_COLUMNS)?;
    }

    for r in rows {
        wtr.write_record([
            r.run_id.as_str(),
            r.date_time_utc.as_str(),
            r.rank.to_string().as_str(),
            r.record.symbol.as_str(),
            r.record.full_name.as_str(),
            format!("{:.2}", r.record.price).as_str(),
            format!("{:.2}", r.record.change_pct).as_str(),
            format!("{:.2}", r.record.change_amount).as_str(),
            r.record.day_high.to_string().as_str(),
            r.record.day_low.to_string().as_str(),
        ])?;
    }

    let bytes = wtr
        .into_inner()
        .map_err(|e| ExportError::Csv(csv::Error::from(e.into_error())))?;
    Ok(String::from_utf8(bytes)?)
}

/// Render rows with the header line.
pub fn export_csv(rows: &[RankedRecord]) -> Result<String, ExportError> {
    render_csv(rows, true)
}

// ─── File output ────────────────────────────────────────────────

/// Write rows to `path` under the given policy. Returns the row count.
pub fn write_rows(
    path: &Path,
    rows: &[RankedRecord],
    policy: WritePolicy,
) -> Result<usize, ExportError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| ExportError::io(parent, e))?;
    }

    match policy {
        WritePolicy::Overwrite => overwrite(path, &export_csv(rows)?)?,
        WritePolicy::Append => {
            let needs_header = fs::metadata(path).map(|m| m.len() == 0).unwrap_or(true);
            append(path, &render_csv(rows, needs_header)?)?;
        }
    }

    debug!(path = %path.display(), rows = rows.len(), ?policy, "rows written");
    Ok(rows.len())
}

/// Write to a sibling temp file, then rename over the target.
fn overwrite(path: &Path, content: &str) -> Result<(), ExportError> {
    let tmp = temp_sibling(path);
    if let Err(e) = fs::write(&tmp, content) {
        let _ = fs::remove_file(&tmp);
        return Err(ExportError::io(&tmp, e));
    }
    fs::rename(&tmp, path).map_err(|e| {
        let _ = fs::remove_file(&tmp);
        ExportError::io(path, e)
    })
}

fn append(path: &Path, content: &str) -> Result<(), ExportError> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| ExportError::io(path, e))?;
    file.write_all(content.as_bytes())
        .map_err(|e| ExportError::io(path, e))
}

// ─── Helpers ────────────────────────────────────────────────────

fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".into());
    path.with_file_name(format!(".{name}.tmp"))
}
