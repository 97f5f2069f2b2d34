//! IndexPulse CLI: writes the top global index movers of one run to CSV.
//!
//! One run per invocation. Scheduling is left to cron or a job runner; a
//! non-zero exit status means no rows were written.

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use indexpulse_core::SourceKind;
use indexpulse_runner::{execute, init_logging, LogConfig, RunConfig, RunReport, WritePolicy};
use std::path::PathBuf;
use tracing::error;

#[derive(Parser, Debug)]
#[command(
    name = "indexpulse",
    version,
    about = "Top three global index movers by percent change"
)]
struct Cli {
    /// Path to a TOML config file. Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// CSV output path (overrides the config file).
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Quote source: yahoo, scanner, or html.
    #[arg(long)]
    source: Option<SourceKind>,

    /// Append to the output file instead of replacing it.
    #[arg(long, default_value_t = false)]
    append: bool,

    /// Do not print the summary table.
    #[arg(short, long, default_value_t = false)]
    quiet: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(LogConfig::from_env()).map_err(|e| anyhow!("failed to initialize logging: {e}"))?;

    let config = load_config(&cli)?;
    let report = execute(&config).map_err(|e| {
        error!(error = %e, "run failed");
        anyhow!(e)
    })?;

    if !cli.quiet {
        print_summary(&report);
    }
    Ok(())
}

/// Read the config file (if any) and apply command-line overrides.
fn load_config(cli: &Cli) -> Result<RunConfig> {
    let mut config = match &cli.config {
        Some(path) => RunConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => RunConfig::default(),
    };

    if let Some(output) = &cli.output {
        config.output = output.clone();
    }
    if let Some(source) = cli.source {
        config.source = source;
    }
    if cli.append {
        config.write_policy = WritePolicy::Append;
    }

    config.validate().context("invalid configuration")?;
    Ok(config)
}

fn print_summary(report: &RunReport) {
    println!("Run {} at {} ({})", report.run_id, report.timestamp, report.source);
    println!(
        "{:<5} {:<16} {:<28} {:>12} {:>9} {:>11}",
        "Rank", "Symbol", "Name", "Price", "Chg %", "Chg"
    );
    println!("{}", "-".repeat(86));
    for row in &report.rows {
        let r = &row.record;
        println!(
            "{:<5} {:<16} {:<28} {:>12.2} {:>9.2} {:>11.2}",
            row.rank,
            truncate(&r.symbol, 16),
            truncate(&r.full_name, 28),
            r.price,
            r.change_pct,
            r.change_amount
        );
    }
    println!();
    println!(
        "{} of {} quotes written to {}",
        report.rows.len(),
        report.fetched,
        report.output.display()
    );
}

fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(width.saturating_sub(1)).collect();
        out.push('…');
        out
    }
}
