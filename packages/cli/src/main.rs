#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the NICD hospitalisation tools.
//!
//! Uses `indicatif-log-bridge` (via [`nicd_cli_utils::init_logger`]) to
//! route `log` output through `indicatif::MultiProgress` so that log lines
//! and progress bars never fight for the terminal.

mod commands;

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "nicd", about = "NICD hospitalisation report scraper")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Where `extract` writes the national time series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Store {
    /// CSV file(s)
    Csv,
    /// Local `DuckDB` database
    Duckdb,
    /// CSV on standard output
    None,
}

#[derive(Subcommand)]
enum Commands {
    /// Download the daily reports for a date or date range
    Fetch {
        /// First report date (YYYY-MM-DD)
        #[arg(long)]
        start: NaiveDate,
        /// Day after the last report date; only `start` when omitted
        #[arg(long)]
        end: Option<NaiveDate>,
        /// Download directory (default: data/reports)
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Write each report's normalized province table as CSV
    Scrape {
        /// Directory of report PDFs (default: data/reports)
        #[arg(long)]
        dir: Option<PathBuf>,
        /// File glob within the directory
        #[arg(long, default_value = "*.pdf")]
        pattern: String,
        /// Zero-based page holding the table
        #[arg(long)]
        page: Option<usize>,
        /// Output directory for `{stem}.csv` files; printed when omitted
        #[arg(long)]
        out: Option<PathBuf>,
        /// Keep the precomputed `Total` row
        #[arg(long)]
        include_total: bool,
    },
    /// Build the national time series from a directory of reports
    Extract {
        /// Directory of report PDFs (default: data/reports)
        #[arg(long)]
        dir: Option<PathBuf>,
        /// File glob within the directory
        #[arg(long, default_value = "*.pdf")]
        pattern: String,
        /// TOML file with page indices and options
        #[arg(long)]
        config: Option<PathBuf>,
        /// Sum the precomputed `Total` row with the provinces
        #[arg(long)]
        include_total: bool,
        /// Output sink
        #[arg(long, value_enum, default_value_t = Store::Csv)]
        store: Store,
        /// Output file, directory or database path
        #[arg(long)]
        output: Option<PathBuf>,
        /// Write one `{date}_nicd.csv` per report instead of a combined file
        #[arg(long)]
        per_report: bool,
    },
    /// Append province-level rows to the province database
    Provinces {
        /// Directory of report PDFs (default: data/reports)
        #[arg(long)]
        dir: Option<PathBuf>,
        /// File glob within the directory
        #[arg(long, default_value = "*.pdf")]
        pattern: String,
        /// TOML file with page indices and options
        #[arg(long)]
        config: Option<PathBuf>,
        /// Keep the precomputed `Total` row
        #[arg(long)]
        include_total: bool,
        /// Database path (default: data/nicd_provinces.duckdb)
        #[arg(long)]
        database: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = nicd_cli_utils::init_logger();
    let cli = Cli::parse();

    match cli.command {
        Commands::Fetch { start, end, dir } => {
            commands::fetch(&multi, start, end, dir).await?;
        }
        Commands::Scrape {
            dir,
            pattern,
            page,
            out,
            include_total,
        } => {
            let summary = commands::scrape(&multi, dir, &pattern, page, out, include_total)?;
            println!("{summary}");
        }
        Commands::Extract {
            dir,
            pattern,
            config,
            include_total,
            store,
            output,
            per_report,
        } => {
            let config = commands::load_config(config.as_deref(), include_total)?;
            let summary = commands::extract(
                &multi,
                dir,
                &pattern,
                &config,
                store,
                output,
                per_report,
            )?;
            println!("{summary}");
        }
        Commands::Provinces {
            dir,
            pattern,
            config,
            include_total,
            database,
        } => {
            let config = commands::load_config(config.as_deref(), include_total)?;
            let summary = commands::provinces(&multi, dir, &pattern, &config, database)?;
            println!("{summary}");
        }
    }

    Ok(())
}
