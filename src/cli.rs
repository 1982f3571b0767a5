//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation. Analysis flags are optional so that values from
//! `.trajplot.toml` are only overridden when a flag is given.

use crate::config::RenderTarget;
use clap::Parser;
use std::path::PathBuf;

/// Trajplot - chunk trajectory aggregator
///
/// Loads a wide table of per-conversation chunk measurements, computes the
/// mean trajectory across chunk positions with a smoothed line and a
/// ±1 standard deviation band, and renders static (SVG) and interactive
/// (HTML) charts.
///
/// Examples:
///   trajplot --source uncertainty_strong_matrix.csv
///   trajplot --source hedging.csv --focus hedging --window 3
///   trajplot --render static --summary text
///   trajplot --init-config
#[derive(Parser, Debug, Clone, Default)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Input CSV table
    #[arg(short, long, value_name = "FILE")]
    pub source: Option<PathBuf>,

    /// Name of the aggregated metric, used for axis labels
    #[arg(short, long, value_name = "NAME")]
    pub focus: Option<String>,

    /// Trailing moving-average window (positions)
    #[arg(short, long, value_name = "SIZE")]
    pub window: Option<usize>,

    /// Identifier column name
    #[arg(long, value_name = "COLUMN")]
    pub id_column: Option<String>,

    /// Prefix of chunk columns (`<prefix><integer>`)
    #[arg(long, value_name = "PREFIX")]
    pub prefix: Option<String>,

    /// Directory for the rendered charts
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Charts to render
    #[arg(long, value_name = "TARGET")]
    pub render: Option<RenderTarget>,

    /// Print the aggregate table to stdout
    #[arg(long, value_name = "FORMAT")]
    pub summary: Option<SummaryFormat>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .trajplot.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (errors only)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .trajplot.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the aggregate table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum SummaryFormat {
    /// Fixed-width text table (default)
    #[default]
    Text,
    /// JSON array of rows
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.init_config {
            return Ok(());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(ref prefix) = self.prefix {
            if prefix.is_empty() {
                return Err("Chunk prefix must not be empty".to_string());
            }
        }

        if let Some(ref id_column) = self.id_column {
            if id_column.trim().is_empty() {
                return Err("Identifier column must not be empty".to_string());
            }
        }

        if let Some(ref source) = self.source {
            if !source.is_file() {
                return Err(format!("Source file does not exist: {}", source.display()));
            }
        }

        if let Some(ref output_dir) = self.output_dir {
            if output_dir.exists() && !output_dir.is_dir() {
                return Err(format!(
                    "Output path is not a directory: {}",
                    output_dir.display()
                ));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
