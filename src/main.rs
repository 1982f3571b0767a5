//! Trajplot - chunk trajectory aggregator
//!
//! A CLI tool that loads a wide table of per-conversation chunk
//! measurements, computes the smoothed mean trajectory with a ±1 standard
//! deviation band, and renders static and interactive charts.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Any failure (config, load, aggregation, rendering)

mod analysis;
mod cli;
mod config;
mod error;
mod loader;
mod models;
mod report;

use analysis::TrajectoryAggregator;
use anyhow::{Context, Result};
use cli::{Args, SummaryFormat};
use config::{Config, DEFAULT_CONFIG_FILE};
use loader::TableSchema;
use report::ChartSpec;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

fn main() -> Result<()> {
    let args = Args::parse_args();

    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    init_logging(&args);

    info!("Trajplot v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run(args) {
        Ok(exit_code) => std::process::exit(exit_code),
        Err(e) => {
            error!("Run failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .trajplot.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(DEFAULT_CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            DEFAULT_CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", DEFAULT_CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", DEFAULT_CONFIG_FILE);
    println!("   Edit it to set the source table, focus metric and smoothing window.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Run load, aggregate, and render. Returns the exit code.
fn run(args: Args) -> Result<i32> {
    let start_time = Instant::now();

    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    let source = config.analysis.source_path.clone();
    let window = config.analysis.smoothing_window;
    let schema = TableSchema::from(&config.table);

    // Step 1: Load the wide table
    println!("📥 Loading table: {}", source.display());
    let table = loader::load_wide_table(&source, &schema)?;
    if table.is_empty() {
        warn!("{} has a header but no data rows", source.display());
    }

    // Step 2: Reshape and aggregate
    println!(
        "📈 Aggregating '{}' over {} rows (window {})...",
        config.analysis.focus_metric_name,
        table.len(),
        window
    );
    let aggregator = TrajectoryAggregator::new(schema.columns.clone(), window);
    let trajectory = aggregator.run(&table)?;

    let undefined = trajectory
        .rows
        .iter()
        .filter(|row| row.band().is_none())
        .count();
    if undefined > 0 {
        warn!(
            "{} of {} positions have no band and will be left out of it",
            undefined,
            trajectory.rows.len()
        );
    }

    if let Some(format) = args.summary {
        let output = match format {
            SummaryFormat::Text => report::generate_text_summary(&trajectory.rows),
            SummaryFormat::Json => report::generate_json_summary(&trajectory.rows)?,
        };
        println!("\n{}", output);
    }

    // Step 3: Render charts
    let spec = ChartSpec::from_config(&config);
    let target = config.render.target;
    let output_dir = &config.render.output_dir;
    let mut written = Vec::new();

    if target.wants_static() {
        written.push(report::write_static_chart(
            &trajectory.long_records,
            &trajectory.rows,
            &spec,
            output_dir,
        )?);
    }
    if target.wants_interactive() {
        written.push(report::write_interactive_chart(
            &trajectory.long_records,
            &trajectory.rows,
            &spec,
            output_dir,
        )?);
    }

    let duration = start_time.elapsed().as_secs_f64();

    println!("\n📊 Trajectory Summary:");
    println!("   Items: {}", trajectory.item_count());
    println!("   Positions: {}", trajectory.rows.len());
    println!("   Observations: {}", trajectory.long_records.len());
    println!("   Duration: {:.2}s", duration);

    if written.is_empty() {
        println!("\n✅ Done. No charts rendered.");
    } else {
        println!("\n✅ Done. Charts saved to:");
        for path in &written {
            println!("   {}", path.display());
        }
    }

    Ok(0)
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", DEFAULT_CONFIG_FILE);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {:#}", e);
            Ok(Config::default())
        }
    }
}
