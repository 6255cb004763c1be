//! fisspec — fission-product decay under a continuous source.
//!
//! `run` drives a configured simulation and writes the bin time series and
//! the dense nuclide table. `decay` decays a single nuclide for a fixed time
//! and prints the resulting inventory.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;

use fisspec_core::types::{Inventory, NuclideId, TimeUnit};
use fisspec_decay::{DecayData, DecayEngine};
use fisspec_sim::{CsvSink, SimConfig, Simulation, YieldLibrary};

#[derive(Parser, Debug)]
#[command(
    name = "fisspec",
    version,
    about = "Fission-product decay binned into a gamma emission time series"
)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Log output format ("text" or "json")
    #[arg(long, global = true, default_value = "text")]
    log_format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a continuous-source simulation.
    Run(RunArgs),
    /// Decay one nuclide for a fixed time and print the result.
    Decay(DecayArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Run configuration (TOML or JSON). `FISSPEC__*` variables override it.
    #[arg(short, long)]
    config: PathBuf,

    /// Decay chain data (JSON).
    #[arg(long)]
    decay_data: PathBuf,

    /// Gamma yield library (JSON).
    #[arg(long)]
    gamma_data: PathBuf,
}

#[derive(Args, Debug)]
struct DecayArgs {
    /// Decay chain data (JSON).
    #[arg(long)]
    decay_data: PathBuf,

    /// Starting nuclide, e.g. Xe-142.
    #[arg(short, long)]
    nuclide: String,

    /// Starting activity in Bq.
    #[arg(short, long)]
    activity: f64,

    /// Elapsed time, in `unit`.
    #[arg(short, long)]
    time: f64,

    /// Time unit (s, min, h, d, y).
    #[arg(short, long, default_value = "s")]
    unit: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level, &cli.log_format);

    match cli.command {
        Commands::Run(args) => run(args),
        Commands::Decay(args) => decay(args),
    }
}

fn run(args: RunArgs) -> Result<()> {
    let config = SimConfig::load(&args.config)
        .with_context(|| format!("Failed to load config: {}", args.config.display()))?;
    let engine = load_engine(&args.decay_data)?;
    let yields = YieldLibrary::load(&args.gamma_data)
        .with_context(|| format!("Failed to load gamma data: {}", args.gamma_data.display()))?;

    info!("fisspec v{}", env!("CARGO_PKG_VERSION"));
    info!(
        nuclides = engine.data().len(),
        gamma_entries = yields.len(),
        bins = %config.output.bins_path.display(),
        table = %config.output.nuclides_path.display(),
        "inputs loaded"
    );

    let mut sink = CsvSink::create(&config.output.bins_path, &config.output.nuclides_path)
        .context("Failed to create output files")?;
    let summary = Simulation::from_config(&engine, &yields, &config)
        .run(&mut sink)
        .context("Simulation failed")?;

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn decay(args: DecayArgs) -> Result<()> {
    let engine = load_engine(&args.decay_data)?;
    let nuclide = NuclideId::parse(&args.nuclide)
        .with_context(|| format!("Invalid nuclide: {}", args.nuclide))?;
    let unit: TimeUnit = args.unit.parse().context("Invalid time unit")?;

    let mut inventory = Inventory::new();
    inventory.set(nuclide, args.activity);
    let decayed = engine
        .decay_for(&inventory, args.time, unit)
        .context("Decay failed")?;

    println!("after {} {}:", args.time, unit.symbol());
    for (nuclide, activity) in decayed.iter() {
        println!("  {:<10} {activity:e} Bq", nuclide.as_str());
    }
    Ok(())
}

fn load_engine(path: &Path) -> Result<DecayEngine> {
    let data = DecayData::load(path)
        .with_context(|| format!("Failed to load decay data: {}", path.display()))?;
    DecayEngine::new(data).context("Failed to build decay engine")
}

/// Initialize tracing subscriber with the given log level and output format.
///
/// Pass `format = "json"` for structured JSON output. Any other value
/// defaults to human-readable text. Logs go to stderr so stdout stays
/// machine-readable.
fn init_logging(level_str: &str, format: &str) {
    use tracing_subscriber::filter::EnvFilter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level_str));

    if format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_level(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}
