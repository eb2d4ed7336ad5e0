// src/main.rs
use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};
use anyhow::{Context, Result};
use clap::Parser;
use ivsweep::analysis::{AnalysisLevel, SweepAnalyzer};
use ivsweep::config::AnalyzerConfig;
use ivsweep::loader::read_data_file;
/// Analyze and classify a voltage/current sweep.
#[derive(Parser, Debug)]
#[command(name = "ivsweep", version, about)]
struct Args {
    /// Data file: header row, then voltage, current and optional time columns
    file: PathBuf,
    /// Report depth: basic, classification, full or research
    #[arg(short, long, default_value = "full")]
    level: String,
    /// iv_sweep, pulse, endurance or retention; detected when omitted
    #[arg(short, long)]
    measurement_type: Option<String>,
    /// Print the enhanced memristivity classification instead of the report
    #[arg(long, conflicts_with = "snapshot")]
    enhanced: bool,
    /// Print a device-history snapshot instead of the report
    #[arg(long)]
    snapshot: bool,
    /// Cycle number recorded in the snapshot
    #[arg(long, default_value_t = 0)]
    cycle: u32,
    /// JSON file overriding analysis thresholds
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Write the JSON here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Raise log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}
fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    // RUST_LOG still takes precedence over the flag.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();
}
fn load_config(path: Option<&PathBuf>) -> Result<AnalyzerConfig> {
    let Some(path) = path else {
        return Ok(AnalyzerConfig::default());
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    AnalyzerConfig::from_json(&text).with_context(|| format!("parsing config {}", path.display()))
}
fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);
    let config = load_config(args.config.as_ref())?;
    let data = read_data_file(&args.file)?;
    let analyzer = SweepAnalyzer::with_config(
        data.voltage,
        data.current,
        data.time,
        args.measurement_type.as_deref(),
        &args.level,
        config,
    )
    .with_context(|| format!("analyzing {}", args.file.display()))?;

    let json = if args.snapshot {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs().to_string())
            .unwrap_or_default();
        serde_json::to_string_pretty(&analyzer.device_snapshot(args.cycle, timestamp))?
    } else if args.enhanced {
        serde_json::to_string_pretty(analyzer.enhanced_classification())?
    } else {
        serde_json::to_string_pretty(&analyzer.get_results(AnalysisLevel::parse(&args.level)))?
    };
    match &args.output {
        Some(path) => {
            fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
            log::info!("report written to {}", path.display());
        }
        None => println!("{json}"),
    }
    for diagnostic in analyzer.diagnostics() {
        log::info!("recovered: {diagnostic}");
    }
    Ok(())
}
