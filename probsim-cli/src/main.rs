//! probsim CLI: run, sweep, and synthetic data commands.
//!
//! Commands:
//! - `run`: simulate a TOML config, print a summary, save artifacts
//! - `sweep`: rerun a config over a grid of policy thresholds
//! - `synth`: write synthetic OHLCV files, model artifacts, and a config

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use probsim_core::features::CLASSIC_FEATURES;
use probsim_runner::config::{AssetConfig, ModelSpec, SimulationConfig, SimulationSection};
use probsim_runner::data_loader::{generate_synthetic_bars, load_universe, write_bars_csv};
use probsim_runner::reporting::{format_sweep_table, write_sweep_csv};
use probsim_runner::{
    format_summary, run_from_config, save_artifacts, LogisticArtifact, ParamSweep, ThresholdGrid,
};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "probsim",
    about = "Daily multi-asset portfolio simulator driven by per-asset probability models"
)]
struct Cli {
    /// Debug-level logging (overridden by RUST_LOG).
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a simulation from a TOML config file.
    Run {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// Simulate only the last N aligned days.
        #[arg(long)]
        sample_size: Option<usize>,

        /// Output directory for artifacts.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,

        /// Print the summary without writing artifacts.
        #[arg(long, default_value_t = false)]
        no_save: bool,
    },
    /// Rerun a config over a grid of policy thresholds.
    Sweep {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// Up thresholds, comma separated.
        #[arg(long, value_delimiter = ',', default_values_t = [0.55, 0.6, 0.65])]
        up: Vec<f64>,

        /// Down thresholds, comma separated.
        #[arg(long, value_delimiter = ',', default_values_t = [0.55, 0.6, 0.65])]
        down: Vec<f64>,

        /// Strong thresholds, comma separated.
        #[arg(long, value_delimiter = ',', default_values_t = [0.75, 0.8, 0.85])]
        strong: Vec<f64>,

        /// Run grid points one at a time.
        #[arg(long, default_value_t = false)]
        sequential: bool,

        /// Rows to print.
        #[arg(long, default_value_t = 10)]
        top: usize,

        /// Write the ranked results here as CSV.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Write synthetic OHLCV data, logistic model artifacts, and a config.
    Synth {
        /// Directory to create the files in.
        #[arg(long, default_value = "synth")]
        out_dir: PathBuf,

        /// Symbols to generate.
        #[arg(long, value_delimiter = ',', default_values_t = ["AAPL".to_string(), "GE".to_string(), "KO".to_string(), "MSFT".to_string()])]
        symbols: Vec<String>,

        /// Trading days per symbol.
        #[arg(long, default_value_t = 260)]
        days: usize,

        /// First calendar day (YYYY-MM-DD).
        #[arg(long, default_value = "2023-01-02")]
        start: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Run {
            config,
            sample_size,
            output_dir,
            no_save,
        } => run_cmd(&config, sample_size, &output_dir, no_save),
        Commands::Sweep {
            config,
            up,
            down,
            strong,
            sequential,
            top,
            output,
        } => {
            let grid = ThresholdGrid {
                up_thresholds: up,
                down_thresholds: down,
                strong_thresholds: strong,
            };
            sweep_cmd(&config, &grid, !sequential, top, output.as_deref())
        }
        Commands::Synth {
            out_dir,
            symbols,
            days,
            start,
        } => synth_cmd(&out_dir, &symbols, days, &start),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run_cmd(
    config_path: &Path,
    sample_size: Option<usize>,
    output_dir: &Path,
    no_save: bool,
) -> Result<()> {
    let mut config = SimulationConfig::from_file(config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    if let Some(n) = sample_size {
        config.simulation.sample_size = Some(n);
    }

    let report = run_from_config(&config)?;
    print!("{}", format_summary(&report));

    if !no_save {
        let paths = save_artifacts(&report, output_dir)?;
        println!("Artifacts saved to: {}", paths.run_dir.display());
    }
    Ok(())
}

fn sweep_cmd(
    config_path: &Path,
    grid: &ThresholdGrid,
    parallel: bool,
    top: usize,
    output: Option<&Path>,
) -> Result<()> {
    let config = SimulationConfig::from_file(config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    if grid.policies(&config.policy).is_empty() {
        bail!("threshold grid has no valid combination (strong must be >= up and down)");
    }

    let data = load_universe(&config)?;
    let results = ParamSweep::new()
        .with_parallelism(parallel)
        .sweep(grid, &config, &data)?;

    print!("{}", format_sweep_table(&results, top));
    if let Some(path) = output {
        write_sweep_csv(path, &results)?;
        println!("Sweep results saved to: {}", path.display());
    }
    Ok(())
}

fn synth_cmd(out_dir: &Path, symbols: &[String], days: usize, start: &str) -> Result<()> {
    if symbols.is_empty() {
        bail!("at least one symbol is required");
    }
    if days == 0 {
        bail!("--days must be at least 1");
    }
    let start = NaiveDate::parse_from_str(start, "%Y-%m-%d")
        .with_context(|| format!("invalid --start '{start}'"))?;

    let data_dir = out_dir.join("data");
    let model_dir = out_dir.join("models");
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("creating {}", data_dir.display()))?;
    std::fs::create_dir_all(&model_dir)
        .with_context(|| format!("creating {}", model_dir.display()))?;

    let mut assets = Vec::with_capacity(symbols.len());
    for symbol in symbols {
        let data = PathBuf::from("data").join(format!("{symbol}.csv"));
        let model = PathBuf::from("models").join(format!("{symbol}.json"));

        let bars = generate_synthetic_bars(symbol, start, days);
        write_bars_csv(&out_dir.join(&data), &bars)?;
        synthetic_artifact().save(&out_dir.join(&model))?;

        assets.push(AssetConfig {
            symbol: symbol.clone(),
            data,
            derive_features: true,
            model: ModelSpec::Logistic { path: model },
        });
    }

    let config = SimulationConfig {
        features: CLASSIC_FEATURES.iter().map(|s| s.to_string()).collect(),
        simulation: SimulationSection::default(),
        policy: Default::default(),
        assets,
        base_dir: PathBuf::new(),
    };
    config.validate()?;
    let config_path = out_dir.join("sim.toml");
    std::fs::write(&config_path, config.to_toml()?)
        .with_context(|| format!("writing {}", config_path.display()))?;

    println!(
        "Wrote {} symbols x {days} days to {}",
        symbols.len(),
        out_dir.display()
    );
    println!("Run with: probsim run --config {}", config_path.display());
    Ok(())
}

/// A hand-set logistic model over the classic features. Leans long when RSI
/// and momentum are high.
fn synthetic_artifact() -> LogisticArtifact {
    LogisticArtifact {
        feature_names: CLASSIC_FEATURES.iter().map(|s| s.to_string()).collect(),
        weights: vec![0.9, 0.4, 0.4, 0.6, 0.5, 0.0],
        bias: 0.2,
        scaler_means: Some(vec![50.0, 50.0, -50.0, 0.0, 0.0, 0.0]),
        scaler_stds: Some(vec![12.0, 28.0, 28.0, 0.04, 1.5, 1.0]),
    }
}
