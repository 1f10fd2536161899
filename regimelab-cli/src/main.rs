//! RegimeLab CLI: walk-forward runs, basket schedules and synthetic data.
//!
//! Commands:
//! - `run`: walk-forward backtest from a TOML config; writes report and OOS tables
//! - `baskets`: build the per-date satellite basket schedule only
//! - `synth`: write deterministic synthetic `<SYMBOL>.csv` files

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use regimelab_runner::export::write_schedule;
use regimelab_runner::{
    build_baskets, generate_synthetic_bars, run_pipeline, save_outputs, write_csv, RunConfig,
};

#[derive(Parser)]
#[command(
    name = "regimelab",
    about = "RegimeLab: regime-adaptive multi-asset walk-forward backtester"
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
    /// Run the walk-forward backtest and write artifacts.
    Run {
        /// Path to a TOML config file. Defaults apply when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Directory of <SYMBOL>.csv files (overrides [data].dir).
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Artifact root (overrides [report].output_dir).
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// First date to load (YYYY-MM-DD).
        #[arg(long)]
        start: Option<String>,

        /// Last date to load (YYYY-MM-DD).
        #[arg(long)]
        end: Option<String>,

        /// Evaluate grid candidates on one thread.
        #[arg(long, default_value_t = false)]
        sequential: bool,

        /// Print the full report as JSON instead of the text summary.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Build the basket schedule and write it as CSV.
    Baskets {
        #[arg(long)]
        config: Option<PathBuf>,

        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Output CSV path.
        #[arg(long, default_value = "baskets.csv")]
        out: PathBuf,
    },
    /// Generate synthetic daily bars for a list of symbols.
    Synth {
        /// Symbols to generate; the first two get an upward drift.
        #[arg(required = true)]
        symbols: Vec<String>,

        #[arg(long, default_value = "data")]
        out_dir: PathBuf,

        #[arg(long, default_value = "2021-01-01")]
        start: String,

        #[arg(long, default_value = "2024-12-31")]
        end: String,

        /// Daily drift added to every satellite's random walk.
        #[arg(long, default_value_t = 0.0)]
        drift: f64,
    },
}

fn init_tracing(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Run {
            config,
            data_dir,
            output_dir,
            start,
            end,
            sequential,
            json,
        } => {
            let mut run_config = load_config(config.as_deref(), data_dir)?;
            if let Some(dir) = output_dir {
                run_config.report.output_dir = dir;
            }
            if let Some(s) = start {
                run_config.data.start = Some(parse_date(&s)?);
            }
            if let Some(e) = end {
                run_config.data.end = Some(parse_date(&e)?);
            }
            if sequential {
                run_config.walk_forward.parallel = false;
            }
            run_cmd(&run_config, json)
        }
        Commands::Baskets {
            config,
            data_dir,
            out,
        } => {
            let run_config = load_config(config.as_deref(), data_dir)?;
            baskets_cmd(&run_config, &out)
        }
        Commands::Synth {
            symbols,
            out_dir,
            start,
            end,
            drift,
        } => synth_cmd(&symbols, &out_dir, &parse_date(&start)?, &parse_date(&end)?, drift),
    }
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").with_context(|| format!("invalid date '{s}'"))
}

fn load_config(path: Option<&Path>, data_dir: Option<PathBuf>) -> Result<RunConfig> {
    let mut config = match path {
        Some(p) => RunConfig::from_file(p)?,
        None => RunConfig::default(),
    };
    if let Some(dir) = data_dir {
        config.data.dir = dir;
    }
    Ok(config)
}

fn run_cmd(config: &RunConfig, json: bool) -> Result<()> {
    let output = run_pipeline(config)?;
    let artifacts = save_outputs(config, &output)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&output.report)?);
    } else {
        print!("{}", output.report.render_text());
    }
    println!("Artifacts saved to: {}", artifacts.dir.display());
    Ok(())
}

fn baskets_cmd(config: &RunConfig, out: &Path) -> Result<()> {
    let schedule = build_baskets(config)?;
    write_schedule(out, &schedule)?;
    let non_empty = schedule
        .entries()
        .iter()
        .filter(|e| !e.satellites.is_empty())
        .count();
    println!(
        "{} basket entries ({} non-empty) written to {}",
        schedule.len(),
        non_empty,
        out.display()
    );
    Ok(())
}

fn synth_cmd(
    symbols: &[String],
    out_dir: &Path,
    start: &NaiveDate,
    end: &NaiveDate,
    drift: f64,
) -> Result<()> {
    if start > end {
        bail!("--start {start} is after --end {end}");
    }
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("failed to create {}", out_dir.display()))?;

    for (i, symbol) in symbols.iter().enumerate() {
        // Anchors trend up so the default regime filter has something to trade.
        let symbol_drift = if i < 2 { drift.max(0.0) + 0.002 } else { drift };
        let bars = generate_synthetic_bars(symbol, *start, *end, symbol_drift);
        let path = out_dir.join(format!("{symbol}.csv"));
        write_csv(&path, &bars)?;
        info!(symbol = %symbol, bars = bars.len(), path = %path.display(), "synthetic data written");
    }
    eprintln!("WARNING: synthetic data is for development only");
    Ok(())
}
