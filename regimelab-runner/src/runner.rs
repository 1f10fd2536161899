//! Pipeline runner: wires loading, indicators, baskets, walk-forward and
//! reports together.
//!
//! Entry points:
//! - `run_pipeline()`: loads CSVs from the configured directory, then runs. Used by the CLI.
//! - `run_from_data()`: takes pre-loaded raw rows. No I/O.
//! - `build_baskets()`: stops after the basket schedule.
//!
//! All I/O happens here, before or after the engine; the simulator,
//! optimizer and orchestrator never touch the filesystem.

use std::collections::BTreeMap;
use std::path::PathBuf;

use thiserror::Error;
use tracing::{info, warn};

use regimelab_core::basket::{BasketSchedule, BasketSelector};
use regimelab_core::domain::{AssetSeries, DataError, MarketData, RawBar};
use regimelab_core::engine::Simulator;
use regimelab_core::indicators::build_series;

use crate::config::{ConfigError, RunConfig, RunId};
use crate::data_loader::{load_directory, LoadError, LoadOptions};
use crate::export::{save_artifacts, ExportError, RunArtifacts};
use crate::report::WalkForwardReport;
use crate::walk_forward::{run_walk_forward, WalkForwardError, WalkForwardResult};

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("load error: {0}")]
    Load(#[from] LoadError),
    #[error("data error: {0}")]
    Data(#[from] DataError),
    #[error("walk-forward error: {0}")]
    WalkForward(#[from] WalkForwardError),
    #[error("export error: {0}")]
    Export(#[from] ExportError),
}

/// Everything one run produced.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub run_id: RunId,
    pub dataset_hash: String,
    pub schedule: BasketSchedule,
    pub result: WalkForwardResult,
    pub report: WalkForwardReport,
}

/// Market data aligned on the reference calendar, plus its basket schedule.
#[derive(Debug, Clone)]
pub struct PreparedMarket {
    pub market: MarketData,
    pub schedule: BasketSchedule,
}

fn load_options(config: &RunConfig) -> LoadOptions {
    LoadOptions {
        symbols: config.data.symbols.clone(),
        start: config.data.start,
        end: config.data.end,
    }
}

/// Build indicators for every asset, align, and build the basket schedule.
pub fn prepare_market(
    config: &RunConfig,
    bars: BTreeMap<String, Vec<RawBar>>,
) -> Result<PreparedMarket, RunError> {
    let primary = config.data.primary.as_str();
    let secondary = config.data.secondary.as_str();
    if !bars.contains_key(secondary) {
        warn!(secondary, "secondary anchor not loaded, running without it");
    }

    let series: Vec<AssetSeries> = bars
        .into_iter()
        .map(|(symbol, rows)| build_series(&symbol, rows, &config.indicators))
        .collect();
    info!(assets = series.len(), "indicators built");

    let market = MarketData::align(&series, primary, secondary)?;
    info!(
        dates = market.dates().len(),
        assets = market.asset_count(),
        "market aligned"
    );

    let selector = BasketSelector::new(&series, primary, secondary, config.basket.clone());
    let schedule = selector.build_schedule(&market);
    Ok(PreparedMarket { market, schedule })
}

/// Run the full walk-forward on pre-loaded rows.
pub fn run_from_data(
    config: &RunConfig,
    bars: BTreeMap<String, Vec<RawBar>>,
    dataset_hash: &str,
) -> Result<PipelineOutput, RunError> {
    config.validate()?;
    let run_id = config.run_id()?;
    let PreparedMarket { market, schedule } = prepare_market(config, bars)?;

    let result = {
        let simulator = Simulator::new(&market, &schedule, &config.simulation);
        run_walk_forward(&simulator, &config.grid, &config.walk_forward)?
    };
    let report = WalkForwardReport::build(
        &result,
        config.report.initial_capital,
        &run_id,
        dataset_hash,
    );

    Ok(PipelineOutput {
        run_id,
        dataset_hash: dataset_hash.to_string(),
        schedule,
        result,
        report,
    })
}

/// Load the configured data directory and run.
pub fn run_pipeline(config: &RunConfig) -> Result<PipelineOutput, RunError> {
    config.validate()?;
    let loaded = load_directory(&config.data.dir, &load_options(config))?;
    run_from_data(config, loaded.bars, &loaded.dataset_hash)
}

/// Load the configured data directory and build only the basket schedule.
pub fn build_baskets(config: &RunConfig) -> Result<BasketSchedule, RunError> {
    config.validate()?;
    let loaded = load_directory(&config.data.dir, &load_options(config))?;
    Ok(prepare_market(config, loaded.bars)?.schedule)
}

/// Artifact directory for a run: `<output_dir>/<first 12 hex of run id>`.
pub fn run_dir(config: &RunConfig, run_id: &str) -> PathBuf {
    config
        .report
        .output_dir
        .join(run_id.get(..12).unwrap_or(run_id))
}

/// Write the run's artifacts under the configured output directory.
pub fn save_outputs(config: &RunConfig, output: &PipelineOutput) -> Result<RunArtifacts, RunError> {
    let dir = run_dir(config, &output.run_id);
    let artifacts = save_artifacts(&dir, &output.report, &output.schedule, &output.result.oos)?;
    info!(dir = %artifacts.dir.display(), "artifacts written");
    Ok(artifacts)
}
