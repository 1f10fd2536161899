//! RegimeLab Runner: data loading, walk-forward orchestration, reports.
//!
//! This crate builds on `regimelab-core` to provide:
//! - TOML run configuration with a content-addressed run id
//! - CSV bar loading, dataset hashing and synthetic data
//! - Parameter grid optimizer (parallel, deterministic tie-break)
//! - Walk-forward orchestrator chaining test segments
//! - Performance metrics, reports and artifact export

pub mod config;
pub mod data_loader;
pub mod export;
pub mod metrics;
pub mod optimizer;
pub mod report;
pub mod runner;
pub mod walk_forward;

pub use config::{ConfigError, DataConfig, ReportConfig, RunConfig, RunId};
pub use data_loader::{
    compute_dataset_hash, generate_synthetic_bars, load_csv, load_directory, write_csv,
    LoadError, LoadOptions, LoadedData,
};
pub use export::{save_artifacts, ExportError, RunArtifacts};
pub use optimizer::{score_result, select_best, Optimizer, ParamGrid, Selection, WindowScore};
pub use report::{ReportSummary, TradeReport, WalkForwardReport, WindowReport};
pub use runner::{
    build_baskets, prepare_market, run_from_data, run_pipeline, save_outputs, PipelineOutput,
    PreparedMarket, RunError,
};
pub use walk_forward::{
    create_windows, run_walk_forward, WalkForwardConfig, WalkForwardError, WalkForwardResult,
    WalkForwardWindow, WindowOutcome, WindowStatus,
};
