//! Serializable run configuration, loaded from TOML.
//!
//! Every section is `#[serde(default)]`, so an empty file is a valid config
//! that reproduces the stock strategy. `run_id()` hashes the canonical JSON
//! form, so two runs with identical configs share an id.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use regimelab_core::basket::BasketConfig;
use regimelab_core::engine::SimConfig;
use regimelab_core::indicators::IndicatorConfig;

use crate::optimizer::ParamGrid;
use crate::walk_forward::WalkForwardConfig;

/// Unique identifier for a run (content-addressable hash).
pub type RunId = String;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ─── Sections ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Directory holding one `<SYMBOL>.csv` per asset.
    pub dir: PathBuf,
    /// Reference asset; regimes are read from its bars.
    pub primary: String,
    pub secondary: String,
    /// Restrict loading to these symbols. None loads every CSV in `dir`.
    pub symbols: Option<Vec<String>>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("data"),
            primary: "BTC".to_string(),
            secondary: "ETH".to_string(),
            symbols: None,
            start: None,
            end: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub initial_capital: f64,
    /// Artifacts land in `<output_dir>/<run id prefix>/`.
    pub output_dir: PathBuf,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            initial_capital: 1_000_000.0,
            output_dir: PathBuf::from("output"),
        }
    }
}

// ─── Run config ──────────────────────────────────────────────────────

/// Everything needed to reproduce one walk-forward run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub data: DataConfig,
    pub indicators: IndicatorConfig,
    pub basket: BasketConfig,
    pub simulation: SimConfig,
    pub grid: ParamGrid,
    pub walk_forward: WalkForwardConfig,
    pub report: ReportConfig,
}

impl RunConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    /// Parse and validate a TOML document.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: RunConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        if self.data.primary.is_empty() {
            return invalid("data.primary must name an asset".into());
        }
        if self.data.primary == self.data.secondary {
            return invalid(format!(
                "data.primary and data.secondary are both '{}'",
                self.data.primary
            ));
        }
        if let (Some(start), Some(end)) = (self.data.start, self.data.end) {
            if start > end {
                return invalid(format!("data.start {start} is after data.end {end}"));
            }
        }

        for (name, period) in self.indicators.periods() {
            if period == 0 {
                return invalid(format!("indicators.{name} must be positive"));
            }
        }
        let b = &self.basket;
        if b.top_k == 0 {
            return invalid("basket.top_k must be positive".into());
        }
        for (name, period) in [
            ("return_lookback", b.return_lookback),
            ("fast_ma", b.fast_ma),
            ("slow_ma", b.slow_ma),
            ("volume_lookback", b.volume_lookback),
        ] {
            if period == 0 {
                return invalid(format!("basket.{name} must be positive"));
            }
        }

        let s = &self.simulation;
        if !(s.fee >= 0.0) || !(s.default_slippage >= 0.0) {
            return invalid("simulation.fee and default_slippage must be non-negative".into());
        }
        if let Some((symbol, _)) = s.slippage.iter().find(|(_, v)| !(**v >= 0.0)) {
            return invalid(format!("simulation.slippage.{symbol} must be non-negative"));
        }
        if !(s.drawdown_limit > 0.0 && s.drawdown_limit <= 1.0) {
            return invalid(format!(
                "simulation.drawdown_limit {} must be in (0, 1]",
                s.drawdown_limit
            ));
        }
        if !(s.rebalance_threshold >= 0.0 && s.rebalance_threshold < 1.0) {
            return invalid(format!(
                "simulation.rebalance_threshold {} must be in [0, 1)",
                s.rebalance_threshold
            ));
        }
        if !(s.atr_multiplier > 0.0) {
            return invalid("simulation.atr_multiplier must be positive".into());
        }
        if let Some(stop) = &s.trailing_stop {
            if !(stop.activation_pct > 0.0) || !(stop.callback_pct > 0.0 && stop.callback_pct < 100.0) {
                return invalid("simulation.trailing_stop percentages are out of range".into());
            }
        }

        if self.grid.size() == 0 {
            return invalid("grid must contain at least one parameter set".into());
        }
        if self.walk_forward.train_days == 0 || self.walk_forward.test_days == 0 {
            return invalid("walk_forward.train_days and test_days must be positive".into());
        }
        if !(self.report.initial_capital > 0.0) {
            return invalid("report.initial_capital must be positive".into());
        }
        Ok(())
    }

    /// Deterministic BLAKE3 hash of the canonical JSON form.
    pub fn run_id(&self) -> Result<RunId, ConfigError> {
        let json = serde_json::to_string(self)?;
        Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
    }
}
