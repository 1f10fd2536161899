//! Indicator Builder: raw OHLCV rows → an [`AssetSeries`] with every derived
//! field filled in.

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{Atr, Indicator, Roc, Rsi, Sma, TrailingLow};
use crate::domain::{AssetSeries, Bar, RawBar};

// ─── Configuration ───────────────────────────────────────────────────

/// Window lengths for the per-asset indicators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorConfig {
    pub short_ma: usize,
    pub long_ma: usize,
    pub momentum: usize,
    pub rsi: usize,
    pub atr: usize,
    pub rebound_lookback: usize,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            short_ma: 20,
            long_ma: 120,
            momentum: 30,
            rsi: 14,
            atr: 14,
            rebound_lookback: 30,
        }
    }
}

impl IndicatorConfig {
    /// (name, value) pairs, for validation messages.
    pub fn periods(&self) -> [(&'static str, usize); 6] {
        [
            ("short_ma", self.short_ma),
            ("long_ma", self.long_ma),
            ("momentum", self.momentum),
            ("rsi", self.rsi),
            ("atr", self.atr),
            ("rebound_lookback", self.rebound_lookback),
        ]
    }
}

// ─── Building ────────────────────────────────────────────────────────

/// Sort ascending by date and drop duplicate dates, keeping the first row.
pub fn canonicalize(symbol: &str, mut rows: Vec<RawBar>) -> Vec<RawBar> {
    // Stable sort keeps file order among equal dates.
    rows.sort_by_key(|r| r.date);
    let before = rows.len();
    rows.dedup_by_key(|r| r.date);
    let dropped = before - rows.len();
    if dropped > 0 {
        warn!(symbol, dropped, "duplicate dates removed, first occurrence kept");
    }
    rows
}

/// Build the indicator-enriched series for one asset.
pub fn build_series(symbol: &str, rows: Vec<RawBar>, config: &IndicatorConfig) -> AssetSeries {
    let rows = canonicalize(symbol, rows);
    let mut bars: Vec<Bar> = rows.iter().map(Bar::from_raw).collect();

    let ma_short = Sma::new(config.short_ma).compute(&bars);
    let ma_long = Sma::new(config.long_ma).compute(&bars);
    let momentum = Roc::close(config.momentum).compute(&bars);
    let rsi = Rsi::new(config.rsi).compute(&bars);
    let atr = Atr::new(config.atr).compute(&bars);
    let trailing_low = TrailingLow::new(config.rebound_lookback).compute(&bars);

    for (i, bar) in bars.iter_mut().enumerate() {
        bar.ma_short = ma_short[i];
        bar.ma_long = ma_long[i];
        bar.momentum = momentum[i];
        bar.rsi = rsi[i];
        bar.atr = atr[i];
        bar.trailing_low = trailing_low[i];
    }

    AssetSeries::new(symbol, bars)
}
