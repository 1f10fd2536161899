//! Basket Selector: rank satellites per regime and build the schedule.
//!
//! Features are precomputed once per satellite on its own bar history, so a
//! selection at date d reads only values derived from bars dated <= d.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::score::{AssetFeatures, ScoreWeights};
use super::{period_id, BasketEntry, BasketSchedule};
use crate::domain::{AssetSeries, MarketData, Regime};
use crate::indicators::{Indicator, Roc, Sma};

// ─── Configuration ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BasketConfig {
    pub top_k: usize,
    /// Minimum bars to date for an asset to be ranked.
    pub min_bars: usize,
    pub return_lookback: usize,
    pub fast_ma: usize,
    pub slow_ma: usize,
    pub volume_lookback: usize,
    pub bull_weights: ScoreWeights,
    pub side_weights: ScoreWeights,
}

impl Default for BasketConfig {
    fn default() -> Self {
        Self {
            top_k: 7,
            min_bars: 120,
            return_lookback: 90,
            fast_ma: 10,
            slow_ma: 30,
            volume_lookback: 30,
            bull_weights: ScoreWeights::bull(),
            side_weights: ScoreWeights::side(),
        }
    }
}

impl BasketConfig {
    pub fn weights_for(&self, regime: Regime) -> Option<&ScoreWeights> {
        match regime {
            Regime::Bull => Some(&self.bull_weights),
            Regime::Side => Some(&self.side_weights),
            Regime::Bear | Regime::Unknown => None,
        }
    }
}

// ─── Per-asset feature tables ────────────────────────────────────────

/// Running sums over (satellite return, reference return) pairs.
#[derive(Debug, Clone, Copy, Default)]
struct CorrSums {
    n: f64,
    x: f64,
    y: f64,
    xx: f64,
    yy: f64,
    xy: f64,
}

impl CorrSums {
    fn add(&self, x: f64, y: f64) -> Self {
        Self {
            n: self.n + 1.0,
            x: self.x + x,
            y: self.y + y,
            xx: self.xx + x * x,
            yy: self.yy + y * y,
            xy: self.xy + x * y,
        }
    }

    fn pearson(&self) -> f64 {
        if self.n < 2.0 {
            return f64::NAN;
        }
        let cov = self.xy - self.x * self.y / self.n;
        let var_x = self.xx - self.x * self.x / self.n;
        let var_y = self.yy - self.y * self.y / self.n;
        if var_x <= 0.0 || var_y <= 0.0 {
            return f64::NAN;
        }
        (cov / (var_x.sqrt() * var_y.sqrt())).clamp(-1.0, 1.0)
    }
}

#[derive(Debug, Clone)]
struct SatelliteTable {
    symbol: String,
    dates: Vec<NaiveDate>,
    ret: Vec<f64>,
    momentum: Vec<f64>,
    volume_change: Vec<f64>,
    /// Dates of the paired returns, and prefix sums (index 0 = empty).
    corr_dates: Vec<NaiveDate>,
    corr_prefix: Vec<CorrSums>,
}

impl SatelliteTable {
    fn build(series: &AssetSeries, reference: &AssetSeries, config: &BasketConfig) -> Self {
        let bars = &series.bars;
        let ret = Roc::close(config.return_lookback).compute(bars);
        let fast = Sma::new(config.fast_ma).compute(bars);
        let slow = Sma::new(config.slow_ma).compute(bars);
        let momentum = fast.iter().zip(&slow).map(|(f, s)| f / s - 1.0).collect();
        let volume_change = Roc::volume(config.volume_lookback).compute(bars);

        let own_returns = Roc::close(1).compute(bars);
        let ref_returns = Roc::close(1).compute(&reference.bars);
        let mut corr_dates = Vec::new();
        let mut corr_prefix = vec![CorrSums::default()];
        let mut j = 0;
        for (i, bar) in bars.iter().enumerate() {
            while j < reference.bars.len() && reference.bars[j].date < bar.date {
                j += 1;
            }
            if j == reference.bars.len() {
                break;
            }
            if reference.bars[j].date != bar.date {
                continue;
            }
            let (x, y) = (own_returns[i], ref_returns[j]);
            if x.is_finite() && y.is_finite() {
                let last = corr_prefix[corr_prefix.len() - 1];
                corr_prefix.push(last.add(x, y));
                corr_dates.push(bar.date);
            }
        }

        Self {
            symbol: series.symbol.clone(),
            dates: bars.iter().map(|b| b.date).collect(),
            ret,
            momentum,
            volume_change,
            corr_dates,
            corr_prefix,
        }
    }

    /// Features as of `date`, or None with fewer than `min_bars` bars to date.
    fn features_at(&self, date: NaiveDate, min_bars: usize) -> Option<AssetFeatures> {
        let count = self.dates.partition_point(|d| *d <= date);
        if count == 0 || count < min_bars {
            return None;
        }
        let i = count - 1;
        let pairs = self.corr_dates.partition_point(|d| *d <= date);
        Some(AssetFeatures {
            ret: self.ret[i],
            momentum: self.momentum[i],
            volume_change: self.volume_change[i],
            correlation: self.corr_prefix[pairs].pearson(),
        })
    }
}

// ─── Selector ────────────────────────────────────────────────────────

/// Ranks satellites by the regime's linear score.
#[derive(Debug, Clone)]
pub struct BasketSelector {
    config: BasketConfig,
    tables: Vec<SatelliteTable>,
}

impl BasketSelector {
    /// Every asset other than the two anchors is a satellite candidate, in
    /// the order given. Without the primary anchor no correlation pairs
    /// exist and every correlation takes its sentinel.
    pub fn new(series: &[AssetSeries], primary: &str, secondary: &str, config: BasketConfig) -> Self {
        let empty = AssetSeries::new(primary, Vec::new());
        let reference = series
            .iter()
            .find(|s| s.symbol == primary)
            .unwrap_or(&empty);
        let tables = series
            .iter()
            .filter(|s| s.symbol != primary && s.symbol != secondary)
            .map(|s| SatelliteTable::build(s, reference, &config))
            .collect();
        Self { config, tables }
    }

    pub fn config(&self) -> &BasketConfig {
        &self.config
    }

    pub fn candidate_count(&self) -> usize {
        self.tables.len()
    }

    /// Features of every eligible satellite at `date`, in candidate order.
    pub fn features_at(&self, date: NaiveDate) -> Vec<(&str, AssetFeatures)> {
        self.tables
            .iter()
            .filter_map(|t| {
                t.features_at(date, self.config.min_bars)
                    .map(|f| (t.symbol.as_str(), f))
            })
            .collect()
    }

    /// Top-K satellites for `regime` at `date`. Empty for BEAR and UNKNOWN.
    pub fn select(&self, regime: Regime, date: NaiveDate) -> Vec<String> {
        let Some(weights) = self.config.weights_for(regime) else {
            return Vec::new();
        };
        let mut scored: Vec<(&str, f64)> = self
            .features_at(date)
            .into_iter()
            .map(|(symbol, f)| (symbol, f.score(weights)))
            .collect();
        // Stable: ties keep candidate order.
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored
            .into_iter()
            .take(self.config.top_k)
            .map(|(symbol, _)| symbol.to_string())
            .collect()
    }

    /// One entry per reference date, using that date's regime.
    pub fn build_schedule(&self, market: &MarketData) -> BasketSchedule {
        let entries: Vec<BasketEntry> = market
            .dates()
            .iter()
            .enumerate()
            .map(|(t, &date)| {
                let regime = Regime::classify(market.reference_bar(t));
                BasketEntry {
                    id: period_id(t),
                    start: date,
                    satellites: self.select(regime, date),
                }
            })
            .collect();

        let non_empty = entries.iter().filter(|e| !e.satellites.is_empty()).count();
        info!(
            entries = entries.len(),
            non_empty,
            candidates = self.tables.len(),
            "basket schedule built"
        );
        debug!(top_k = self.config.top_k, min_bars = self.config.min_bars, "basket config");
        BasketSchedule::new(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Bar, RawBar};

    fn series(symbol: &str, closes: &[f64], offset: i64) -> AssetSeries {
        let base = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| {
                Bar::from_raw(&RawBar {
                    date: base + chrono::Duration::days(offset + i as i64),
                    open: c,
                    high: c,
                    low: c,
                    close: c,
                    volume: 1000.0 + i as f64,
                })
            })
            .collect();
        AssetSeries::new(symbol, bars)
    }

    fn small_config() -> BasketConfig {
        BasketConfig {
            top_k: 2,
            min_bars: 5,
            return_lookback: 3,
            fast_ma: 2,
            slow_ma: 3,
            volume_lookback: 3,
            ..BasketConfig::default()
        }
    }

    fn ramp(n: usize, step: f64) -> Vec<f64> {
        (0..n).map(|i| 100.0 + step * i as f64).collect()
    }

    #[test]
    fn bear_and_unknown_yield_empty_basket() {
        let data = vec![series("BTC", &ramp(10, 1.0), 0), series("SOL", &ramp(10, 2.0), 0)];
        let selector = BasketSelector::new(&data, "BTC", "ETH", small_config());
        let date = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        assert!(selector.select(Regime::Bear, date).is_empty());
        assert!(selector.select(Regime::Unknown, date).is_empty());
        assert_eq!(selector.select(Regime::Bull, date), vec!["SOL".to_string()]);
    }

    #[test]
    fn ranks_by_score_and_truncates() {
        let data = vec![
            series("BTC", &ramp(10, 1.0), 0),
            series("ETH", &ramp(10, 1.0), 0),
            series("SLOW", &ramp(10, 0.5), 0),
            series("FAST", &ramp(10, 5.0), 0),
            series("MID", &ramp(10, 2.0), 0),
        ];
        let selector = BasketSelector::new(&data, "BTC", "ETH", small_config());
        assert_eq!(selector.candidate_count(), 3);
        let date = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        assert_eq!(
            selector.select(Regime::Bull, date),
            vec!["FAST".to_string(), "MID".to_string()]
        );
    }

    #[test]
    fn short_history_is_excluded() {
        let data = vec![
            series("BTC", &ramp(10, 1.0), 0),
            series("OLD", &ramp(10, 1.0), 0),
            series("NEW", &ramp(4, 10.0), 6),
        ];
        let selector = BasketSelector::new(&data, "BTC", "ETH", small_config());
        let date = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        assert_eq!(selector.select(Regime::Side, date), vec!["OLD".to_string()]);
    }

    #[test]
    fn ties_keep_candidate_order() {
        let data = vec![
            series("BTC", &ramp(10, 1.0), 0),
            series("B", &ramp(10, 1.0), 0),
            series("A", &ramp(10, 1.0), 0),
        ];
        let selector = BasketSelector::new(&data, "BTC", "ETH", small_config());
        let date = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        assert_eq!(
            selector.select(Regime::Bull, date),
            vec!["B".to_string(), "A".to_string()]
        );
    }

    #[test]
    fn correlation_of_identical_returns_is_one() {
        let closes = vec![100.0, 101.0, 99.0, 103.0, 102.0, 104.0];
        let data = vec![series("BTC", &closes, 0), series("TWIN", &closes, 0)];
        let selector = BasketSelector::new(&data, "BTC", "ETH", small_config());
        let date = NaiveDate::from_ymd_opt(2024, 1, 6).unwrap();
        let features = selector.features_at(date);
        assert_eq!(features.len(), 1);
        assert!((features[0].1.correlation - 1.0).abs() < 1e-9);
    }
}
