//! Simulation output: per-date × per-asset returns and weights, plus the
//! position event log.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::state::WeightMap;

/// Why a held position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    /// Close fell below the buffered long moving average.
    BelowTrend,
    RsiFade,
    AtrStop,
    TrailingStop,
    /// Regime no longer assigns weight to the asset.
    RegimeDropped,
    DataGap,
    BearRegime,
    CircuitBreaker,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExitReason::BelowTrend => "below_trend",
            ExitReason::RsiFade => "rsi_fade",
            ExitReason::AtrStop => "atr_stop",
            ExitReason::TrailingStop => "trailing_stop",
            ExitReason::RegimeDropped => "regime_dropped",
            ExitReason::DataGap => "data_gap",
            ExitReason::BearRegime => "bear_regime",
            ExitReason::CircuitBreaker => "circuit_breaker",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Entry,
    Exit(ExitReason),
}

/// A committed entry or exit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionEvent {
    pub date: NaiveDate,
    pub symbol: String,
    pub kind: EventKind,
    /// Close on the event date (NaN on a data gap).
    pub price: f64,
    /// Weight after the event.
    pub weight: f64,
}

/// Result of one simulation run. Rows are dates, columns are `symbols`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub symbols: Vec<String>,
    pub dates: Vec<NaiveDate>,
    /// Return contribution per asset, net of trading costs.
    pub returns: Vec<Vec<f64>>,
    /// Weight per asset after the date's rebalance.
    pub weights: Vec<Vec<f64>>,
    pub events: Vec<PositionEvent>,
}

impl SimulationResult {
    pub fn empty(symbols: Vec<String>) -> Self {
        Self {
            symbols,
            dates: Vec::new(),
            returns: Vec::new(),
            weights: Vec::new(),
            events: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    /// Portfolio return per date (sum of contributions).
    pub fn portfolio_returns(&self) -> Vec<f64> {
        self.returns.iter().map(|row| row.iter().sum()).collect()
    }

    /// Compounded equity starting from `initial`, one value per date.
    pub fn equity_curve(&self, initial: f64) -> Vec<f64> {
        let mut equity = initial;
        self.portfolio_returns()
            .into_iter()
            .map(|r| {
                equity *= 1.0 + r;
                equity
            })
            .collect()
    }

    fn weight_map(&self, row: Option<&Vec<f64>>) -> WeightMap {
        row.map(|w| {
            self.symbols
                .iter()
                .zip(w)
                .filter(|(_, w)| **w > 0.0)
                .map(|(s, &w)| (s.clone(), w))
                .collect()
        })
        .unwrap_or_default()
    }

    /// Weights on the first date.
    pub fn initial_weights(&self) -> WeightMap {
        self.weight_map(self.weights.first())
    }

    /// Weights on the last date, carried into the next segment.
    pub fn final_weights(&self) -> WeightMap {
        self.weight_map(self.weights.last())
    }

    pub fn entry_count(&self) -> usize {
        self.events
            .iter()
            .filter(|e| e.kind == EventKind::Entry)
            .count()
    }

    /// Concatenate results in order. Empty parts are skipped; every part is
    /// expected to carry the same `symbols` columns.
    pub fn concat<'a>(
        symbols: Vec<String>,
        parts: impl IntoIterator<Item = &'a SimulationResult>,
    ) -> Self {
        let mut out = Self::empty(symbols);
        for part in parts.into_iter().filter(|p| !p.is_empty()) {
            out.dates.extend_from_slice(&part.dates);
            out.returns.extend(part.returns.iter().cloned());
            out.weights.extend(part.weights.iter().cloned());
            out.events.extend(part.events.iter().cloned());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(start_day: u32, rets: &[f64]) -> SimulationResult {
        let symbols = vec!["BTC".to_string(), "ETH".to_string()];
        let dates = (0..rets.len())
            .map(|i| NaiveDate::from_ymd_opt(2024, 1, start_day + i as u32).unwrap())
            .collect();
        SimulationResult {
            symbols,
            dates,
            returns: rets.iter().map(|&r| vec![r, 0.0]).collect(),
            weights: rets.iter().map(|_| vec![0.4, 0.0]).collect(),
            events: Vec::new(),
        }
    }

    #[test]
    fn equity_compounds_portfolio_returns() {
        let r = result(1, &[0.0, 0.1, -0.1]);
        let eq = r.equity_curve(100.0);
        assert!((eq[1] - 110.0).abs() < 1e-9);
        assert!((eq[2] - 99.0).abs() < 1e-9);
    }

    #[test]
    fn final_weights_skip_zero() {
        let r = result(1, &[0.0, 0.01]);
        let w = r.final_weights();
        assert_eq!(w.len(), 1);
        assert_eq!(w.get("BTC"), Some(&0.4));
    }

    #[test]
    fn concat_skips_empty_parts() {
        let a = result(1, &[0.0, 0.01]);
        let empty = SimulationResult::empty(a.symbols.clone());
        let b = result(10, &[0.02]);
        let all = SimulationResult::concat(a.symbols.clone(), [&a, &empty, &b]);
        assert_eq!(all.len(), 3);
        assert_eq!(all.dates[2], NaiveDate::from_ymd_opt(2024, 1, 10).unwrap());
    }

    #[test]
    fn concat_of_nothing_is_empty() {
        let all = SimulationResult::concat(vec!["BTC".to_string()], []);
        assert!(all.is_empty());
        assert_eq!(all.symbols, vec!["BTC".to_string()]);
    }
}
