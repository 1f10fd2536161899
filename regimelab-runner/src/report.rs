//! Report Generator: summary statistics of simulated return series.
//!
//! A `TradeReport` compounds a return series from fixed notional capital.
//! The walk-forward report carries one per test segment plus one for the
//! concatenated out-of-sample series; an empty OOS series yields an explicit
//! `NoData` summary rather than zeros.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use regimelab_core::domain::ParameterSet;
use regimelab_core::engine::{EventKind, SimulationResult};

use crate::metrics::{
    cagr_pct, elapsed_days, equity_curve, max_drawdown_pct, sharpe_ratio, total_return_pct,
    yearly_returns_pct,
};
use crate::optimizer::WindowScore;
use crate::walk_forward::{WalkForwardResult, WindowStatus};

/// Current schema version for persisted reports.
pub const SCHEMA_VERSION: u32 = 1;

// ─── Trade report ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct YearlyReturn {
    pub year: i32,
    pub return_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeReport {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub trading_days: usize,
    pub initial_capital: f64,
    pub final_capital: f64,
    pub total_return_pct: f64,
    /// None when no calendar time elapsed.
    pub cagr_pct: Option<f64>,
    pub mdd_pct: f64,
    pub sharpe: f64,
    pub yearly_returns: Vec<YearlyReturn>,
    pub entries: usize,
    /// Exit count keyed by reason.
    pub exits: BTreeMap<String, usize>,
}

impl TradeReport {
    /// None for an empty result.
    pub fn from_result(result: &SimulationResult, initial_capital: f64) -> Option<Self> {
        let (&start, &end) = (result.dates.first()?, result.dates.last()?);
        let returns = result.portfolio_returns();
        let equity = equity_curve(&returns, initial_capital);
        let final_capital = equity.last().copied().unwrap_or(initial_capital);

        let mut exits = BTreeMap::new();
        for event in &result.events {
            if let EventKind::Exit(reason) = event.kind {
                *exits.entry(reason.to_string()).or_insert(0) += 1;
            }
        }

        Some(Self {
            start,
            end,
            trading_days: result.len(),
            initial_capital,
            final_capital,
            total_return_pct: total_return_pct(initial_capital, final_capital),
            cagr_pct: cagr_pct(initial_capital, final_capital, elapsed_days(&result.dates)),
            mdd_pct: max_drawdown_pct(&equity),
            sharpe: sharpe_ratio(&returns),
            yearly_returns: yearly_returns_pct(&result.dates, &returns)
                .into_iter()
                .map(|(year, return_pct)| YearlyReturn { year, return_pct })
                .collect(),
            entries: result.entry_count(),
            exits,
        })
    }
}

// ─── Walk-forward report ─────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowReport {
    pub index: usize,
    pub train_start: NaiveDate,
    pub train_end: NaiveDate,
    pub test_start: NaiveDate,
    pub test_end: NaiveDate,
    pub status: WindowStatus,
    pub params: Option<ParameterSet>,
    pub train_score: Option<WindowScore>,
    pub test: Option<TradeReport>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReportSummary {
    Ok(TradeReport),
    NoData { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalkForwardReport {
    pub schema_version: u32,
    pub run_id: String,
    pub dataset_hash: String,
    pub symbols: Vec<String>,
    pub summary: ReportSummary,
    pub windows: Vec<WindowReport>,
}

impl WalkForwardReport {
    pub fn build(
        result: &WalkForwardResult,
        initial_capital: f64,
        run_id: &str,
        dataset_hash: &str,
    ) -> Self {
        let windows = result
            .windows
            .iter()
            .map(|o| WindowReport {
                index: o.window.index,
                train_start: o.window.train_start,
                train_end: o.window.train_end,
                test_start: o.window.test_start,
                test_end: o.window.test_end,
                status: o.status,
                params: o.params,
                train_score: o.train_score,
                test: TradeReport::from_result(&o.test, initial_capital),
            })
            .collect();

        let summary = match TradeReport::from_result(&result.oos, initial_capital) {
            Some(report) => ReportSummary::Ok(report),
            None if result.windows.is_empty() => ReportSummary::NoData {
                reason: "history too short for a walk-forward window".to_string(),
            },
            None => ReportSummary::NoData {
                reason: "no window produced out-of-sample returns".to_string(),
            },
        };

        Self {
            schema_version: SCHEMA_VERSION,
            run_id: run_id.to_string(),
            dataset_hash: dataset_hash.to_string(),
            symbols: result.oos.symbols.clone(),
            summary,
            windows,
        }
    }

    /// Plain-text summary for terminal output.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "run {}", short(&self.run_id));
        match &self.summary {
            ReportSummary::NoData { reason } => {
                let _ = writeln!(out, "NO DATA: {reason}");
            }
            ReportSummary::Ok(r) => {
                let _ = writeln!(out, "OOS {} .. {} ({} days)", r.start, r.end, r.trading_days);
                let cagr = r
                    .cagr_pct
                    .map_or_else(|| "n/a".to_string(), |c| format!("{c:.2}%"));
                let _ = writeln!(out, "  CAGR          {cagr}");
                let _ = writeln!(out, "  Max drawdown  {:.2}%", r.mdd_pct);
                let _ = writeln!(out, "  Final capital {:.2}", r.final_capital);
                let _ = writeln!(out, "  Sharpe        {:.2}", r.sharpe);
                for y in &r.yearly_returns {
                    let _ = writeln!(out, "  {}          {:.2}%", y.year, y.return_pct);
                }
                let _ = writeln!(out, "  Entries       {}", r.entries);
                for (reason, n) in &r.exits {
                    let _ = writeln!(out, "  exit {reason:<16} {n}");
                }
            }
        }
        for w in &self.windows {
            let params = w
                .params
                .map_or_else(|| "-".to_string(), |p| p.to_string());
            let _ = writeln!(
                out,
                "  window {:>3} test {}..{}  {:?}  {}",
                w.index, w.test_start, w.test_end, w.status, params
            );
        }
        out
    }
}

fn short(id: &str) -> &str {
    id.get(..12).unwrap_or(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use regimelab_core::engine::{ExitReason, PositionEvent};

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn sample() -> SimulationResult {
        let mut r = SimulationResult::empty(vec!["BTC".to_string()]);
        for (i, ret) in [0.0, 0.1, -0.2, 0.05].iter().enumerate() {
            r.dates.push(d(1 + i as u32));
            r.returns.push(vec![*ret]);
            r.weights.push(vec![0.4]);
        }
        for (kind, day) in [
            (EventKind::Entry, 1),
            (EventKind::Exit(ExitReason::AtrStop), 2),
            (EventKind::Exit(ExitReason::AtrStop), 3),
            (EventKind::Exit(ExitReason::BearRegime), 4),
        ] {
            r.events.push(PositionEvent {
                date: d(day),
                symbol: "BTC".to_string(),
                kind,
                price: 100.0,
                weight: 0.0,
            });
        }
        r
    }

    #[test]
    fn trade_report_statistics() {
        let report = TradeReport::from_result(&sample(), 1_000_000.0).unwrap();
        let final_cap = 1_000_000.0 * 1.1 * 0.8 * 1.05;
        assert!((report.final_capital - final_cap).abs() < 1e-6);
        assert!((report.mdd_pct - (-20.0)).abs() < 1e-9);
        assert!((report.total_return_pct - (final_cap / 1e6 - 1.0) * 100.0).abs() < 1e-9);
        let cagr = ((final_cap / 1e6).powf(365.25 / 3.0) - 1.0) * 100.0;
        assert!((report.cagr_pct.unwrap() - cagr).abs() < 1e-6 * cagr.abs().max(1.0));
        assert_eq!(report.trading_days, 4);
        assert_eq!(report.entries, 1);
        assert_eq!(report.exits["atr_stop"], 2);
        assert_eq!(report.exits["bear_regime"], 1);
        assert_eq!(report.yearly_returns.len(), 1);
        assert_eq!(report.yearly_returns[0].year, 2024);
    }

    #[test]
    fn empty_result_has_no_report() {
        let empty = SimulationResult::empty(vec!["BTC".to_string()]);
        assert!(TradeReport::from_result(&empty, 1.0).is_none());
    }

    #[test]
    fn empty_oos_gives_no_data_summary() {
        let result = WalkForwardResult {
            windows: Vec::new(),
            oos: SimulationResult::empty(vec!["BTC".to_string()]),
        };
        let report = WalkForwardReport::build(&result, 1e6, "abc", "def");
        assert!(matches!(report.summary, ReportSummary::NoData { .. }));
        assert!(report.render_text().contains("NO DATA"));

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["summary"]["status"], "no_data");
    }

    #[test]
    fn summary_serializes_with_status_tag() {
        let result = WalkForwardResult {
            windows: Vec::new(),
            oos: sample(),
        };
        let report = WalkForwardReport::build(&result, 1e6, "0123456789abcdef", "h");
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["summary"]["status"], "ok");
        assert_eq!(json["schema_version"], 1);
        assert!(report.render_text().starts_with("run 0123456789ab"));
    }
}
