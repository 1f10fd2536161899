//! Walk-forward orchestration: consecutive calendar-day train/test windows.
//!
//! Windows start at the first reference date with a defined long moving
//! average. Each window optimizes on its training span, then simulates the
//! test span with the winning parameters, starting from the weights the
//! previous test segment ended with. Windows run strictly in order; only
//! the grid search inside a window is parallel.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use regimelab_core::domain::{DateWindow, ParameterSet};
use regimelab_core::engine::{SimulationResult, Simulator, WeightMap};

use crate::optimizer::{Optimizer, ParamGrid, WindowScore};

// ─── Configuration ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalkForwardConfig {
    /// Training span in calendar days.
    pub train_days: u32,
    /// Test span (and step) in calendar days.
    pub test_days: u32,
    /// Evaluate grid candidates in parallel.
    pub parallel: bool,
}

impl Default for WalkForwardConfig {
    fn default() -> Self {
        Self {
            train_days: 120,
            test_days: 45,
            parallel: true,
        }
    }
}

/// Errors from walk-forward orchestration.
#[derive(Debug, Error)]
pub enum WalkForwardError {
    #[error("invalid window: train_days={train_days}, test_days={test_days} (both must be positive and fit the calendar)")]
    InvalidWindow { train_days: u32, test_days: u32 },
}

// ─── Windows ─────────────────────────────────────────────────────────

/// One (train, test) pair; all bounds inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalkForwardWindow {
    pub index: usize,
    pub train_start: NaiveDate,
    pub train_end: NaiveDate,
    pub test_start: NaiveDate,
    pub test_end: NaiveDate,
}

impl WalkForwardWindow {
    pub fn train(&self) -> DateWindow {
        DateWindow::new(self.train_start, self.train_end)
    }

    pub fn test(&self) -> DateWindow {
        DateWindow::new(self.test_start, self.test_end)
    }
}

/// Lay out windows from `first` while the test span ends on or before `last`.
pub fn create_windows(
    first: NaiveDate,
    last: NaiveDate,
    config: &WalkForwardConfig,
) -> Result<Vec<WalkForwardWindow>, WalkForwardError> {
    let invalid = WalkForwardError::InvalidWindow {
        train_days: config.train_days,
        test_days: config.test_days,
    };
    if config.train_days == 0 || config.test_days == 0 {
        return Err(invalid);
    }
    let train = Duration::days(i64::from(config.train_days));
    let test = Duration::days(i64::from(config.test_days));

    // (train_end, test_start, test_end) for a window starting at `start`.
    let bounds = |start: NaiveDate| -> Option<(NaiveDate, NaiveDate, NaiveDate)> {
        let train_end = start.checked_add_signed(train)?.pred_opt()?;
        let test_start = train_end.succ_opt()?;
        let test_end = train_end.checked_add_signed(test)?;
        Some((train_end, test_start, test_end))
    };
    if bounds(first).is_none() {
        return Err(invalid);
    }

    let mut windows = Vec::new();
    let mut start = first;
    // Past the end of the calendar means past `last` too.
    while let Some((train_end, test_start, test_end)) = bounds(start) {
        if test_end > last {
            break;
        }
        windows.push(WalkForwardWindow {
            index: windows.len(),
            train_start: start,
            train_end,
            test_start,
            test_end,
        });
        match start.checked_add_signed(test) {
            Some(next) => start = next,
            None => break,
        }
    }
    Ok(windows)
}

// ─── Results ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowStatus {
    /// Parameters selected and the test segment simulated.
    Evaluated,
    /// No candidate scored on the training span; test segment skipped.
    NoViableParameters,
    /// Test segment had fewer than two dates.
    EmptyTest,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowOutcome {
    pub window: WalkForwardWindow,
    pub status: WindowStatus,
    pub params: Option<ParameterSet>,
    pub train_score: Option<WindowScore>,
    /// Empty unless `status` is `Evaluated`.
    pub test: SimulationResult,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalkForwardResult {
    pub windows: Vec<WindowOutcome>,
    /// Test segments concatenated in window order.
    pub oos: SimulationResult,
}

impl WalkForwardResult {
    pub fn evaluated_count(&self) -> usize {
        self.windows
            .iter()
            .filter(|w| w.status == WindowStatus::Evaluated)
            .count()
    }
}

// ─── Orchestration ───────────────────────────────────────────────────

/// Run every window of the simulator's market data.
pub fn run_walk_forward(
    simulator: &Simulator<'_>,
    grid: &ParamGrid,
    config: &WalkForwardConfig,
) -> Result<WalkForwardResult, WalkForwardError> {
    let market = simulator.market();
    let symbols = market.symbols().to_vec();

    let windows = match (market.first_valid_date(), market.dates().last()) {
        (Some(first), Some(&last)) => create_windows(first, last, config)?,
        _ => {
            warn!(
                reference = market.reference_symbol(),
                "reference never has a defined long moving average, no windows"
            );
            Vec::new()
        }
    };
    if windows.is_empty() {
        warn!(
            train_days = config.train_days,
            test_days = config.test_days,
            "history too short for a single walk-forward window"
        );
    }

    let optimizer = Optimizer::new(simulator, grid).with_parallelism(config.parallel);
    let mut carried: Option<WeightMap> = None;
    let mut outcomes = Vec::with_capacity(windows.len());

    for window in windows {
        info!(
            window = window.index,
            train = %format!("{}..{}", window.train_start, window.train_end),
            test = %format!("{}..{}", window.test_start, window.test_end),
            "optimizing window"
        );

        let Some(best) = optimizer.optimize(window.train()) else {
            warn!(window = window.index, "no viable parameter set, test segment skipped");
            outcomes.push(WindowOutcome {
                window,
                status: WindowStatus::NoViableParameters,
                params: None,
                train_score: None,
                test: SimulationResult::empty(symbols.clone()),
            });
            continue;
        };

        let test = simulator.run(&best.params, window.test(), carried.as_ref());
        let status = if test.is_empty() {
            warn!(window = window.index, "empty test segment");
            WindowStatus::EmptyTest
        } else {
            carried = Some(test.final_weights());
            WindowStatus::Evaluated
        };
        info!(
            window = window.index,
            params = %best.params,
            train_score = best.score.score,
            test_dates = test.len(),
            "window done"
        );
        outcomes.push(WindowOutcome {
            window,
            status,
            params: Some(best.params),
            train_score: Some(best.score),
            test,
        });
    }

    let oos = SimulationResult::concat(symbols, outcomes.iter().map(|o| &o.test));
    info!(
        windows = outcomes.len(),
        oos_dates = oos.len(),
        "walk-forward complete"
    );
    Ok(WalkForwardResult {
        windows: outcomes,
        oos,
    })
}
