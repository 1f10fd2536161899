//! Parameter Optimizer: grid search over one training window.
//!
//! Every candidate is simulated independently (in parallel via Rayon when
//! enabled); the reduction walks results in grid order, so the first
//! candidate wins ties regardless of thread scheduling.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use regimelab_core::domain::{DateWindow, ParameterSet};
use regimelab_core::engine::{SimulationResult, Simulator};

use crate::metrics::{cagr_pct, elapsed_days, equity_curve, max_drawdown_pct};

// ─── Grid ────────────────────────────────────────────────────────────

/// Cartesian product of rebound × RSI thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParamGrid {
    pub rebound_thresholds: Vec<f64>,
    pub rsi_thresholds: Vec<f64>,
}

impl Default for ParamGrid {
    fn default() -> Self {
        Self {
            rebound_thresholds: vec![15.0, 18.0],
            rsi_thresholds: vec![55.0, 60.0],
        }
    }
}

impl ParamGrid {
    /// Candidates in grid order: rebound threshold outer, RSI inner.
    pub fn candidates(&self) -> Vec<ParameterSet> {
        self.rebound_thresholds
            .iter()
            .flat_map(|&rb| {
                self.rsi_thresholds
                    .iter()
                    .map(move |&rsi| ParameterSet::new(rb, rsi))
            })
            .collect()
    }

    pub fn size(&self) -> usize {
        self.rebound_thresholds.len() * self.rsi_thresholds.len()
    }
}

// ─── Scoring ─────────────────────────────────────────────────────────

/// Training-window score: CAGR% + MDD% (MDD is ≤ 0, so it penalizes).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowScore {
    pub cagr_pct: f64,
    pub mdd_pct: f64,
    pub score: f64,
}

/// Score a simulation on unit capital.
///
/// None for results with fewer than 2 dates, no elapsed calendar time, or a
/// non-finite score.
pub fn score_result(result: &SimulationResult) -> Option<WindowScore> {
    if result.len() < 2 {
        return None;
    }
    let days = elapsed_days(&result.dates);
    let equity = equity_curve(&result.portfolio_returns(), 1.0);
    let final_value = *equity.last()?;
    let cagr = cagr_pct(1.0, final_value, days)?;
    let mdd = max_drawdown_pct(&equity);
    let score = cagr + mdd;
    score.is_finite().then_some(WindowScore {
        cagr_pct: cagr,
        mdd_pct: mdd,
        score,
    })
}

/// Winning candidate of a grid search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    /// Position in grid order.
    pub index: usize,
    pub params: ParameterSet,
    pub score: WindowScore,
}

/// Evaluate every candidate and keep the best score.
///
/// Candidates whose evaluation returns None are skipped. Ties go to the
/// lowest index. None when no candidate scores.
pub fn select_best<F>(candidates: &[ParameterSet], parallel: bool, evaluate: F) -> Option<Selection>
where
    F: Fn(&ParameterSet) -> Option<WindowScore> + Sync,
{
    let scored: Vec<Option<WindowScore>> = if parallel {
        candidates.par_iter().map(&evaluate).collect()
    } else {
        candidates.iter().map(&evaluate).collect()
    };

    let mut best: Option<Selection> = None;
    for (index, (params, score)) in candidates.iter().zip(scored).enumerate() {
        let Some(score) = score else {
            debug!(%params, "candidate skipped: no score");
            continue;
        };
        debug!(%params, score = score.score, cagr = score.cagr_pct, mdd = score.mdd_pct, "candidate scored");
        if best.map_or(true, |b| score.score > b.score.score) {
            best = Some(Selection {
                index,
                params: *params,
                score,
            });
        }
    }
    best
}

// ─── Optimizer ───────────────────────────────────────────────────────

/// Grid search over a simulator, one training window at a time.
pub struct Optimizer<'a> {
    simulator: &'a Simulator<'a>,
    candidates: Vec<ParameterSet>,
    parallel: bool,
}

impl<'a> Optimizer<'a> {
    pub fn new(simulator: &'a Simulator<'a>, grid: &ParamGrid) -> Self {
        Self {
            simulator,
            candidates: grid.candidates(),
            parallel: true,
        }
    }

    /// Enables or disables parallel evaluation.
    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn candidates(&self) -> &[ParameterSet] {
        &self.candidates
    }

    /// Best parameter set on `train`, each candidate starting flat.
    pub fn optimize(&self, train: DateWindow) -> Option<Selection> {
        select_best(&self.candidates, self.parallel, |params| {
            score_result(&self.simulator.run(params, train, None))
        })
    }
}
