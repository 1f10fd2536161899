//! Portfolio Simulator: path-dependent daily loop over one date window.
//!
//! Per date t (after the window's first date):
//! 1. Mark-to-market with the previous date's weights
//! 2. Circuit breaker on running equity vs. its peak
//! 3. Regime gate and per-asset entry / exit / hold decisions
//! 4. Proportional scaling, no-op rebalance rule, trading costs
//! 5. Commit position state and log entries/exits

use tracing::{debug, warn};

use super::config::{RoleWeights, SatelliteAllocation, SimConfig};
use super::result::{EventKind, ExitReason, PositionEvent, SimulationResult};
use super::state::{PositionState, WeightMap};
use crate::basket::{BasketEntry, BasketSchedule};
use crate::domain::{AssetRole, Bar, DateWindow, MarketData, ParameterSet, Regime};

/// Tolerance on Σ weights before rescaling.
pub const WEIGHT_EPSILON: f64 = 1e-12;

/// Target for one asset on one date.
#[derive(Debug, Clone, Copy)]
struct Decision {
    target: f64,
    exit: Option<ExitReason>,
}

impl Decision {
    fn hold(target: f64) -> Self {
        Self { target, exit: None }
    }

    fn flat(exit: Option<ExitReason>) -> Self {
        Self { target: 0.0, exit }
    }
}

/// Runs the strategy over date windows of one aligned data set.
///
/// The simulator only borrows its inputs; each [`Simulator::run`] owns its
/// position state, so runs are independent and can execute in parallel.
#[derive(Debug, Clone)]
pub struct Simulator<'a> {
    market: &'a MarketData,
    schedule: &'a BasketSchedule,
    config: &'a SimConfig,
    cost_rates: Vec<f64>,
}

impl<'a> Simulator<'a> {
    pub fn new(market: &'a MarketData, schedule: &'a BasketSchedule, config: &'a SimConfig) -> Self {
        let cost_rates = market
            .symbols()
            .iter()
            .map(|s| config.cost_rate(s))
            .collect();
        Self {
            market,
            schedule,
            config,
            cost_rates,
        }
    }

    pub fn market(&self) -> &MarketData {
        self.market
    }

    pub fn config(&self) -> &SimConfig {
        self.config
    }

    /// Simulate `window` starting from `initial` weights (flat if None).
    ///
    /// Windows with fewer than two dates produce an empty result.
    pub fn run(
        &self,
        params: &ParameterSet,
        window: DateWindow,
        initial: Option<&WeightMap>,
    ) -> SimulationResult {
        let symbols = self.market.symbols().to_vec();
        let range = self.market.index_range(&window);
        if range.len() < 2 {
            return SimulationResult::empty(symbols);
        }

        let n = symbols.len();
        let start = range.start;
        let mut states = self.initial_states(start, initial);
        let mut result = SimulationResult::empty(symbols);
        result.dates = self.market.dates()[range.clone()].to_vec();
        result.returns.reserve(range.len());
        result.weights.reserve(range.len());

        // ─── First date: carried weights earn their return, no trading ───
        let first_row: Vec<f64> = states
            .iter()
            .enumerate()
            .map(|(a, s)| {
                if start > 0 {
                    s.weight * self.price_return(a, start)
                } else {
                    0.0
                }
            })
            .collect();
        let mut equity = 1.0 + first_row.iter().sum::<f64>();
        let mut peak = equity.max(1.0);
        result.returns.push(first_row);
        result.weights.push(states.iter().map(|s| s.weight).collect());

        for t in (start + 1)..range.end {
            let date = self.market.dates()[t];
            let prev: Vec<f64> = states.iter().map(|s| s.weight).collect();

            // ─── Mark-to-market ───
            let mut row: Vec<f64> = (0..n).map(|a| prev[a] * self.price_return(a, t)).collect();
            let marked = equity * (1.0 + row.iter().sum::<f64>());

            // ─── Circuit breaker / regime gate ───
            let regime = Regime::classify(self.market.reference_bar(t));
            let drawdown = marked / peak - 1.0;
            let forced = if drawdown < -self.config.drawdown_limit {
                debug!(%date, drawdown, "circuit breaker tripped");
                Some(ExitReason::CircuitBreaker)
            } else if regime == Regime::Bear {
                Some(ExitReason::BearRegime)
            } else {
                None
            };

            let decisions: Vec<Decision> = match forced {
                Some(reason) => states
                    .iter()
                    .map(|s| Decision::flat(s.is_holding().then_some(reason)))
                    .collect(),
                None => self.decide(params, regime, t, &mut states),
            };

            // ─── Scaling and no-op rule ───
            let mut targets: Vec<f64> = decisions.iter().map(|d| d.target).collect();
            if forced.is_none() {
                scale_to_unit(&mut targets);
                for (w, &p) in targets.iter_mut().zip(&prev) {
                    if (*w - p).abs() < self.config.rebalance_threshold {
                        *w = p;
                    }
                }
                // Reverts can push the sum over 1 again, so reverted weights may still move.
                scale_to_unit(&mut targets);
            }

            // ─── Costs ───
            for a in 0..n {
                let turnover = (targets[a] - prev[a]).abs();
                if turnover > 0.0 {
                    row[a] -= turnover * self.cost_rates[a];
                }
            }

            // ─── Commit ───
            for a in 0..n {
                let weight = targets[a];
                let bar = self.market.bar(a, t);
                let state = &mut states[a];
                let kind = if state.is_holding() && weight <= 0.0 {
                    state.exit();
                    EventKind::Exit(decisions[a].exit.unwrap_or(ExitReason::RegimeDropped))
                } else if !state.is_holding() && weight > 0.0 {
                    state.enter(weight, bar.close);
                    EventKind::Entry
                } else {
                    state.weight = weight;
                    continue;
                };
                result.events.push(PositionEvent {
                    date,
                    symbol: self.market.symbols()[a].clone(),
                    kind,
                    price: bar.close,
                    weight,
                });
            }

            equity *= 1.0 + row.iter().sum::<f64>();
            peak = if forced == Some(ExitReason::CircuitBreaker) {
                equity
            } else {
                peak.max(equity)
            };
            result.returns.push(row);
            result.weights.push(targets);
        }

        result
    }

    /// Position state for the first date. Carried weights are re-based on
    /// the latest defined close at or before `start`.
    fn initial_states(&self, start: usize, initial: Option<&WeightMap>) -> Vec<PositionState> {
        let mut states = vec![PositionState::flat(); self.market.asset_count()];
        let Some(initial) = initial else {
            return states;
        };
        for (symbol, &weight) in initial {
            if weight <= 0.0 {
                continue;
            }
            let Some(a) = self.market.index_of(symbol) else {
                warn!(symbol = symbol.as_str(), "carried weight for unknown asset dropped");
                continue;
            };
            match self.last_close(a, start) {
                Some(price) => states[a].enter(weight, price),
                None => debug!(symbol = symbol.as_str(), "no price to carry weight, starting flat"),
            }
        }
        states
    }

    fn last_close(&self, asset: usize, t: usize) -> Option<f64> {
        (0..=t)
            .rev()
            .map(|i| self.market.bar(asset, i).close)
            .find(|c| c.is_finite())
    }

    /// close[t] / close[t-1] - 1, or 0.0 when either price is undefined.
    fn price_return(&self, asset: usize, t: usize) -> f64 {
        if t == 0 {
            return 0.0;
        }
        let prev = self.market.bar(asset, t - 1).close;
        let curr = self.market.bar(asset, t).close;
        let r = curr / prev - 1.0;
        if r.is_finite() {
            r
        } else {
            0.0
        }
    }

    fn decide(
        &self,
        params: &ParameterSet,
        regime: Regime,
        t: usize,
        states: &mut [PositionState],
    ) -> Vec<Decision> {
        let date = self.market.dates()[t];
        let table = self.config.regime_weights.for_regime(regime);
        let basket = self.schedule.active_at(date);

        states
            .iter_mut()
            .enumerate()
            .map(|(a, state)| {
                let regime_weight = table.map_or(0.0, |w| self.regime_weight(w, a, basket));
                let bar = self.market.bar(a, t);
                if !bar.is_tradable() {
                    return Decision::flat(state.is_holding().then_some(ExitReason::DataGap));
                }
                let entry_price = state.entry_price;
                match entry_price {
                    Some(entry) => {
                        if let Some(reason) = self.exit_signal(bar, entry, state) {
                            Decision::flat(Some(reason))
                        } else if regime_weight > 0.0 {
                            Decision::hold(regime_weight)
                        } else {
                            Decision::flat(Some(ExitReason::RegimeDropped))
                        }
                    }
                    None if regime_weight > 0.0 && entry_signal(bar, params) => {
                        Decision::hold(regime_weight)
                    }
                    None => Decision::flat(None),
                }
            })
            .collect()
    }

    fn regime_weight(&self, table: &RoleWeights, asset: usize, basket: Option<&BasketEntry>) -> f64 {
        let role = self.market.roles()[asset];
        if role != AssetRole::Satellite {
            return table.for_role(role);
        }
        match basket {
            Some(entry) if entry.contains(&self.market.symbols()[asset]) => {
                match self.config.satellite_allocation {
                    SatelliteAllocation::PerAsset => table.satellite,
                    SatelliteAllocation::Aggregate => table.satellite / entry.satellites.len() as f64,
                }
            }
            _ => 0.0,
        }
    }

    /// Exit rule for a held asset. Updates the trailing stop as a side effect.
    fn exit_signal(&self, bar: &Bar, entry: f64, state: &mut PositionState) -> Option<ExitReason> {
        let cfg = self.config;
        if bar.close < cfg.exit_ma_buffer * bar.ma_long {
            return Some(ExitReason::BelowTrend);
        }
        if bar.rsi < cfg.exit_rsi {
            return Some(ExitReason::RsiFade);
        }
        if bar.atr.is_finite() && bar.close < entry - cfg.atr_multiplier * bar.atr {
            return Some(ExitReason::AtrStop);
        }
        if let Some(stop) = &cfg.trailing_stop {
            if !state.trailing_active && (bar.close / entry - 1.0) * 100.0 >= stop.activation_pct {
                state.trailing_active = true;
                state.trailing_peak = bar.close;
            }
            if state.trailing_active {
                state.trailing_peak = state.trailing_peak.max(bar.close);
                if bar.close <= state.trailing_peak * (1.0 - stop.callback_pct / 100.0) {
                    return Some(ExitReason::TrailingStop);
                }
            }
        }
        None
    }
}

fn entry_signal(bar: &Bar, params: &ParameterSet) -> bool {
    bar.close > bar.ma_long
        && bar.ma_short > bar.ma_long
        && bar.rsi >= params.rsi_threshold
        && bar.rebound_pct() >= params.rebound_threshold
}

/// Scale weights proportionally so they sum to at most 1.
fn scale_to_unit(weights: &mut [f64]) {
    let total: f64 = weights.iter().sum();
    if total > 1.0 + WEIGHT_EPSILON {
        for w in weights.iter_mut() {
            *w /= total;
        }
    }
}
