//! Simulator rule tests on hand-built bars.
//!
//! Indicator fields are set directly so each test pins down exactly one
//! entry / exit / gate rule.

use chrono::NaiveDate;
use regimelab_core::basket::{period_id, BasketEntry, BasketSchedule};
use regimelab_core::domain::{AssetSeries, Bar, DateWindow, MarketData, ParameterSet};
use regimelab_core::engine::{
    EventKind, ExitReason, SatelliteAllocation, SimConfig, SimulationResult, Simulator,
    TrailingStopConfig,
};

// ── Helpers ──────────────────────────────────────────────────────────

fn day(n: i64) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 1).unwrap() + chrono::Duration::days(n)
}

/// Bullish bars: every rule allows an entry and none forces an exit.
fn path(closes: &[f64]) -> Vec<Bar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| {
            let mut b = Bar::void(day(i as i64));
            b.open = c;
            b.high = c;
            b.low = c;
            b.close = c;
            b.volume = 1000.0;
            b.ma_short = 60.0;
            b.ma_long = 50.0;
            b.rsi = 70.0;
            b.atr = 1.0;
            b.trailing_low = 50.0;
            b
        })
        .collect()
}

fn rising(n: usize) -> Vec<Bar> {
    let closes: Vec<f64> = (0..n).map(|i| 100.0 + i as f64).collect();
    path(&closes)
}

fn params() -> ParameterSet {
    ParameterSet::new(15.0, 55.0)
}

fn run(series: Vec<AssetSeries>, schedule: &BasketSchedule, config: &SimConfig) -> SimulationResult {
    let market = MarketData::align(&series, "BTC", "ETH").unwrap();
    let dates = market.dates();
    let window = DateWindow::new(dates[0], dates[dates.len() - 1]);
    Simulator::new(&market, schedule, config).run(&params(), window, None)
}

fn schedule(satellites: &[&str]) -> BasketSchedule {
    BasketSchedule::new(vec![BasketEntry {
        id: period_id(0),
        start: day(0),
        satellites: satellites.iter().map(|s| s.to_string()).collect(),
    }])
}

fn exits(result: &SimulationResult, reason: ExitReason) -> Vec<(NaiveDate, String)> {
    result
        .events
        .iter()
        .filter(|e| e.kind == EventKind::Exit(reason))
        .map(|e| (e.date, e.symbol.clone()))
        .collect()
}

fn assert_approx(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-12,
        "actual={actual}, expected={expected}"
    );
}

// ── Regime gate ──────────────────────────────────────────────────────

#[test]
fn bear_regime_forces_flat_and_pays_exit_cost() {
    let mut btc = rising(5);
    btc[3].rsi = 30.0;
    let eth = rising(5);
    let config = SimConfig::default();
    let result = run(
        vec![AssetSeries::new("BTC", btc), AssetSeries::new("ETH", eth)],
        &BasketSchedule::default(),
        &config,
    );

    assert_eq!(result.weights[2], vec![0.4, 0.5]);
    assert_eq!(result.weights[3], vec![0.0, 0.0]);
    assert_eq!(exits(&result, ExitReason::BearRegime).len(), 2);

    // Yesterday's weight earns today's move, then pays to exit.
    let btc_ret = 103.0 / 102.0 - 1.0;
    assert_approx(result.returns[3][0], 0.4 * btc_ret - 0.4 * 0.0033);
    assert_approx(result.returns[3][1], 0.5 * btc_ret - 0.5 * 0.0035);
}

#[test]
fn unknown_regime_never_trades() {
    let mut btc = rising(5);
    for b in &mut btc {
        b.ma_long = f64::NAN;
    }
    let result = run(
        vec![AssetSeries::new("BTC", btc), AssetSeries::new("ETH", rising(5))],
        &BasketSchedule::default(),
        &SimConfig::default(),
    );
    assert!(result.weights.iter().flatten().all(|w| *w == 0.0));
    assert!(result.events.is_empty());
}

// ── Circuit breaker ──────────────────────────────────────────────────

#[test]
fn circuit_breaker_flattens_then_rearms() {
    let closes = [100.0, 100.0, 80.0, 81.0, 82.0];
    let result = run(
        vec![
            AssetSeries::new("BTC", path(&closes)),
            AssetSeries::new("ETH", path(&closes)),
        ],
        &BasketSchedule::default(),
        &SimConfig::default(),
    );

    assert_eq!(result.weights[1], vec![0.4, 0.5]);
    // -18% on the portfolio trips the 10% limit.
    assert_eq!(result.weights[2], vec![0.0, 0.0]);
    assert_eq!(exits(&result, ExitReason::CircuitBreaker).len(), 2);
    // Peak resets after the trip, so the next bullish date re-enters.
    assert_eq!(result.weights[3], vec![0.4, 0.5]);
}

// ── Baskets and scaling ──────────────────────────────────────────────

#[test]
fn satellites_weighted_only_inside_basket_and_scaled() {
    let series = vec![
        AssetSeries::new("BTC", rising(3)),
        AssetSeries::new("ETH", rising(3)),
        AssetSeries::new("SOL", rising(3)),
        AssetSeries::new("ADA", rising(3)),
        AssetSeries::new("XRP", rising(3)),
    ];
    let result = run(series, &schedule(&["SOL", "ADA"]), &SimConfig::default());

    // 0.4 + 0.5 + 0.1 + 0.1 = 1.1 → proportional scaling.
    let w = &result.weights[1];
    assert_approx(w[0], 0.4 / 1.1);
    assert_approx(w[1], 0.5 / 1.1);
    assert_approx(w[2], 0.1 / 1.1);
    assert_approx(w[3], 0.1 / 1.1);
    assert_eq!(w[4], 0.0);
    assert!(w.iter().sum::<f64>() <= 1.0 + 1e-12);
}

#[test]
fn aggregate_allocation_splits_satellite_weight() {
    let series = vec![
        AssetSeries::new("BTC", rising(3)),
        AssetSeries::new("ETH", rising(3)),
        AssetSeries::new("SOL", rising(3)),
        AssetSeries::new("ADA", rising(3)),
    ];
    let config = SimConfig {
        satellite_allocation: SatelliteAllocation::Aggregate,
        ..SimConfig::default()
    };
    let result = run(series, &schedule(&["SOL", "ADA"]), &config);
    let w = &result.weights[1];
    assert_approx(w[2], 0.05);
    assert_approx(w[3], 0.05);
}

#[test]
fn aggregate_split_below_rebalance_threshold_never_enters() {
    let series = vec![
        AssetSeries::new("BTC", rising(3)),
        AssetSeries::new("ETH", rising(3)),
        AssetSeries::new("SOL", rising(3)),
        AssetSeries::new("ADA", rising(3)),
        AssetSeries::new("XRP", rising(3)),
    ];
    let config = SimConfig {
        satellite_allocation: SatelliteAllocation::Aggregate,
        ..SimConfig::default()
    };
    // 0.1 / 3 per satellite is inside the 0.05 no-op band from flat.
    let result = run(series, &schedule(&["SOL", "ADA", "XRP"]), &config);
    for row in &result.weights {
        assert_eq!(&row[2..], &[0.0, 0.0, 0.0]);
    }
    assert_approx(result.weights[1][0], 0.4);
    assert_approx(result.weights[1][1], 0.5);
}

#[test]
fn satellite_dropped_from_basket_exits() {
    let series = vec![
        AssetSeries::new("BTC", rising(4)),
        AssetSeries::new("ETH", rising(4)),
        AssetSeries::new("SOL", rising(4)),
    ];
    let schedule = BasketSchedule::new(vec![
        BasketEntry {
            id: period_id(0),
            start: day(0),
            satellites: vec!["SOL".to_string()],
        },
        BasketEntry {
            id: period_id(1),
            start: day(2),
            satellites: Vec::new(),
        },
    ]);
    let result = run(series, &schedule, &SimConfig::default());
    assert_approx(result.weights[1][2], 0.1);
    assert_eq!(result.weights[2][2], 0.0);
    assert_eq!(
        exits(&result, ExitReason::RegimeDropped),
        vec![(day(2), "SOL".to_string())]
    );
}

// ── Exit rules ───────────────────────────────────────────────────────

#[test]
fn atr_stop_exits_below_entry_band() {
    let mut btc = path(&[100.0, 101.0, 101.0, 97.0]);
    btc[3].atr = 1.0;
    let result = run(
        vec![AssetSeries::new("BTC", btc), AssetSeries::new("ETH", rising(4))],
        &BasketSchedule::default(),
        &SimConfig::default(),
    );
    // Entered at 101; 97 < 101 - 3 × 1.
    assert_eq!(exits(&result, ExitReason::AtrStop), vec![(day(3), "BTC".to_string())]);
    assert_eq!(result.weights[3][0], 0.0);
}

#[test]
fn secondary_exits_on_rsi_fade_and_trend_break() {
    let mut eth = rising(5);
    eth[2].rsi = 44.0;
    eth[4].ma_long = 110.0; // 104 < 0.99 × 110
    let result = run(
        vec![AssetSeries::new("BTC", rising(5)), AssetSeries::new("ETH", eth)],
        &BasketSchedule::default(),
        &SimConfig::default(),
    );
    assert_eq!(exits(&result, ExitReason::RsiFade), vec![(day(2), "ETH".to_string())]);
    // Re-entered on day 3, broken trend on day 4.
    assert_eq!(result.weights[3][1], 0.5);
    assert_eq!(exits(&result, ExitReason::BelowTrend), vec![(day(4), "ETH".to_string())]);
}

#[test]
fn trailing_stop_locks_in_gain() {
    let closes = [100.0, 100.0, 115.0, 120.0, 113.0];
    let stop = TrailingStopConfig {
        activation_pct: 10.0,
        callback_pct: 5.0,
    };
    let with_stop = SimConfig {
        trailing_stop: Some(stop),
        ..SimConfig::default()
    };

    let series = || {
        vec![
            AssetSeries::new("BTC", path(&closes)),
            AssetSeries::new("ETH", rising(5)),
        ]
    };
    let result = run(series(), &BasketSchedule::default(), &with_stop);
    assert_eq!(exits(&result, ExitReason::TrailingStop), vec![(day(4), "BTC".to_string())]);

    let without = run(series(), &BasketSchedule::default(), &SimConfig::default());
    assert!(exits(&without, ExitReason::TrailingStop).is_empty());
    assert_eq!(without.weights[4][0], 0.4);
}

#[test]
fn data_gap_makes_asset_ineligible() {
    let mut eth = rising(5);
    eth[2] = Bar::void(day(2));
    let result = run(
        vec![AssetSeries::new("BTC", rising(5)), AssetSeries::new("ETH", eth)],
        &BasketSchedule::default(),
        &SimConfig::default(),
    );
    assert_eq!(exits(&result, ExitReason::DataGap), vec![(day(2), "ETH".to_string())]);
    // No price move is earned across the gap.
    assert_approx(result.returns[2][1], -0.5 * 0.0035);
    assert_approx(result.returns[3][1], -0.5 * 0.0035);
    assert_eq!(result.weights[3][1], 0.5);
}

#[test]
fn entry_requires_rebound_and_rsi() {
    let mut eth = rising(4);
    for b in &mut eth {
        b.trailing_low = b.close / 1.10; // 10% rebound < 15% threshold
    }
    eth[3].trailing_low = 50.0;
    eth[3].rsi = 54.0; // below the 55 threshold
    let result = run(
        vec![AssetSeries::new("BTC", rising(4)), AssetSeries::new("ETH", eth)],
        &BasketSchedule::default(),
        &SimConfig::default(),
    );
    assert!(result.weights.iter().all(|row| row[1] == 0.0));
}
