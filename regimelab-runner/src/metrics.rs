//! Performance metrics: pure functions over return series and equity curves.
//!
//! Crypto trades every calendar day, so annualization uses elapsed calendar
//! days (365.25-day year) for CAGR and a 365-period year for Sharpe.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};

pub const DAYS_PER_YEAR: f64 = 365.25;
pub const PERIODS_PER_YEAR: f64 = 365.0;

/// Compounded equity from `initial`, one value per return.
pub fn equity_curve(returns: &[f64], initial: f64) -> Vec<f64> {
    let mut equity = initial;
    returns
        .iter()
        .map(|r| {
            equity *= 1.0 + r;
            equity
        })
        .collect()
}

/// Calendar days between the first and last date; 0 for fewer than 2 dates.
pub fn elapsed_days(dates: &[NaiveDate]) -> i64 {
    match (dates.first(), dates.last()) {
        (Some(first), Some(last)) => (*last - *first).num_days(),
        _ => 0,
    }
}

/// Total return in percent: (final / initial - 1) × 100.
pub fn total_return_pct(initial: f64, final_value: f64) -> f64 {
    if initial <= 0.0 {
        return 0.0;
    }
    (final_value / initial - 1.0) * 100.0
}

/// Compound annual growth rate in percent over `days` calendar days.
///
/// None when `days <= 0` or the result is not finite (e.g. wiped-out equity).
pub fn cagr_pct(initial: f64, final_value: f64, days: i64) -> Option<f64> {
    if days <= 0 || initial <= 0.0 {
        return None;
    }
    let growth = final_value / initial;
    let cagr = (growth.powf(DAYS_PER_YEAR / days as f64) - 1.0) * 100.0;
    cagr.is_finite().then_some(cagr)
}

/// Maximum drawdown in percent (≤ 0), peak taken over the curve itself.
///
/// Returns 0.0 for an empty or monotonically rising curve.
pub fn max_drawdown_pct(equity_curve: &[f64]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut worst = 0.0_f64;
    for &eq in equity_curve {
        peak = peak.max(eq);
        if peak > 0.0 {
            worst = worst.min((eq - peak) / peak);
        }
    }
    worst * 100.0
}

/// Compounded return per calendar year, in percent.
pub fn yearly_returns_pct(dates: &[NaiveDate], returns: &[f64]) -> BTreeMap<i32, f64> {
    let mut growth: BTreeMap<i32, f64> = BTreeMap::new();
    for (date, r) in dates.iter().zip(returns) {
        *growth.entry(date.year()).or_insert(1.0) *= 1.0 + r;
    }
    growth.into_iter().map(|(y, g)| (y, (g - 1.0) * 100.0)).collect()
}

/// Annualized Sharpe ratio of periodic returns (zero risk-free rate).
///
/// Returns 0.0 with fewer than 2 returns or zero variance.
pub fn sharpe_ratio(returns: &[f64]) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }
    let mean = mean_f64(returns);
    let std = std_dev(returns, mean);
    if std < 1e-15 {
        return 0.0;
    }
    mean / std * PERIODS_PER_YEAR.sqrt()
}

fn mean_f64(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation.
fn std_dev(values: &[f64], mean: f64) -> f64 {
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    var.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn equity_compounds() {
        let eq = equity_curve(&[0.1, -0.1], 100.0);
        assert!((eq[0] - 110.0).abs() < 1e-9);
        assert!((eq[1] - 99.0).abs() < 1e-9);
    }

    #[test]
    fn cagr_over_one_year_equals_total_return() {
        let c = cagr_pct(100.0, 121.0, 365).unwrap();
        let expected = (1.21_f64.powf(365.25 / 365.0) - 1.0) * 100.0;
        assert!((c - expected).abs() < 1e-9);
    }

    #[test]
    fn cagr_undefined_without_elapsed_time() {
        assert_eq!(cagr_pct(100.0, 110.0, 0), None);
        assert_eq!(cagr_pct(100.0, 110.0, -3), None);
        assert_eq!(cagr_pct(100.0, -5.0, 30), None);
    }

    #[test]
    fn max_drawdown_from_peak() {
        let mdd = max_drawdown_pct(&[100.0, 120.0, 90.0, 130.0, 117.0]);
        assert!((mdd - (-25.0)).abs() < 1e-9);
        assert_eq!(max_drawdown_pct(&[1.0, 2.0, 3.0]), 0.0);
        assert_eq!(max_drawdown_pct(&[]), 0.0);
    }

    #[test]
    fn yearly_returns_compound_within_year() {
        let dates = [d(2023, 12, 31), d(2024, 1, 1), d(2024, 1, 2)];
        let years = yearly_returns_pct(&dates, &[0.1, 0.1, -0.5]);
        assert!((years[&2023] - 10.0).abs() < 1e-9);
        assert!((years[&2024] - (-45.0)).abs() < 1e-9);
    }

    #[test]
    fn sharpe_zero_for_constant_returns() {
        assert_eq!(sharpe_ratio(&[0.01; 10]), 0.0);
        assert_eq!(sharpe_ratio(&[0.01]), 0.0);
        assert!(sharpe_ratio(&[0.01, 0.02, 0.015, 0.03]) > 0.0);
    }

    #[test]
    fn elapsed_days_uses_calendar() {
        assert_eq!(elapsed_days(&[d(2024, 1, 1), d(2024, 3, 1)]), 60);
        assert_eq!(elapsed_days(&[d(2024, 1, 1)]), 0);
        assert_eq!(elapsed_days(&[]), 0);
    }
}
