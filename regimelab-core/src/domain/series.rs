//! Per-asset series and the aligned multi-asset view used by the engine.
//!
//! Indicators are computed on each asset's own history first, then every
//! series is aligned onto the reference asset's date index. Dates the asset
//! has no bar for become void bars (no forward-fill of prices).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::ops::Range;
use thiserror::Error;

use super::bar::Bar;

#[derive(Debug, Error)]
pub enum DataError {
    #[error("reference asset '{0}' not found in data set")]
    MissingReference(String),
    #[error("reference asset '{0}' has no bars")]
    EmptyReference(String),
    #[error("duplicate asset '{0}' in data set")]
    DuplicateAsset(String),
}

/// Role an asset plays in the strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetRole {
    /// Reference asset: drives the regime and the basket correlation input.
    PrimaryAnchor,
    SecondaryAnchor,
    Satellite,
}

/// Inclusive calendar date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }
}

/// Date-ordered bars for one asset, already carrying derived indicators.
#[derive(Debug, Clone)]
pub struct AssetSeries {
    pub symbol: String,
    pub bars: Vec<Bar>,
}

impl AssetSeries {
    pub fn new(symbol: impl Into<String>, bars: Vec<Bar>) -> Self {
        Self {
            symbol: symbol.into(),
            bars,
        }
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Number of bars dated on or before `date`.
    pub fn count_through(&self, date: NaiveDate) -> usize {
        self.bars.partition_point(|b| b.date <= date)
    }

    /// Bars dated on or before `date`.
    pub fn bars_through(&self, date: NaiveDate) -> &[Bar] {
        &self.bars[..self.count_through(date)]
    }
}

/// All assets aligned onto the reference asset's date index.
#[derive(Debug, Clone)]
pub struct MarketData {
    dates: Vec<NaiveDate>,
    symbols: Vec<String>,
    roles: Vec<AssetRole>,
    columns: Vec<Vec<Bar>>,
    reference: usize,
}

impl MarketData {
    /// Align `series` onto the date index of `primary`.
    ///
    /// Symbol order is: primary anchor, secondary anchor (if present), then
    /// satellites in the order given.
    pub fn align(
        series: &[AssetSeries],
        primary: &str,
        secondary: &str,
    ) -> Result<Self, DataError> {
        let mut seen = HashMap::new();
        for (i, s) in series.iter().enumerate() {
            if seen.insert(s.symbol.as_str(), i).is_some() {
                return Err(DataError::DuplicateAsset(s.symbol.clone()));
            }
        }

        let ref_idx = *seen
            .get(primary)
            .ok_or_else(|| DataError::MissingReference(primary.to_string()))?;
        let reference = &series[ref_idx];
        if reference.is_empty() {
            return Err(DataError::EmptyReference(primary.to_string()));
        }
        let dates: Vec<NaiveDate> = reference.bars.iter().map(|b| b.date).collect();

        let mut ordered: Vec<(&AssetSeries, AssetRole)> = vec![(reference, AssetRole::PrimaryAnchor)];
        if let Some(&i) = seen.get(secondary) {
            if i != ref_idx {
                ordered.push((&series[i], AssetRole::SecondaryAnchor));
            }
        }
        for s in series {
            if s.symbol != primary && s.symbol != secondary {
                ordered.push((s, AssetRole::Satellite));
            }
        }

        let mut symbols = Vec::with_capacity(ordered.len());
        let mut roles = Vec::with_capacity(ordered.len());
        let mut columns = Vec::with_capacity(ordered.len());
        for (s, role) in ordered {
            symbols.push(s.symbol.clone());
            roles.push(role);
            columns.push(align_column(s, &dates));
        }

        Ok(Self {
            dates,
            symbols,
            roles,
            columns,
            reference: 0,
        })
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn roles(&self) -> &[AssetRole] {
        &self.roles
    }

    pub fn asset_count(&self) -> usize {
        self.symbols.len()
    }

    pub fn index_of(&self, symbol: &str) -> Option<usize> {
        self.symbols.iter().position(|s| s == symbol)
    }

    pub fn reference_symbol(&self) -> &str {
        &self.symbols[self.reference]
    }

    /// Bar for asset `asset` at date index `t`.
    pub fn bar(&self, asset: usize, t: usize) -> &Bar {
        &self.columns[asset][t]
    }

    pub fn reference_bar(&self, t: usize) -> &Bar {
        self.bar(self.reference, t)
    }

    /// Index range of dates inside `window`.
    pub fn index_range(&self, window: &DateWindow) -> Range<usize> {
        let start = self.dates.partition_point(|d| *d < window.start);
        let end = self.dates.partition_point(|d| *d <= window.end);
        start..end.max(start)
    }

    /// First reference date whose long moving average is defined.
    pub fn first_valid_date(&self) -> Option<NaiveDate> {
        self.columns[self.reference]
            .iter()
            .find(|b| b.ma_long.is_finite())
            .map(|b| b.date)
    }
}

fn align_column(series: &AssetSeries, dates: &[NaiveDate]) -> Vec<Bar> {
    let by_date: HashMap<NaiveDate, &Bar> = series.bars.iter().map(|b| (b.date, b)).collect();
    dates
        .iter()
        .map(|d| by_date.get(d).map(|b| (*b).clone()).unwrap_or_else(|| Bar::void(*d)))
        .collect()
}
