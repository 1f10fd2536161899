//! Satellite basket selection and the per-date basket schedule.

pub mod score;
pub mod selector;

pub use score::{AssetFeatures, ScoreWeights};
pub use selector::{BasketConfig, BasketSelector};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BasketError {
    #[error("failed to encode satellite list")]
    Encode(#[source] serde_json::Error),
    #[error("invalid satellite list '{raw}'")]
    Decode {
        raw: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Satellite selection effective from `start` until the next entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasketEntry {
    /// Period id, `w0001`, `w0002`, ...
    pub id: String,
    pub start: NaiveDate,
    pub satellites: Vec<String>,
}

impl BasketEntry {
    pub fn contains(&self, symbol: &str) -> bool {
        self.satellites.iter().any(|s| s == symbol)
    }
}

/// Period id for the entry at position `index` (zero-based).
pub fn period_id(index: usize) -> String {
    format!("w{:04}", index + 1)
}

/// Date-ordered basket entries. Read-only once built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasketSchedule {
    entries: Vec<BasketEntry>,
}

impl BasketSchedule {
    /// Entries are sorted by start date; equal starts keep their order.
    pub fn new(mut entries: Vec<BasketEntry>) -> Self {
        entries.sort_by_key(|e| e.start);
        Self { entries }
    }

    pub fn entries(&self) -> &[BasketEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Latest entry with `start <= date`.
    pub fn active_at(&self, date: NaiveDate) -> Option<&BasketEntry> {
        let idx = self.entries.partition_point(|e| e.start <= date);
        idx.checked_sub(1).map(|i| &self.entries[i])
    }
}

/// Encode a satellite list as a JSON string array.
pub fn encode_satellites(satellites: &[String]) -> Result<String, BasketError> {
    serde_json::to_string(satellites).map_err(BasketError::Encode)
}

/// Decode a satellite list written by [`encode_satellites`].
pub fn decode_satellites(raw: &str) -> Result<Vec<String>, BasketError> {
    serde_json::from_str(raw).map_err(|source| BasketError::Decode {
        raw: raw.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    fn entry(i: usize, d: u32, sats: &[&str]) -> BasketEntry {
        BasketEntry {
            id: period_id(i),
            start: day(d),
            satellites: sats.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn period_ids_are_zero_padded() {
        assert_eq!(period_id(0), "w0001");
        assert_eq!(period_id(41), "w0042");
    }

    #[test]
    fn active_at_picks_latest_started_entry() {
        let schedule = BasketSchedule::new(vec![
            entry(1, 10, &["SOL"]),
            entry(0, 5, &["ADA"]),
            entry(2, 20, &[]),
        ]);
        assert!(schedule.active_at(day(4)).is_none());
        assert_eq!(schedule.active_at(day(5)).unwrap().id, "w0001");
        assert_eq!(schedule.active_at(day(15)).unwrap().id, "w0002");
        assert!(schedule.active_at(day(15)).unwrap().contains("SOL"));
        assert_eq!(schedule.active_at(day(31)).unwrap().id, "w0003");
    }

    #[test]
    fn satellites_encode_decode() {
        let sats = vec!["SOL".to_string(), "A,B".to_string(), "q\"x".to_string()];
        let raw = encode_satellites(&sats).unwrap();
        assert_eq!(decode_satellites(&raw).unwrap(), sats);

        assert_eq!(encode_satellites(&[]).unwrap(), "[]");
        assert!(decode_satellites("[]").unwrap().is_empty());
    }

    #[test]
    fn decode_rejects_non_list() {
        assert!(matches!(
            decode_satellites("['SOL']"),
            Err(BasketError::Decode { .. })
        ));
    }
}
