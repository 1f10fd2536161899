//! Bar loading for the runner.
//!
//! Reads one `<SYMBOL>.csv` per asset from a data directory (header
//! `date,open,high,low,close,volume`), clips to the configured date bounds
//! and computes a dataset hash over everything loaded. Sorting and duplicate
//! removal happen later in the indicator builder.
//!
//! Synthetic data is a developer-only mode backing `regimelab synth`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use regimelab_core::domain::RawBar;

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed CSV in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("{path} line {line}: invalid date '{value}'")]
    InvalidDate {
        path: PathBuf,
        line: u64,
        value: String,
    },
    #[error("no data for '{symbol}' in {dir}")]
    MissingSymbol { symbol: String, dir: PathBuf },
    #[error("no CSV files in {0}")]
    EmptyDirectory(PathBuf),
}

/// Options controlling which bars are loaded.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// None loads every `*.csv` in the directory.
    pub symbols: Option<Vec<String>>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

/// Raw rows per symbol, plus provenance.
#[derive(Debug, Clone)]
pub struct LoadedData {
    pub bars: BTreeMap<String, Vec<RawBar>>,
    /// BLAKE3 over all loaded rows in symbol order.
    pub dataset_hash: String,
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    date: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

/// Parse the date prefix; a trailing time part is ignored.
fn parse_date(raw: &str) -> Option<NaiveDate> {
    let head = raw.trim().get(..10)?;
    NaiveDate::parse_from_str(head, "%Y-%m-%d").ok()
}

/// Read one asset's CSV file, rows in file order.
pub fn load_csv(path: &Path) -> Result<Vec<RawBar>, LoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|source| LoadError::Csv {
            path: path.to_path_buf(),
            source,
        })?;

    let mut bars = Vec::new();
    for (index, record) in reader.deserialize::<CsvRow>().enumerate() {
        // 1-based, after the header row
        let line = index as u64 + 2;
        let row = record.map_err(|source| LoadError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
        let date = parse_date(&row.date).ok_or_else(|| LoadError::InvalidDate {
            path: path.to_path_buf(),
            line,
            value: row.date.clone(),
        })?;
        let bar = RawBar {
            date,
            open: row.open,
            high: row.high,
            low: row.low,
            close: row.close,
            volume: row.volume,
        };
        if !bar.is_sane() {
            warn!(path = %path.display(), line, %date, "inconsistent OHLC row dropped");
            continue;
        }
        bars.push(bar);
    }
    Ok(bars)
}

/// Symbols with a `<SYMBOL>.csv` file in `dir`, sorted.
pub fn discover_symbols(dir: &Path) -> Result<Vec<String>, LoadError> {
    let entries = std::fs::read_dir(dir).map_err(|source| LoadError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    let mut symbols = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| LoadError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("csv") {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            symbols.push(stem.to_string());
        }
    }
    symbols.sort();
    Ok(symbols)
}

/// Load bars for every requested symbol from `dir`.
pub fn load_directory(dir: &Path, opts: &LoadOptions) -> Result<LoadedData, LoadError> {
    let symbols = match &opts.symbols {
        Some(list) => list.clone(),
        None => discover_symbols(dir)?,
    };
    if symbols.is_empty() {
        return Err(LoadError::EmptyDirectory(dir.to_path_buf()));
    }

    let mut bars = BTreeMap::new();
    for symbol in &symbols {
        let path = dir.join(format!("{symbol}.csv"));
        if !path.is_file() {
            return Err(LoadError::MissingSymbol {
                symbol: symbol.clone(),
                dir: dir.to_path_buf(),
            });
        }
        let rows = clip(load_csv(&path)?, opts.start, opts.end);
        if rows.is_empty() {
            warn!(symbol = %symbol, "no rows inside the configured date range");
        }
        debug!(symbol = %symbol, rows = rows.len(), "loaded");
        bars.insert(symbol.clone(), rows);
    }

    let dataset_hash = compute_dataset_hash(&bars);
    info!(
        symbols = bars.len(),
        dataset_hash = &dataset_hash[..12],
        "data loaded"
    );
    Ok(LoadedData { bars, dataset_hash })
}

fn clip(rows: Vec<RawBar>, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Vec<RawBar> {
    rows.into_iter()
        .filter(|r| start.map_or(true, |s| r.date >= s) && end.map_or(true, |e| r.date <= e))
        .collect()
}

/// Deterministic BLAKE3 hash over all bar data in symbol order.
pub fn compute_dataset_hash(bars: &BTreeMap<String, Vec<RawBar>>) -> String {
    let mut hasher = blake3::Hasher::new();
    for (symbol, rows) in bars {
        hasher.update(symbol.as_bytes());
        for bar in rows {
            hasher.update(bar.date.to_string().as_bytes());
            hasher.update(&bar.open.to_le_bytes());
            hasher.update(&bar.high.to_le_bytes());
            hasher.update(&bar.low.to_le_bytes());
            hasher.update(&bar.close.to_le_bytes());
            hasher.update(&bar.volume.to_le_bytes());
        }
    }
    hasher.finalize().to_hex().to_string()
}

// ─── Synthetic data ──────────────────────────────────────────────────

/// Generate a daily random walk (every calendar day, crypto-style).
///
/// Seeded from the symbol name, so the same symbol always gets the same
/// path. `drift` shifts the daily return range.
pub fn generate_synthetic_bars(
    symbol: &str,
    start: NaiveDate,
    end: NaiveDate,
    drift: f64,
) -> Vec<RawBar> {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    let seed: [u8; 32] = *blake3::hash(symbol.as_bytes()).as_bytes();
    let mut rng = StdRng::from_seed(seed);

    let mut bars = Vec::new();
    let mut price = rng.gen_range(1.0..1000.0_f64);
    let mut current = start;
    while current <= end {
        let daily_return: f64 = drift + rng.gen_range(-0.04..0.04);
        let open = price;
        let close = (price * (1.0 + daily_return)).max(1e-6);
        let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.02));
        let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.02));
        let volume = rng.gen_range(1_000_000.0..50_000_000.0);

        bars.push(RawBar {
            date: current,
            open,
            high,
            low,
            close,
            volume,
        });
        price = close;
        current += chrono::Duration::days(1);
    }
    bars
}

/// Write rows in the loader's CSV format.
pub fn write_csv(path: &Path, bars: &[RawBar]) -> Result<(), LoadError> {
    let csv_err = |source: csv::Error| LoadError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut writer = csv::Writer::from_path(path).map_err(csv_err)?;
    writer
        .write_record(["date", "open", "high", "low", "close", "volume"])
        .map_err(csv_err)?;
    for b in bars {
        writer
            .write_record([
                b.date.to_string(),
                format!("{:.6}", b.open),
                format!("{:.6}", b.high),
                format!("{:.6}", b.low),
                format!("{:.6}", b.close),
                format!("{:.2}", b.volume),
            ])
            .map_err(csv_err)?;
    }
    writer.flush().map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parses_date_prefix() {
        assert_eq!(parse_date("2024-01-05"), Some(date(2024, 1, 5)));
        assert_eq!(parse_date("2024-01-05 00:00:00+00:00"), Some(date(2024, 1, 5)));
        assert_eq!(parse_date("05/01/2024"), None);
        assert_eq!(parse_date("2024"), None);
    }

    #[test]
    fn loads_csv_with_time_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("BTC.csv");
        std::fs::write(
            &path,
            "date,open,high,low,close,volume\n\
             2024-01-01 00:00:00,1,2,0.5,1.5,100\n\
             2024-01-02,1.5,2.5,1,2,200\n",
        )
        .unwrap();
        let bars = load_csv(&path).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].date, date(2024, 1, 1));
        assert_eq!(bars[1].close, 2.0);
    }

    #[test]
    fn bad_date_reports_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("BTC.csv");
        std::fs::write(
            &path,
            "date,open,high,low,close,volume\n2024-01-01,1,1,1,1,1\nnope,1,1,1,1,1\n",
        )
        .unwrap();
        match load_csv(&path).unwrap_err() {
            LoadError::InvalidDate { line, value, .. } => {
                assert_eq!(line, 3);
                assert_eq!(value, "nope");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn inconsistent_ohlc_rows_are_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("BTC.csv");
        std::fs::write(
            &path,
            "date,open,high,low,close,volume\n\
             2024-01-01,1,2,0.5,1.5,100\n\
             2024-01-02,1.5,1,2,1.8,100\n\
             2024-01-03,1.5,2,1,0,100\n\
             2024-01-04,1.8,2.2,1.7,2,100\n",
        )
        .unwrap();
        let bars = load_csv(&path).unwrap();
        assert_eq!(
            bars.iter().map(|b| b.date).collect::<Vec<_>>(),
            vec![date(2024, 1, 1), date(2024, 1, 4)]
        );
    }

    #[test]
    fn directory_load_clips_and_hashes() {
        let dir = tempfile::tempdir().unwrap();
        let bars = generate_synthetic_bars("BTC", date(2024, 1, 1), date(2024, 1, 31), 0.0);
        write_csv(&dir.path().join("BTC.csv"), &bars).unwrap();
        write_csv(&dir.path().join("ETH.csv"), &bars).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let opts = LoadOptions {
            symbols: None,
            start: Some(date(2024, 1, 10)),
            end: Some(date(2024, 1, 19)),
        };
        let loaded = load_directory(dir.path(), &opts).unwrap();
        assert_eq!(
            loaded.bars.keys().cloned().collect::<Vec<_>>(),
            vec!["BTC".to_string(), "ETH".to_string()]
        );
        assert_eq!(loaded.bars["BTC"].len(), 10);
        assert_eq!(loaded.bars["BTC"][0].date, date(2024, 1, 10));

        let again = load_directory(dir.path(), &opts).unwrap();
        assert_eq!(loaded.dataset_hash, again.dataset_hash);
    }

    #[test]
    fn missing_symbol_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let opts = LoadOptions {
            symbols: Some(vec!["BTC".to_string()]),
            ..LoadOptions::default()
        };
        assert!(matches!(
            load_directory(dir.path(), &opts),
            Err(LoadError::MissingSymbol { .. })
        ));
        assert!(matches!(
            load_directory(dir.path(), &LoadOptions::default()),
            Err(LoadError::EmptyDirectory(_))
        ));
    }

    #[test]
    fn synthetic_bars_are_deterministic_per_symbol() {
        let a = generate_synthetic_bars("SOL", date(2024, 1, 1), date(2024, 3, 1), 0.001);
        let b = generate_synthetic_bars("SOL", date(2024, 1, 1), date(2024, 3, 1), 0.001);
        let c = generate_synthetic_bars("ADA", date(2024, 1, 1), date(2024, 3, 1), 0.001);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 61);
        assert!(a.iter().all(|r| r.is_sane()));
    }

    #[test]
    fn hash_changes_with_data() {
        let mut bars = BTreeMap::new();
        bars.insert(
            "BTC".to_string(),
            generate_synthetic_bars("BTC", date(2024, 1, 1), date(2024, 1, 5), 0.0),
        );
        let h1 = compute_dataset_hash(&bars);
        if let Some(rows) = bars.get_mut("BTC") {
            rows[2].close *= 1.01;
        }
        assert_ne!(h1, compute_dataset_hash(&bars));
    }
}
