//! Artifact export: basket schedule, OOS tables, JSON report.
//!
//! Each run writes into one directory:
//! - `report.json`: the full `WalkForwardReport`
//! - `baskets.csv`: `id,start,satellites` with satellites as a JSON array
//! - `oos_returns.csv`: per-asset return contributions plus the portfolio
//! - `oos_weights.csv`: per-asset weights after each date's rebalance

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use thiserror::Error;

use regimelab_core::basket::{
    decode_satellites, encode_satellites, BasketEntry, BasketError, BasketSchedule,
};
use regimelab_core::engine::SimulationResult;

use crate::report::WalkForwardReport;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Basket(#[from] BasketError),
    #[error("baskets.csv row {row}: {message}")]
    Schedule { row: usize, message: String },
    #[error("CSV output is not valid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),
}

fn write_file(path: &Path, contents: &str) -> Result<(), ExportError> {
    std::fs::write(path, contents).map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn finish(wtr: csv::Writer<Vec<u8>>) -> Result<String, ExportError> {
    let data = wtr
        .into_inner()
        .map_err(|e| ExportError::Csv(csv::Error::from(e.into_error())))?;
    Ok(String::from_utf8(data)?)
}

// ─── Basket schedule ─────────────────────────────────────────────────

pub fn export_schedule_csv(schedule: &BasketSchedule) -> Result<String, ExportError> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["id", "start", "satellites"])?;
    for entry in schedule.entries() {
        wtr.write_record([
            &entry.id,
            &entry.start.to_string(),
            &encode_satellites(&entry.satellites)?,
        ])?;
    }
    finish(wtr)
}

/// Parse `baskets.csv` back into a schedule.
pub fn import_schedule_csv(text: &str) -> Result<BasketSchedule, ExportError> {
    let mut rdr = csv::Reader::from_reader(text.as_bytes());
    let mut entries = Vec::new();
    for (i, record) in rdr.records().enumerate() {
        let record = record?;
        let row = i + 1;
        let field = |k: usize, name: &str| {
            record.get(k).ok_or_else(|| ExportError::Schedule {
                row,
                message: format!("missing {name}"),
            })
        };
        let id = field(0, "id")?.to_string();
        let raw_start = field(1, "start")?;
        let start = NaiveDate::parse_from_str(raw_start, "%Y-%m-%d").map_err(|e| {
            ExportError::Schedule {
                row,
                message: format!("invalid start '{raw_start}': {e}"),
            }
        })?;
        let satellites = decode_satellites(field(2, "satellites")?)?;
        entries.push(BasketEntry {
            id,
            start,
            satellites,
        });
    }
    Ok(BasketSchedule::new(entries))
}

pub fn read_schedule(path: &Path) -> Result<BasketSchedule, ExportError> {
    let text = std::fs::read_to_string(path).map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    import_schedule_csv(&text)
}

pub fn write_schedule(path: &Path, schedule: &BasketSchedule) -> Result<(), ExportError> {
    write_file(path, &export_schedule_csv(schedule)?)
}

// ─── OOS tables ──────────────────────────────────────────────────────

/// Columns: date, one per symbol, portfolio.
pub fn export_returns_csv(result: &SimulationResult) -> Result<String, ExportError> {
    let portfolio = result.portfolio_returns();
    export_table(result, &result.returns, Some(portfolio.as_slice()))
}

/// Columns: date, one per symbol.
pub fn export_weights_csv(result: &SimulationResult) -> Result<String, ExportError> {
    export_table(result, &result.weights, None)
}

fn export_table(
    result: &SimulationResult,
    rows: &[Vec<f64>],
    total: Option<&[f64]>,
) -> Result<String, ExportError> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    let mut header = vec!["date".to_string()];
    header.extend(result.symbols.iter().cloned());
    if total.is_some() {
        header.push("portfolio".to_string());
    }
    wtr.write_record(&header)?;

    for (t, (date, row)) in result.dates.iter().zip(rows).enumerate() {
        let mut record = vec![date.to_string()];
        record.extend(row.iter().map(|v| format!("{v:.10}")));
        if let Some(total) = total {
            record.push(format!("{:.10}", total[t]));
        }
        wtr.write_record(&record)?;
    }
    finish(wtr)
}

// ─── Artifact bundle ─────────────────────────────────────────────────

/// Paths of one run's written artifacts.
#[derive(Debug, Clone)]
pub struct RunArtifacts {
    pub dir: PathBuf,
    pub report: PathBuf,
    pub baskets: PathBuf,
    pub returns: PathBuf,
    pub weights: PathBuf,
}

/// Write the full artifact set into `dir`, creating it if needed.
pub fn save_artifacts(
    dir: &Path,
    report: &WalkForwardReport,
    schedule: &BasketSchedule,
    oos: &SimulationResult,
) -> Result<RunArtifacts, ExportError> {
    std::fs::create_dir_all(dir).map_err(|source| ExportError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    let artifacts = RunArtifacts {
        dir: dir.to_path_buf(),
        report: dir.join("report.json"),
        baskets: dir.join("baskets.csv"),
        returns: dir.join("oos_returns.csv"),
        weights: dir.join("oos_weights.csv"),
    };

    write_file(&artifacts.report, &serde_json::to_string_pretty(report)?)?;
    write_schedule(&artifacts.baskets, schedule)?;
    write_file(&artifacts.returns, &export_returns_csv(oos)?)?;
    write_file(&artifacts.weights, &export_weights_csv(oos)?)?;
    Ok(artifacts)
}
