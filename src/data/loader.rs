//! CSV loading for the cohort summary table.
//!
//! The table is read once and treated as immutable. Any failure (missing
//! file, unreadable record, absent column) yields `None`; callers turn that
//! into the "missing file" notice.

use crate::models::CohortRow;
use anyhow::{bail, Result};
use csv::{ReaderBuilder, StringRecord, Trim};
use std::path::Path;
use std::sync::{Arc, OnceLock};
use tracing::{debug, info, warn};

/// The loaded summary table.
#[derive(Debug, Clone, Default)]
pub struct CohortTable {
    /// Header row exactly as found in the file.
    pub headers: Vec<String>,
    /// Every record as raw strings, for display.
    pub records: Vec<Vec<String>>,
    /// Typed rows, in source order.
    pub rows: Vec<CohortRow>,
}

/// Columns every summary file must carry. Extra columns are allowed.
pub const REQUIRED_COLUMNS: [&str; 7] = [
    "cohort",
    "total_loans_disbursed",
    "total_loans_received",
    "total_outstanding_loans",
    "loan_recovery_rate_pct",
    "loss_rate",
    "portfolio_rank",
];

impl CohortTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }
}

static TABLE: OnceLock<Option<Arc<CohortTable>>> = OnceLock::new();

/// Load the table once per process.
///
/// The first call decides the outcome (including a `None` for a missing
/// file); later calls return the same value whatever path they pass.
pub fn load_cached(path: &Path) -> Option<Arc<CohortTable>> {
    TABLE
        .get_or_init(|| load_table(path).map(Arc::new))
        .clone()
}

/// Read and parse the CSV at `path`. Returns `None` on any failure.
pub fn load_table(path: &Path) -> Option<CohortTable> {
    match try_load(path) {
        Ok(table) => {
            info!(
                "Loaded {} cohort rows from {}",
                table.len(),
                path.display()
            );
            Some(table)
        }
        Err(e) => {
            warn!("Could not load {}: {:#}", path.display(), e);
            None
        }
    }
}

fn try_load(path: &Path) -> Result<CohortTable> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_path(path)?;

    let header_record: StringRecord = reader.headers()?.clone();
    let headers: Vec<String> = header_record.iter().map(str::to_string).collect();
    debug!("CSV headers: {:?}", headers);

    let missing = missing_columns(&headers);
    if !missing.is_empty() {
        bail!("missing required column(s): {}", missing.join(", "));
    }

    let mut records = Vec::new();
    let mut rows = Vec::new();

    for result in reader.records() {
        let record = result?;
        let row: CohortRow = record.deserialize(Some(&header_record))?;
        records.push(record.iter().map(str::to_string).collect());
        rows.push(row);
    }

    Ok(CohortTable {
        headers,
        records,
        rows,
    })
}

/// Required columns absent from `headers`, in canonical order.
fn missing_columns(headers: &[String]) -> Vec<&'static str> {
    REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|required| !headers.iter().any(|h| h == required))
        .collect()
}
