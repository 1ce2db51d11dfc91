//! Imports tiles from the `.xlsx` workbook older deployments used as their store.
//!
//! Those workbooks drifted between releases: the timestamp column was added without a header,
//! and only some revisions carried a poster column. Columns are matched by header name when
//! present and by canonical position otherwise.

use std::path::Path;

use calamine::{Data, Reader};
use serde::Serialize;
use thiserror::Error;

use crate::data::store::{record_from_cells, ColumnMap, StoreError, TileStore, TileUpdate};

#[derive(Debug, Error)]
pub enum LegacyImportError {
    #[error("failed to read workbook: {0}")]
    Workbook(#[from] calamine::Error),
    #[error("workbook has no sheets")]
    NoSheets,
    #[error("tile store error: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LegacyImportReport {
    pub source_path: String,
    pub rows_read: usize,
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
}

/// Strings are kept byte-exact; the key cell is trimmed when the row is read.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) if f.fract() == 0.0 => format!("{}", *f as i64),
        Data::Float(f) => f.to_string(),
        Data::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}

/// Upserts worksheet rows (header first) into `store`. A later row for the same
/// location replaces an earlier one.
pub fn import_rows(store: &mut TileStore, rows: &[Vec<String>]) -> LegacyImportReport {
    let mut report = LegacyImportReport::default();
    let Some((header, body)) = rows.split_first() else {
        return report;
    };
    let width = body.iter().map(Vec::len).fold(header.len(), usize::max);
    let columns = ColumnMap::from_header(header, width);

    for cells in body {
        report.rows_read += 1;
        let Some(record) = record_from_cells(&columns, cells) else {
            report.skipped += 1;
            continue;
        };

        match store.find_by_key(&record.location) {
            Some(index) => {
                store.update_fields(
                    index,
                    TileUpdate {
                        counts: record.counts,
                        text: record.text,
                        saved_at: record.saved_at,
                        poster: record.poster,
                    },
                );
                report.updated += 1;
            }
            None => {
                store.append(record);
                report.created += 1;
            }
        }
    }
    report
}

/// Reads the first sheet of `workbook_path` into the CSV store at `store_path` and persists it.
pub fn import_legacy_workbook(
    workbook_path: &Path,
    store_path: &Path,
) -> Result<LegacyImportReport, LegacyImportError> {
    let mut workbook = calamine::open_workbook_auto(workbook_path)?;
    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or(LegacyImportError::NoSheets)?;
    let range = workbook.worksheet_range(&sheet_name)?;
    let rows: Vec<Vec<String>> = range
        .rows()
        .map(|row| row.iter().map(cell_text).collect())
        .collect();

    let mut store = TileStore::load_or_create(store_path)?;
    let mut report = import_rows(&mut store, &rows);
    store.persist()?;

    report.source_path = workbook_path.display().to_string();
    log::info!(
        "imported '{}' sheet: rows={}, created={}, updated={}, skipped={}",
        sheet_name,
        report.rows_read,
        report.created,
        report.updated,
        report.skipped
    );
    Ok(report)
}
