//! CSV-backed tile store: one row per location, rewritten in full on every persist.
//!
//! Rows are written in the canonical column order. Reading maps columns by header name so
//! files written by older deployments (Spanish headers, missing timestamp or poster columns)
//! still load.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use crate::report::{CountVector, Faction, LocationKey};

pub const DEFAULT_STORE_PATH: &str = "data/tiles.csv";

pub const HEADER: [&str; 8] = [
    "location", "🇲🇴", "🇻🇦", "🇮🇲", "🇪🇺", "text", "saved_at", "poster",
];

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

/// Latest known state of one tile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TileRecord {
    pub location: LocationKey,
    pub counts: CountVector,
    pub text: String,
    /// Reference-zone local time of the last write, `%Y-%m-%d %H:%M:%S`.
    pub saved_at: Option<String>,
    pub poster: Option<String>,
}

impl TileRecord {
    fn to_row(&self) -> Vec<String> {
        let mut row = Vec::with_capacity(HEADER.len());
        row.push(self.location.to_string());
        row.extend(self.counts.iter().map(|(_, count)| count.to_string()));
        row.push(self.text.clone());
        row.push(self.saved_at.clone().unwrap_or_default());
        row.push(self.poster.clone().unwrap_or_default());
        row
    }
}

/// Fields replaced wholesale when a tile is reported again.
#[derive(Debug, Clone)]
pub struct TileUpdate {
    pub counts: CountVector,
    pub text: String,
    pub saved_at: Option<String>,
    pub poster: Option<String>,
}

/// Column positions resolved from a header row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ColumnMap {
    pub location: usize,
    pub counts: [usize; 4],
    pub text: usize,
    pub saved_at: Option<usize>,
    pub poster: Option<usize>,
}

impl ColumnMap {
    /// Named columns win; anything unnamed falls back to its canonical position.
    /// Timestamp and poster positions are only assumed when the row is wide enough to hold them.
    pub fn from_header(header: &[String], width: usize) -> Self {
        let find = |names: &[&str]| {
            header.iter().position(|cell| {
                let cell = cell.trim().to_lowercase();
                names.iter().any(|name| cell == *name)
            })
        };
        let counts = Faction::ALL.map(|faction| {
            header
                .iter()
                .position(|cell| cell.trim() == faction.symbol())
                .unwrap_or(1 + faction.index())
        });
        ColumnMap {
            location: find(&["location", "ubicación", "ubicacion"]).unwrap_or(0),
            counts,
            text: find(&["text", "texto"]).unwrap_or(5),
            saved_at: find(&["saved_at", "timestamp", "fecha"]).or((width > 6).then_some(6)),
            poster: find(&["poster", "posted_by", "publicado_por"]).or((width > 7).then_some(7)),
        }
    }
}

pub(crate) fn parse_count(raw: &str) -> u32 {
    let raw = raw.trim();
    raw.parse::<u32>()
        .ok()
        .or_else(|| raw.parse::<f64>().ok().filter(|v| *v >= 0.0).map(|v| v as u32))
        .unwrap_or(0)
}

pub(crate) fn non_empty(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Builds a record from a row of cells, or `None` when the row has no location.
pub(crate) fn record_from_cells(columns: &ColumnMap, cells: &[String]) -> Option<TileRecord> {
    let cell = |index: usize| cells.get(index).map(String::as_str);
    let location = non_empty(cell(columns.location))?;
    let mut counts = CountVector::default();
    for (faction, index) in Faction::ALL.into_iter().zip(columns.counts) {
        counts.set(faction, cell(index).map(parse_count).unwrap_or(0));
    }
    Some(TileRecord {
        location: LocationKey::from_stored(&location),
        counts,
        text: cell(columns.text).unwrap_or("").to_string(),
        saved_at: non_empty(columns.saved_at.and_then(cell)),
        poster: non_empty(columns.poster.and_then(cell)),
    })
}

#[derive(Debug, Clone)]
pub struct TileStore {
    path: PathBuf,
    records: Vec<TileRecord>,
}

impl TileStore {
    /// Empty store bound to `path`; nothing is read or written.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        TileStore {
            path: path.into(),
            records: Vec::new(),
        }
    }

    /// Loads the store at `path`, creating it with just the header row when missing.
    pub fn load_or_create(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if !path.exists() {
            let store = TileStore::new(path);
            store.persist()?;
            log::info!("created tile store at {}", path.display());
            return Ok(store);
        }

        let raw = fs::read_to_string(path)?;
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(raw.as_bytes());
        let mut rows = Vec::new();
        for row in reader.records() {
            rows.push(row?.iter().map(str::to_string).collect::<Vec<String>>());
        }
        if rows.is_empty() {
            return Ok(TileStore::new(path));
        }
        let header = rows.remove(0);
        let width = rows.iter().map(Vec::len).fold(header.len(), usize::max);
        let columns = ColumnMap::from_header(&header, width);

        let mut records: Vec<TileRecord> = Vec::with_capacity(rows.len());
        for record in rows.iter().filter_map(|cells| record_from_cells(&columns, cells)) {
            match records.iter().position(|seen| seen.location == record.location) {
                Some(index) => {
                    log::warn!(
                        "duplicate tile {} in {}; keeping the later row",
                        record.location,
                        path.display()
                    );
                    records[index] = record;
                }
                None => records.push(record),
            }
        }
        log::debug!("loaded {} tile(s) from {}", records.len(), path.display());

        Ok(TileStore {
            path: path.to_path_buf(),
            records,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn records(&self) -> &[TileRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&TileRecord> {
        self.records.get(index)
    }

    pub fn find_by_key(&self, key: &LocationKey) -> Option<usize> {
        self.records.iter().position(|record| &record.location == key)
    }

    /// Callers look the key up first; the store holds at most one row per location.
    pub fn append(&mut self, record: TileRecord) {
        debug_assert!(self.find_by_key(&record.location).is_none());
        self.records.push(record);
    }

    /// Overwrites counts, text, timestamp and poster of the row at `index`.
    /// Returns `false` when the index is out of range.
    pub fn update_fields(&mut self, index: usize, update: TileUpdate) -> bool {
        let Some(record) = self.records.get_mut(index) else {
            return false;
        };
        record.counts = update.counts;
        record.text = update.text;
        record.saved_at = update.saved_at;
        record.poster = update.poster;
        true
    }

    pub fn to_csv_string(&self) -> Result<String, StoreError> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(HEADER)?;
        for record in &self.records {
            writer.write_record(record.to_row())?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|err| StoreError::Io(err.into_error()))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Rewrites the whole file through a sibling temp file.
    pub fn persist(&self) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let serialized = self.to_csv_string()?;
        let tmp = self.path.with_extension("csv.tmp");
        fs::write(&tmp, serialized)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}
