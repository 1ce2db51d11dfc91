//! Upserts validated reports into the tile store and serves lookups.
//!
//! Each report is a full overwrite of the tile it names: counts, text, timestamp and poster
//! are replaced, nothing is merged and no history is kept.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

use crate::data::store::{TileRecord, TileStore, TileUpdate};
use crate::error::TileError;
use crate::freshness::{elapsed_minutes, format_timestamp, Clock};
use crate::report::{extract_color_counts, extract_location, CountVector, LocationKey, ReportGrammar};

/// A report as delivered by the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundReport {
    pub text: String,
    /// Handle or display name of the user who relayed the report.
    pub poster: String,
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub language_code: Option<String>,
    /// Whether the text was forwarded from the game itself rather than typed by the user.
    #[serde(default)]
    pub forwarded: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SavedReport {
    pub location: LocationKey,
    pub counts: CountVector,
    pub record: TileRecord,
    /// `true` when this report created the tile's row.
    pub created: bool,
}

/// A stored tile with its freshness resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TileView {
    pub location: LocationKey,
    pub counts: CountVector,
    pub total: u64,
    pub text: String,
    pub saved_at: Option<String>,
    pub poster: Option<String>,
    /// `-1` when the tile has no usable timestamp.
    pub elapsed_minutes: i64,
}

/// Validates `raw_message`, upserts it into `store` stamped with `now` as reference-zone wall
/// time, and persists.
///
/// On `Persistence` errors the in-memory store already holds the new state.
pub fn save_report(
    store: &mut TileStore,
    grammar: &dyn ReportGrammar,
    raw_message: &str,
    poster: &str,
    now: DateTime<Utc>,
    zone: FixedOffset,
) -> Result<SavedReport, TileError> {
    if !grammar.is_valid_report(raw_message) {
        log::debug!("rejected message under grammar {}", grammar.version());
        return Err(TileError::InvalidReport);
    }

    let location = extract_location(raw_message);
    let counts = extract_color_counts(raw_message);
    let timestamp = format_timestamp(now, zone);

    let record = TileRecord {
        location: location.clone(),
        counts,
        text: raw_message.to_string(),
        saved_at: Some(timestamp),
        poster: Some(poster.to_string()),
    };
    let created = match store.find_by_key(&location) {
        Some(index) => {
            store.update_fields(
                index,
                TileUpdate {
                    counts,
                    text: record.text.clone(),
                    saved_at: record.saved_at.clone(),
                    poster: record.poster.clone(),
                },
            );
            false
        }
        None => {
            store.append(record.clone());
            true
        }
    };

    if let Err(source) = store.persist() {
        log::error!("tile {location} changed in memory but was not persisted: {source}");
        return Err(TileError::Persistence {
            path: store.path().to_path_buf(),
            source,
        });
    }

    log::info!(
        "{} tile {location} from {poster}",
        if created { "created" } else { "updated" }
    );
    Ok(SavedReport {
        location,
        counts,
        record,
        created,
    })
}

pub fn view_of(record: &TileRecord, elapsed_minutes: i64) -> TileView {
    TileView {
        location: record.location.clone(),
        counts: record.counts,
        total: record.counts.total(),
        text: record.text.clone(),
        saved_at: record.saved_at.clone(),
        poster: record.poster.clone(),
        elapsed_minutes,
    }
}

/// Runs reconciliations against the store file, one at a time.
pub struct ReportService {
    store_path: PathBuf,
    grammar: Box<dyn ReportGrammar>,
    clock: Box<dyn Clock>,
    zone: FixedOffset,
    store_lock: Mutex<()>,
}

impl ReportService {
    pub fn new(
        store_path: impl Into<PathBuf>,
        grammar: Box<dyn ReportGrammar>,
        clock: Box<dyn Clock>,
        zone: FixedOffset,
    ) -> Self {
        ReportService {
            store_path: store_path.into(),
            grammar,
            clock,
            zone,
            store_lock: Mutex::new(()),
        }
    }

    pub fn store_path(&self) -> &Path {
        &self.store_path
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.store_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn load_store(&self) -> Result<TileStore, TileError> {
        TileStore::load_or_create(&self.store_path).map_err(|source| TileError::StoreLoad {
            path: self.store_path.clone(),
            source,
        })
    }

    /// Reconciles a transport event. Only forwarded game reports are considered.
    pub fn submit(&self, inbound: &InboundReport) -> Result<SavedReport, TileError> {
        if !inbound.forwarded {
            return Err(TileError::NotForwarded);
        }
        let poster = match inbound.poster.trim() {
            "" => "unknown",
            poster => poster,
        };

        let _guard = self.lock();
        let mut store = self.load_store()?;
        save_report(
            &mut store,
            self.grammar.as_ref(),
            &inbound.text,
            poster,
            self.clock.now(),
            self.zone,
        )
    }

    /// Current state of the tile named by `query` (case and surrounding space are ignored).
    pub fn lookup(&self, query: &str) -> Result<TileView, TileError> {
        let key = LocationKey::from_query(query);
        let store = {
            let _guard = self.lock();
            self.load_store()?
        };
        let record = store
            .find_by_key(&key)
            .and_then(|index| store.get(index))
            .ok_or_else(|| TileError::LocationNotFound(key.to_string()))?;
        let elapsed = elapsed_minutes(record.saved_at.as_deref(), self.clock.now(), self.zone);
        Ok(view_of(record, elapsed))
    }

    pub fn export_csv(&self) -> Result<String, TileError> {
        let _guard = self.lock();
        let store = self.load_store()?;
        store.to_csv_string().map_err(|source| TileError::StoreLoad {
            path: self.store_path.clone(),
            source,
        })
    }
}
