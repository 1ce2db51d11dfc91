use std::path::PathBuf;

use thiserror::Error;

use crate::data::store::StoreError;

/// Outcome of a failed tile operation. Every variant is recoverable; the caller
/// decides how to present it.
#[derive(Debug, Error)]
pub enum TileError {
    #[error("message is not a recognized tile report")]
    InvalidReport,
    #[error("report was not forwarded from the game source")]
    NotForwarded,
    #[error("user {0} is not authorized")]
    Unauthorized(i64),
    #[error("no information stored for location '{0}'")]
    LocationNotFound(String),
    #[error("failed to load tile store '{}': {source}", path.display())]
    StoreLoad {
        path: PathBuf,
        #[source]
        source: StoreError,
    },
    /// The in-memory store already reflects the attempted mutation when this is returned.
    #[error("failed to persist tile store '{}': {source}", path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: StoreError,
    },
    #[error("stored timestamp '{0}' is not in the expected format")]
    MalformedTimestamp(String),
}
