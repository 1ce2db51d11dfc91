//! Tile report parsing: grammar check plus location/count extraction.

mod extract;
mod grammar;

pub use extract::{
    extract_color_counts, extract_location, CountVector, Faction, LocationKey, NO_LOCATION,
};
pub use grammar::{is_valid_report, HeaderGrammar, ReportGrammar, STANDARD_VERSION};
