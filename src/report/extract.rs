//! Pulls the location key and per-faction counts out of raw report text.
//! Both extractors are total: unrecognized input degrades to the sentinel key or zero counts.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// Key stored for reports that carry no recognizable location token.
pub const NO_LOCATION: &str = "no_location_found";

/// Sentinel spelling written by older deployments; read back as [`NO_LOCATION`].
const LEGACY_NO_LOCATION: &str = "ubicacion_no_encontrada";

static LOCATION_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)([RGBY]{1,2})\s*(\d+)(?:#(\d+))?").expect("location pattern is valid")
});

static COUNT_PATTERNS: Lazy<[Regex; 4]> = Lazy::new(|| {
    Faction::ALL.map(|faction| {
        Regex::new(&format!(r"{}\s*:\s*(\d+)", regex::escape(faction.symbol())))
            .expect("count pattern is valid")
    })
});

/// The four tracked factions, in column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Faction {
    Moldova,
    Vatican,
    IsleOfMan,
    EuropeanUnion,
}

impl Faction {
    pub const ALL: [Faction; 4] = [
        Faction::Moldova,
        Faction::Vatican,
        Faction::IsleOfMan,
        Faction::EuropeanUnion,
    ];

    pub fn symbol(self) -> &'static str {
        match self {
            Faction::Moldova => "🇲🇴",
            Faction::Vatican => "🇻🇦",
            Faction::IsleOfMan => "🇮🇲",
            Faction::EuropeanUnion => "🇪🇺",
        }
    }

    /// Column offset of the faction within a count vector.
    pub fn index(self) -> usize {
        match self {
            Faction::Moldova => 0,
            Faction::Vatican => 1,
            Faction::IsleOfMan => 2,
            Faction::EuropeanUnion => 3,
        }
    }
}

/// Canonical tile key such as `gy2` or `rg123`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct LocationKey(String);

impl LocationKey {
    pub fn not_found() -> Self {
        LocationKey(NO_LOCATION.to_string())
    }

    /// Key as typed by a user asking for a tile ("GY2", " gy2 "). Lookups are exact on the
    /// normalized form, so only whitespace and case are forgiven.
    pub fn from_query(raw: &str) -> Self {
        LocationKey(raw.trim().to_lowercase())
    }

    /// Key as read back from a store or legacy workbook. Normalized like a query, with the
    /// legacy sentinel folded into the current one.
    pub fn from_stored(raw: &str) -> Self {
        let key = LocationKey::from_query(raw);
        if key.0 == LEGACY_NO_LOCATION {
            return LocationKey::not_found();
        }
        key
    }

    pub fn is_not_found(&self) -> bool {
        self.0 == NO_LOCATION
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LocationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Troop count per faction. Always holds all four factions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CountVector([u32; 4]);

impl CountVector {
    pub fn new(moldova: u32, vatican: u32, isle_of_man: u32, european_union: u32) -> Self {
        CountVector([moldova, vatican, isle_of_man, european_union])
    }

    pub fn get(&self, faction: Faction) -> u32 {
        self.0[faction.index()]
    }

    pub fn set(&mut self, faction: Faction, count: u32) {
        self.0[faction.index()] = count;
    }

    pub fn is_all_zero(&self) -> bool {
        self.0.iter().all(|count| *count == 0)
    }

    pub fn total(&self) -> u64 {
        self.0.iter().map(|count| u64::from(*count)).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Faction, u32)> + '_ {
        Faction::ALL.into_iter().map(|faction| (faction, self.get(faction)))
    }
}

impl Serialize for CountVector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(Faction::ALL.len()))?;
        for (faction, count) in self.iter() {
            map.serialize_entry(faction.symbol(), &count)?;
        }
        map.end()
    }
}

/// First `<color><number>[#<sub>]` token in the message, lowercased and joined without separators.
pub fn extract_location(message: &str) -> LocationKey {
    let Some(caps) = LOCATION_PATTERN.captures(message) else {
        return LocationKey::not_found();
    };
    let prefix = caps[1].to_lowercase();
    let region = &caps[2];
    let sub = caps.get(3).map(|m| m.as_str()).unwrap_or("");
    LocationKey(format!("{prefix}{region}{sub}"))
}

/// Faction counts from `SYMBOL: N` summary entries, falling back to counting symbol
/// occurrences when no summary yields a non-zero value.
pub fn extract_color_counts(message: &str) -> CountVector {
    let mut counts = CountVector::default();
    for (faction, pattern) in Faction::ALL.into_iter().zip(COUNT_PATTERNS.iter()) {
        let value = pattern
            .captures(message)
            .and_then(|caps| caps[1].parse::<u32>().ok())
            .unwrap_or(0);
        counts.set(faction, value);
    }
    if !counts.is_all_zero() {
        return counts;
    }

    // participant listings carry one flag per member instead of a summary line
    for faction in Faction::ALL {
        let occurrences = message.matches(faction.symbol()).count();
        counts.set(faction, u32::try_from(occurrences).unwrap_or(u32::MAX));
    }
    counts
}
