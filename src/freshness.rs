//! Minutes since a tile was last saved, measured in a fixed reference zone.

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};

use crate::error::TileError;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Returned when no usable timestamp is stored.
pub const UNKNOWN_ELAPSED: i64 = -1;

/// Source of the current instant.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Always reports the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Renders `now` as reference-zone wall time for storage.
pub fn format_timestamp(now: DateTime<Utc>, zone: FixedOffset) -> String {
    now.with_timezone(&zone).format(TIMESTAMP_FORMAT).to_string()
}

pub fn parse_timestamp(raw: &str) -> Result<NaiveDateTime, TileError> {
    NaiveDateTime::parse_from_str(raw.trim(), TIMESTAMP_FORMAT)
        .map_err(|_| TileError::MalformedTimestamp(raw.to_string()))
}

/// Whole minutes between `saved` (naive wall time in `zone`) and `now`, rounded toward
/// negative infinity. Future timestamps give negative values. Missing or unparsable
/// timestamps give [`UNKNOWN_ELAPSED`].
pub fn elapsed_minutes(saved: Option<&str>, now: DateTime<Utc>, zone: FixedOffset) -> i64 {
    let Some(raw) = saved else {
        return UNKNOWN_ELAPSED;
    };
    let naive = match parse_timestamp(raw) {
        Ok(naive) => naive,
        Err(err) => {
            log::warn!("{err}; reporting freshness as unknown");
            return UNKNOWN_ELAPSED;
        }
    };
    let Some(saved_at) = zone.from_local_datetime(&naive).single() else {
        return UNKNOWN_ELAPSED;
    };
    let elapsed = now.with_timezone(&zone) - saved_at;
    elapsed.num_seconds().div_euclid(60)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn havana() -> FixedOffset {
        FixedOffset::west_opt(5 * 3600).expect("valid offset")
    }

    fn at(raw: &str) -> DateTime<Utc> {
        let naive = NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT).expect("fixture");
        havana()
            .from_local_datetime(&naive)
            .single()
            .expect("fixed offsets are unambiguous")
            .with_timezone(&Utc)
    }

    #[test]
    fn missing_timestamp_is_unknown() {
        assert_eq!(elapsed_minutes(None, Utc::now(), havana()), -1);
    }

    #[test]
    fn malformed_timestamp_is_unknown() {
        assert_eq!(elapsed_minutes(Some("yesterday"), Utc::now(), havana()), -1);
        assert!(matches!(
            parse_timestamp("2024-13-01 00:00:00"),
            Err(TileError::MalformedTimestamp(_))
        ));
    }

    #[test]
    fn same_instant_is_zero_minutes() {
        let now = at("2024-05-01 10:00:00");
        assert_eq!(elapsed_minutes(Some("2024-05-01 10:00:00"), now, havana()), 0);
    }

    #[test]
    fn elapsed_grows_with_time_and_floors_partial_minutes() {
        let saved = Some("2024-05-01 10:00:00");
        assert_eq!(elapsed_minutes(saved, at("2024-05-01 10:00:59"), havana()), 0);
        assert_eq!(elapsed_minutes(saved, at("2024-05-01 10:01:00"), havana()), 1);
        assert_eq!(elapsed_minutes(saved, at("2024-05-01 12:30:30"), havana()), 150);
    }

    #[test]
    fn future_timestamps_are_negative() {
        let now = at("2024-05-01 10:00:00");
        assert_eq!(elapsed_minutes(Some("2024-05-01 10:00:30"), now, havana()), -1);
        assert_eq!(elapsed_minutes(Some("2024-05-01 10:10:00"), now, havana()), -10);
    }

    #[test]
    fn result_does_not_depend_on_the_instant_zone() {
        let now = at("2024-05-01 10:45:00");
        let formatted = format_timestamp(now, havana());
        assert_eq!(formatted, "2024-05-01 10:45:00");
        assert_eq!(elapsed_minutes(Some(&formatted), now, havana()), 0);
    }
}
