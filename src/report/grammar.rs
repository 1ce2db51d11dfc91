//! Recognizes tile reports relayed from the game.
//!
//! Only the header phrase is reliable across report formats. The location token, the
//! team/total summary and the participant list after it are all optional, so the grammar
//! accepts any tail and leaves malformed tails to the extractors.

use once_cell::sync::Lazy;
use regex::Regex;

const HEADER: &str =
    r"(?i)^\s*(?:you\s+)?(?:climbed\s+to\s+the\s+highest\s+point\s+in\s+the|looked\s+to\s+the)";
const LOCATION_TOKEN: &str = r"(?:\s*[\[(]?\s*(?:[RGBY]{1,2}\s*\d+(?:#\d+)?|0#0)\s*[\])]?)?";
const SUMMARY_BLOCK: &str = r"(?:[^\n]*?(?:team|total)[^\n]*)?";
const PARTICIPANTS: &str = r"(?:\s*(?:🇲🇴|🇻🇦|🇮🇲|🇪🇺)[^\n🏅]*🏅\s*\d+\s+\D*?\d+)*";

pub const STANDARD_VERSION: &str = "header-v1";

static STANDARD: Lazy<HeaderGrammar> = Lazy::new(HeaderGrammar::standard);

/// A swappable report grammar. The reconciliation engine only asks whether a message is a report.
pub trait ReportGrammar: Send + Sync {
    fn is_valid_report(&self, message: &str) -> bool;

    /// Identifies the pattern revision in logs.
    fn version(&self) -> &str;
}

#[derive(Debug, Clone)]
pub struct HeaderGrammar {
    pattern: Regex,
    version: String,
}

impl HeaderGrammar {
    pub fn standard() -> Self {
        let source = format!("{HEADER}{LOCATION_TOKEN}{SUMMARY_BLOCK}{PARTICIPANTS}");
        HeaderGrammar {
            pattern: Regex::new(&source).expect("standard report grammar is valid"),
            version: STANDARD_VERSION.to_string(),
        }
    }

    /// Custom pattern. Matches count only when they begin at the start of the message,
    /// whether or not the pattern itself is anchored.
    pub fn from_pattern(version: &str, pattern: &str) -> Result<Self, regex::Error> {
        Ok(HeaderGrammar {
            pattern: Regex::new(pattern)?,
            version: version.to_string(),
        })
    }
}

impl ReportGrammar for HeaderGrammar {
    fn is_valid_report(&self, message: &str) -> bool {
        self.pattern
            .find(message)
            .is_some_and(|found| found.start() == 0)
    }

    fn version(&self) -> &str {
        &self.version
    }
}

/// Checks a message against the standard grammar.
pub fn is_valid_report(message: &str) -> bool {
    STANDARD.is_valid_report(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_climb_report_with_summary() {
        assert!(is_valid_report(
            "You climbed to the highest point in the RG 12#3 Total: 5 👥 🇲🇴: 3 🇻🇦: 2"
        ));
    }

    #[test]
    fn accepts_look_report_with_bracketed_location_and_participants() {
        let message = "You looked to the [GY 2#1]\n👥Team: 2\n🇲🇴Alpha 🏅3 👣12\n🇪🇺Beta 🏅0 👣4";
        assert!(is_valid_report(message));
    }

    #[test]
    fn accepts_zero_location_marker_and_bare_header() {
        assert!(is_valid_report("You looked to the 0#0"));
        assert!(is_valid_report("climbed to the highest point in the"));
    }

    #[test]
    fn header_is_case_insensitive_and_tolerates_leading_space() {
        assert!(is_valid_report("  YOU LOOKED TO THE B7"));
    }

    #[test]
    fn rejects_messages_without_leading_header() {
        assert!(!is_valid_report("hello there"));
        assert!(!is_valid_report("I think you climbed to the highest point in the R1"));
        assert!(!is_valid_report(""));
    }

    #[test]
    fn custom_pattern_must_match_at_start() {
        let grammar = HeaderGrammar::from_pattern("test", r"scout report").expect("valid pattern");
        assert!(grammar.is_valid_report("scout report R1"));
        assert!(!grammar.is_valid_report("late scout report R1"));
        assert_eq!(grammar.version(), "test");
    }

    #[test]
    fn invalid_custom_pattern_is_an_error() {
        assert!(HeaderGrammar::from_pattern("broken", "(unclosed").is_err());
    }
}
