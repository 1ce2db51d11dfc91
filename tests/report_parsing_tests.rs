use tilewatch::report::{
    extract_color_counts, extract_location, is_valid_report, CountVector, Faction, NO_LOCATION,
};

#[test]
fn climb_report_yields_location_and_summary_counts() {
    let message = "You climbed to the highest point in the RG 12#3 Total: 5 👥 🇲🇴: 3 🇻🇦: 2";
    assert!(is_valid_report(message));
    assert_eq!(extract_location(message).as_str(), "rg123");
    let counts = extract_color_counts(message);
    assert_eq!(counts.get(Faction::Moldova), 3);
    assert_eq!(counts.get(Faction::Vatican), 2);
    assert_eq!(counts.get(Faction::IsleOfMan), 0);
    assert_eq!(counts.get(Faction::EuropeanUnion), 0);
}

#[test]
fn participant_listing_is_counted_by_flag() {
    let message = "You looked to the (B 7)\n\
                   🇻🇦Ana 🏅2 👣10\n\
                   🇻🇦Iván 🏅1 👣8\n\
                   🇪🇺Olga 🏅0 👣3";
    assert!(is_valid_report(message));
    assert_eq!(extract_location(message).as_str(), "b7");
    assert_eq!(extract_color_counts(message), CountVector::new(0, 2, 0, 1));
}

#[test]
fn oversized_summary_value_is_treated_as_missing() {
    let counts = extract_color_counts("🇲🇴: 99999999999 🇮🇲: 4");
    assert_eq!(counts, CountVector::new(0, 0, 4, 0));
}

#[test]
fn chatter_is_not_a_report_but_still_extracts_safely() {
    let message = "anyone seen Y41 lately? 🇪🇺";
    assert!(!is_valid_report(message));
    assert_eq!(extract_location(message).as_str(), "y41");
    assert_eq!(extract_location("no tile here").as_str(), NO_LOCATION);
}
