//! Tests for buffered conflict detection.

use chrono::{Duration, FixedOffset, TimeZone};
use slot_engine::interval::{BusyInterval, TimeInterval};
use slot_engine::{has_conflict, SlotError};

/// Helper to create an interval from hour/minute ranges on 2026-03-02 (UTC).
fn interval(start_hour: u32, start_min: u32, end_hour: u32, end_min: u32) -> TimeInterval {
    let utc = FixedOffset::east_opt(0).unwrap();
    TimeInterval::new(
        utc.with_ymd_and_hms(2026, 3, 2, start_hour, start_min, 0)
            .unwrap(),
        utc.with_ymd_and_hms(2026, 3, 2, end_hour, end_min, 0)
            .unwrap(),
    )
    .unwrap()
}

fn busy(id: &str, start_hour: u32, start_min: u32, end_hour: u32, end_min: u32) -> BusyInterval {
    BusyInterval::timed(
        id,
        format!("Event {}", id),
        interval(start_hour, start_min, end_hour, end_min),
    )
}

#[test]
fn buffer_reaches_following_event() {
    // Candidate 14:00-15:00 padded by 15m ends 15:15, past the 15:10 start.
    let candidate = interval(14, 0, 15, 0);
    let existing = vec![busy("a", 15, 10, 16, 0)];

    let check = has_conflict(&candidate, &existing, Duration::minutes(15)).unwrap();

    assert!(check.has_conflict);
    assert_eq!(check.conflicts, existing);
}

#[test]
fn small_buffer_clears_following_event() {
    // Padded by 5m the candidate ends 15:05, before the 15:10 start.
    let candidate = interval(14, 0, 15, 0);
    let existing = vec![busy("a", 15, 10, 16, 0)];

    let check = has_conflict(&candidate, &existing, Duration::minutes(5)).unwrap();

    assert!(!check.has_conflict);
    assert!(check.conflicts.is_empty());
}

#[test]
fn buffer_pads_before_the_candidate_too() {
    // Busy 13:00-13:50 ends inside the 15m lead-in of a 14:00 candidate.
    let candidate = interval(14, 0, 15, 0);
    let existing = vec![busy("a", 13, 0, 13, 50)];

    let check = has_conflict(&candidate, &existing, Duration::minutes(15)).unwrap();

    assert!(check.has_conflict);
}

#[test]
fn adjacent_event_without_buffer_is_not_a_conflict() {
    let candidate = interval(14, 0, 15, 0);
    let existing = vec![busy("before", 13, 0, 14, 0), busy("after", 15, 0, 16, 0)];

    let check = has_conflict(&candidate, &existing, Duration::zero()).unwrap();

    assert!(
        !check.has_conflict,
        "adjacent events (end == start) should not be conflicts"
    );
}

#[test]
fn all_conflicts_returned_in_input_order() {
    let candidate = interval(9, 0, 12, 0);
    let existing = vec![
        busy("late", 11, 0, 13, 0),
        busy("clear", 14, 0, 15, 0),
        busy("early", 8, 0, 9, 30),
        busy("inside", 10, 0, 10, 30),
    ];

    let check = has_conflict(&candidate, &existing, Duration::zero()).unwrap();

    let ids: Vec<&str> = check.conflicts.iter().map(|b| b.id.as_str()).collect();
    assert_eq!(ids, vec!["late", "early", "inside"]);
}

#[test]
fn all_day_events_never_conflict() {
    let candidate = interval(9, 0, 10, 0);
    let existing = vec![BusyInterval::all_day("holiday", "Public holiday")];

    let check = has_conflict(&candidate, &existing, Duration::minutes(30)).unwrap();

    assert!(!check.has_conflict);
    assert!(check.conflicts.is_empty());
}

#[test]
fn empty_busy_list_no_conflicts() {
    let check = has_conflict(&interval(9, 0, 10, 0), &[], Duration::minutes(15)).unwrap();
    assert!(!check.has_conflict);
}

#[test]
fn negative_buffer_rejected() {
    let result = has_conflict(&interval(9, 0, 10, 0), &[], Duration::minutes(-5));
    assert!(matches!(result, Err(SlotError::InvalidDuration(_))));
}

#[test]
fn buffer_beyond_date_range_is_an_error() {
    let existing = vec![busy("a", 10, 0, 11, 0)];
    let result = has_conflict(&interval(14, 0, 15, 0), &existing, Duration::weeks(100_000_000));
    assert!(matches!(result, Err(SlotError::InvalidDuration(_))));
}

#[test]
fn inverted_candidate_rejected_at_construction() {
    let utc = FixedOffset::east_opt(0).unwrap();
    let result = TimeInterval::new(
        utc.with_ymd_and_hms(2026, 3, 2, 15, 0, 0).unwrap(),
        utc.with_ymd_and_hms(2026, 3, 2, 14, 0, 0).unwrap(),
    );
    assert!(matches!(result, Err(SlotError::MalformedInterval(_))));
}

#[test]
fn offsets_compare_as_instants() {
    // 14:00-15:00 UTC vs. a busy block written as 20:00-21:00 +05:30 (14:30-15:30 UTC).
    let candidate = interval(14, 0, 15, 0);
    let existing = vec![BusyInterval::from_iso(
        "ist",
        "Standup",
        Some("2026-03-02T20:00:00+05:30"),
        Some("2026-03-02T21:00:00+05:30"),
        chrono_tz::UTC,
    )
    .unwrap()];

    let check = has_conflict(&candidate, &existing, Duration::zero()).unwrap();

    assert!(check.has_conflict);
}
