//! End-to-end workflow tests against the in-memory calendar.

use calendar_assistant::extract::{ExtractedEvent, Suggestion};
use calendar_assistant::scheduler::{MAX_FREE_SLOT_ALTERNATIVES, MAX_UPCOMING};
use calendar_assistant::{
    Alternatives, AssistantError, BusyRecord, CalendarProvider, EventExtractor, EventPatch,
    InMemoryCalendar, ScheduleOutcome, Scheduler, Settings,
};
use chrono::{Duration, NaiveDate};
use chrono_tz::Tz;
use slot_engine::interval::{BusyInterval, TimeInterval};
use slot_engine::{parse_timestamp, SlotError};

const TZ: Tz = chrono_tz::Asia::Kolkata;

// ── Helpers ─────────────────────────────────────────────────────────────────

/// Extractor returning a fixed event and a configurable suggestion reply.
struct Scripted {
    event: ExtractedEvent,
    suggestions: Option<Vec<Suggestion>>,
}

impl Scripted {
    fn at(start: &str, end: &str) -> Self {
        Self {
            event: ExtractedEvent {
                title: "Team Meeting".to_string(),
                start_time: start.to_string(),
                end_time: end.to_string(),
                duration_minutes: 60,
                location: None,
                category: Some("Meeting".to_string()),
                description: None,
            },
            suggestions: None,
        }
    }

    fn suggesting(mut self, suggestions: Vec<Suggestion>) -> Self {
        self.suggestions = Some(suggestions);
        self
    }
}

impl EventExtractor for Scripted {
    fn extract_event(&self, _text: &str) -> calendar_assistant::error::Result<ExtractedEvent> {
        Ok(self.event.clone())
    }

    fn suggest_alternatives(
        &self,
        _description: &str,
        _conflicts: &[BusyInterval],
    ) -> calendar_assistant::error::Result<Vec<Suggestion>> {
        self.suggestions
            .clone()
            .ok_or_else(|| AssistantError::Extraction("model unavailable".to_string()))
    }
}

fn record(id: &str, start: &str, end: &str) -> BusyRecord {
    BusyRecord {
        id: id.to_string(),
        title: format!("Busy {}", id),
        start: Some(start.to_string()),
        end: Some(end.to_string()),
        location: None,
    }
}

fn all_day(id: &str) -> BusyRecord {
    BusyRecord {
        id: id.to_string(),
        title: "Holiday".to_string(),
        start: None,
        end: None,
        location: None,
    }
}

fn scheduler(
    records: Vec<BusyRecord>,
    extractor: Scripted,
) -> Scheduler<InMemoryCalendar, Scripted> {
    Scheduler::new(
        InMemoryCalendar::with_records(TZ, records),
        extractor,
        Settings::default(),
    )
}

fn meeting_at_two() -> Scripted {
    Scripted::at("2026-03-02T14:00:00", "2026-03-02T15:00:00")
}

// ── Scheduling ──────────────────────────────────────────────────────────────

#[test]
fn free_calendar_creates_event() {
    let mut s = scheduler(vec![], meeting_at_two());
    let draft = s.extract("team meeting tomorrow at 2").unwrap();

    let outcome = s.schedule(&draft).unwrap();

    assert_eq!(
        outcome,
        ScheduleOutcome::Created {
            event_id: "evt-1".to_string()
        }
    );
    let stored = s.provider().records();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].start.as_deref(), Some("2026-03-02T14:00:00+05:30"));
}

#[test]
fn event_inside_default_buffer_conflicts() {
    // Default buffer is 15 minutes; 15:10 is within it.
    let busy = record("a", "2026-03-02T15:10:00+05:30", "2026-03-02T16:00:00+05:30");
    let mut s = scheduler(vec![busy], meeting_at_two());
    let draft = s.extract("team meeting").unwrap();

    let outcome = s.schedule(&draft).unwrap();

    match outcome {
        ScheduleOutcome::Conflicted { conflicts } => {
            assert_eq!(conflicts.len(), 1);
            assert_eq!(conflicts[0].id, "a");
        }
        other => panic!("expected a conflict, got {:?}", other),
    }
    assert_eq!(s.provider().records().len(), 1, "nothing was written");
}

#[test]
fn event_outside_small_buffer_is_created() {
    let busy = record("a", "2026-03-02T15:10:00+05:30", "2026-03-02T16:00:00+05:30");
    let settings = Settings {
        buffer_minutes: 5,
        ..Settings::default()
    };
    let mut s = Scheduler::new(
        InMemoryCalendar::with_records(TZ, vec![busy]),
        meeting_at_two(),
        settings,
    );
    let draft = s.extract("team meeting").unwrap();

    assert!(matches!(
        s.schedule(&draft).unwrap(),
        ScheduleOutcome::Created { .. }
    ));
}

#[test]
fn negative_buffer_setting_is_rejected_by_engine() {
    let settings = Settings {
        buffer_minutes: -5,
        ..Settings::default()
    };
    let s = Scheduler::new(InMemoryCalendar::new(TZ), meeting_at_two(), settings);
    let draft = s.extract("team meeting").unwrap();

    assert!(matches!(
        s.check_conflicts(&draft),
        Err(AssistantError::Slot(SlotError::InvalidDuration(_)))
    ));
}

#[test]
fn all_day_events_do_not_block_scheduling() {
    let mut s = scheduler(vec![all_day("holi")], meeting_at_two());
    let draft = s.extract("team meeting").unwrap();

    assert!(matches!(
        s.schedule(&draft).unwrap(),
        ScheduleOutcome::Created { .. }
    ));
}

#[test]
fn force_schedule_ignores_conflicts() {
    let busy = record("a", "2026-03-02T14:00:00+05:30", "2026-03-02T15:00:00+05:30");
    let mut s = scheduler(vec![busy], meeting_at_two());
    let draft = s.extract("team meeting").unwrap();

    let id = s.force_schedule(&draft).unwrap();

    assert_eq!(id, "evt-1");
    assert_eq!(s.provider().records().len(), 2);
}

#[test]
fn malformed_provider_record_is_surfaced() {
    let broken = BusyRecord {
        end: None,
        ..record("x", "2026-03-02T14:30:00+05:30", "unused")
    };
    let mut s = scheduler(vec![broken], meeting_at_two());
    let draft = s.extract("team meeting").unwrap();

    let err = s.schedule(&draft).unwrap_err();

    assert!(matches!(
        err,
        AssistantError::Slot(SlotError::MalformedInterval(_))
    ));
}

#[test]
fn inverted_extraction_is_malformed() {
    let s = scheduler(
        vec![],
        Scripted::at("2026-03-02T15:00:00", "2026-03-02T14:00:00"),
    );
    let err = s.extract("backwards").unwrap_err();
    assert!(matches!(
        err,
        AssistantError::Slot(SlotError::MalformedInterval(_))
    ));
}

#[test]
fn blank_request_rejected_before_extraction() {
    let s = scheduler(vec![], meeting_at_two());
    assert!(matches!(
        s.extract("   "),
        Err(AssistantError::Extraction(_))
    ));
}

// ── Alternatives ────────────────────────────────────────────────────────────

#[test]
fn model_suggestions_are_preferred() {
    let suggestion = Suggestion {
        suggestion: "Tomorrow at 4 PM".to_string(),
        start_time: "2026-03-02T16:00:00".to_string(),
        end_time: "2026-03-02T16:30:00".to_string(),
        reason: "Free afternoon".to_string(),
    };
    let s = scheduler(vec![], meeting_at_two().suggesting(vec![suggestion.clone()]));
    let draft = s.extract("team meeting").unwrap();

    let alternatives = s.alternatives(&draft, &[]).unwrap();
    assert_eq!(alternatives, Alternatives::Suggested(vec![suggestion.clone()]));

    let moved = s.draft_for_suggestion(&draft, &suggestion).unwrap();
    assert_eq!(moved.title, "Team Meeting");
    assert_eq!(moved.duration(), Duration::minutes(30));
}

#[test]
fn failed_suggestions_fall_back_to_free_slots() {
    let busy = vec![
        record("a", "2026-03-02T09:00:00+05:30", "2026-03-02T12:00:00+05:30"),
        record("b", "2026-03-02T14:00:00+05:30", "2026-03-02T17:30:00+05:30"),
    ];
    let s = scheduler(busy, meeting_at_two());
    let draft = s.extract("team meeting").unwrap();

    let Alternatives::FreeSlots(slots) = s.alternatives(&draft, &[]).unwrap() else {
        panic!("expected free-slot fallback");
    };

    // 12:00-14:00 fits an hour; 17:30-18:00 does not.
    assert_eq!(slots.len(), 1);
    assert_eq!(slots[0].duration_minutes, 120);

    let moved = s.draft_for_slot(&draft, &slots[0]).unwrap();
    assert_eq!(moved.start(), parse_timestamp("2026-03-02T12:00:00", TZ).unwrap());
    assert_eq!(moved.duration(), Duration::minutes(60));
}

#[test]
fn empty_suggestions_fall_back_to_free_slots() {
    let s = scheduler(vec![], meeting_at_two().suggesting(vec![]));
    let draft = s.extract("team meeting").unwrap();

    let alternatives = s.alternatives(&draft, &[]).unwrap();

    match alternatives {
        Alternatives::FreeSlots(slots) => {
            assert_eq!(slots.len(), 1);
            assert_eq!(slots[0].duration_minutes, 540);
        }
        other => panic!("expected free slots, got {:?}", other),
    }
}

#[test]
fn free_slot_fallback_is_capped() {
    // Half-hour blocks every 90 minutes leave six hour-long gaps.
    let busy = ["10:00", "11:30", "13:00", "14:30", "16:00"]
        .iter()
        .enumerate()
        .map(|(i, start)| {
            let start = parse_timestamp(&format!("2026-03-02T{}:00", start), TZ).unwrap();
            let end = start + Duration::minutes(30);
            record(&format!("b{}", i), &start.to_rfc3339(), &end.to_rfc3339())
        })
        .collect();
    let s = scheduler(busy, meeting_at_two());
    let draft = s.extract("team meeting").unwrap();

    let Alternatives::FreeSlots(slots) = s.alternatives(&draft, &[]).unwrap() else {
        panic!("expected free-slot fallback");
    };

    assert_eq!(slots.len(), MAX_FREE_SLOT_ALTERNATIVES);
    assert_eq!(slots[0].start, parse_timestamp("2026-03-02T09:00:00", TZ).unwrap());
    assert_eq!(slots[4].start, parse_timestamp("2026-03-02T15:00:00", TZ).unwrap());
}

#[test]
fn free_slots_respect_configured_hours() {
    let settings = Settings::from_lookup(|key| match key {
        "WORK_START" => Some("10:00".to_string()),
        "WORK_END" => Some("12:00".to_string()),
        _ => None,
    })
    .unwrap();
    let s = Scheduler::new(
        InMemoryCalendar::with_records(
            TZ,
            vec![record("a", "2026-03-02T10:30:00+05:30", "2026-03-02T11:00:00+05:30")],
        ),
        meeting_at_two(),
        settings,
    );

    let slots = s
        .free_slots(NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(), Duration::minutes(30))
        .unwrap();

    let minutes: Vec<i64> = slots.iter().map(|s| s.duration_minutes).collect();
    assert_eq!(minutes, vec![30, 60]);
}

// ── Upcoming events and cache ───────────────────────────────────────────────

#[test]
fn upcoming_lists_timed_events_and_is_cached() {
    let records = vec![
        record("later", "2026-03-04T10:00:00+05:30", "2026-03-04T11:00:00+05:30"),
        record("soon", "2026-03-02T10:00:00+05:30", "2026-03-02T11:00:00+05:30"),
        record("far", "2026-03-20T10:00:00+05:30", "2026-03-20T11:00:00+05:30"),
        all_day("holi"),
    ];
    let mut s = scheduler(records, meeting_at_two());
    let now = parse_timestamp("2026-03-02T08:00:00", TZ).unwrap();

    let first = s.upcoming(now, 7).unwrap();
    let ids: Vec<&str> = first.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["soon", "later"]);

    // A write behind the scheduler's back is not visible until the cache is cleared.
    let draft = s.extract("x").unwrap();
    s.provider().create_event(&draft).unwrap();
    assert_eq!(s.upcoming(now, 7).unwrap().len(), 2);

    // A write through the scheduler clears it.
    s.delete_event("far").unwrap();
    assert_eq!(s.upcoming(now, 7).unwrap().len(), 3);
}

#[test]
fn upcoming_is_capped() {
    let records: Vec<BusyRecord> = (0..30)
        .map(|i| {
            record(
                &format!("e{}", i),
                &format!("2026-03-03T{:02}:00:00+05:30", i % 24),
                &format!("2026-03-03T{:02}:30:00+05:30", i % 24),
            )
        })
        .collect();
    let mut s = scheduler(records, meeting_at_two());
    let now = parse_timestamp("2026-03-02T08:00:00", TZ).unwrap();

    assert_eq!(s.upcoming(now, 7).unwrap().len(), MAX_UPCOMING);
}

#[test]
fn upcoming_needs_positive_days() {
    let mut s = scheduler(vec![], meeting_at_two());
    let now = parse_timestamp("2026-03-02T08:00:00", TZ).unwrap();
    assert!(matches!(
        s.upcoming(now, 0),
        Err(AssistantError::Slot(SlotError::InvalidDuration(_)))
    ));
}

#[test]
fn upcoming_beyond_date_range_is_an_error() {
    let mut s = scheduler(vec![], meeting_at_two());
    let now = parse_timestamp("2026-03-02T08:00:00", TZ).unwrap();
    assert!(matches!(
        s.upcoming(now, i64::MAX),
        Err(AssistantError::Slot(SlotError::InvalidDuration(_)))
    ));
}

// ── Update / delete ─────────────────────────────────────────────────────────

#[test]
fn update_moves_event() {
    let mut s = scheduler(
        vec![record("a", "2026-03-02T10:00:00+05:30", "2026-03-02T11:00:00+05:30")],
        meeting_at_two(),
    );
    let interval = TimeInterval::parse("2026-03-02T16:00:00", "2026-03-02T17:00:00", TZ).unwrap();
    let patch = EventPatch {
        title: Some("Moved".to_string()),
        interval: Some(interval),
        ..EventPatch::default()
    };

    s.update_event("a", &patch).unwrap();

    let stored = &s.provider().records()[0];
    assert_eq!(stored.title, "Moved");
    assert_eq!(stored.start.as_deref(), Some("2026-03-02T16:00:00+05:30"));
}

#[test]
fn unknown_ids_are_not_found() {
    let mut s = scheduler(vec![], meeting_at_two());
    assert!(matches!(
        s.delete_event("nope"),
        Err(AssistantError::NotFound(id)) if id == "nope"
    ));
    assert!(matches!(
        s.update_event("nope", &EventPatch::default()),
        Err(AssistantError::NotFound(_))
    ));
}
