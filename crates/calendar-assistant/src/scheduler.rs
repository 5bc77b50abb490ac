//! The scheduling workflow: extract, check for conflicts, create, and fall back
//! to alternative times when the calendar is busy.

use std::time::Instant;

use chrono::{DateTime, Duration, FixedOffset, NaiveDate};
use serde::Serialize;
use slot_engine::interval::{BusyInterval, FreeSlot, TimeInterval, WorkingHours};
use slot_engine::{find_free_slots, has_conflict, ConflictCheck, SlotError};
use tracing::{debug, info, warn};

use crate::cache::TtlCache;
use crate::config::Settings;
use crate::error::{AssistantError, Result};
use crate::extract::{EventExtractor, Suggestion};
use crate::provider::{to_busy_intervals, BusyRecord, CalendarProvider, EventDraft, EventPatch};

/// Upper bound on events returned by [`Scheduler::upcoming`].
pub const MAX_UPCOMING: usize = 20;

/// Upper bound on free slots offered by [`Scheduler::alternatives`].
pub const MAX_FREE_SLOT_ALTERNATIVES: usize = 5;

/// What happened to a scheduling request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ScheduleOutcome {
    Created { event_id: String },
    /// Nothing was written; these commitments collide with the buffered request.
    Conflicted { conflicts: Vec<BusyInterval> },
}

/// Replacement times offered after a conflict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "source", content = "options", rename_all = "snake_case")]
pub enum Alternatives {
    Suggested(Vec<Suggestion>),
    /// Working-hours gaps on the requested day, used when the model has nothing to offer.
    FreeSlots(Vec<FreeSlot>),
}

pub struct Scheduler<P, X> {
    provider: P,
    extractor: X,
    settings: Settings,
    upcoming: TtlCache<i64, Vec<BusyRecord>>,
}

impl<P: CalendarProvider, X: EventExtractor> Scheduler<P, X> {
    pub fn new(provider: P, extractor: X, settings: Settings) -> Self {
        let upcoming = TtlCache::new(settings.cache_ttl);
        Self {
            provider,
            extractor,
            settings,
            upcoming,
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Turn a free-text request into an event draft in the configured zone.
    pub fn extract(&self, text: &str) -> Result<EventDraft> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AssistantError::Extraction(
                "Describe the event to schedule".to_string(),
            ));
        }
        let event = self.extractor.extract_event(text)?;
        debug!(title = %event.title, start = %event.start_time, "extracted event");
        EventDraft::from_extraction(&event, self.settings.time_zone)
    }

    /// Check the draft, padded by the configured buffer, against the calendar.
    pub fn check_conflicts(&self, draft: &EventDraft) -> Result<ConflictCheck> {
        let buffer = self.settings.buffer();
        let padded = draft.interval.padded(buffer)?;

        let records = self.provider.list_busy_intervals(&padded)?;
        let busy = to_busy_intervals(&records, self.settings.time_zone)?;
        Ok(has_conflict(&draft.interval, &busy, buffer)?)
    }

    /// Create the event unless it conflicts with an existing one.
    pub fn schedule(&mut self, draft: &EventDraft) -> Result<ScheduleOutcome> {
        let check = self.check_conflicts(draft)?;
        if check.has_conflict {
            info!(
                title = %draft.title,
                conflicts = check.conflicts.len(),
                "scheduling conflict"
            );
            return Ok(ScheduleOutcome::Conflicted {
                conflicts: check.conflicts,
            });
        }
        let event_id = self.force_schedule(draft)?;
        Ok(ScheduleOutcome::Created { event_id })
    }

    /// Create the event without looking for conflicts.
    pub fn force_schedule(&mut self, draft: &EventDraft) -> Result<String> {
        let event_id = self.provider.create_event(draft)?;
        self.upcoming.clear();
        info!(event_id = %event_id, title = %draft.title, "event created");
        Ok(event_id)
    }

    /// Alternative times for a conflicted draft.
    ///
    /// Uses the language model's suggestions when it returns any; otherwise
    /// the first [`MAX_FREE_SLOT_ALTERNATIVES`] free slots on the draft's day
    /// that fit its duration.
    pub fn alternatives(
        &self,
        draft: &EventDraft,
        conflicts: &[BusyInterval],
    ) -> Result<Alternatives> {
        let description = format!(
            "Schedule {} for {} minutes",
            draft.title,
            draft.duration().num_minutes()
        );
        match self.extractor.suggest_alternatives(&description, conflicts) {
            Ok(suggestions) if !suggestions.is_empty() => {
                return Ok(Alternatives::Suggested(suggestions))
            }
            Ok(_) => warn!("no suggestions returned, falling back to free slots"),
            Err(e) => warn!(error = %e, "suggestions failed, falling back to free slots"),
        }

        let date = draft
            .start()
            .with_timezone(&self.settings.time_zone)
            .date_naive();
        let mut slots = self.free_slots(date, draft.duration())?;
        slots.truncate(MAX_FREE_SLOT_ALTERNATIVES);
        Ok(Alternatives::FreeSlots(slots))
    }

    /// Gaps of at least `duration` inside the configured working hours on `date`.
    pub fn free_slots(&self, date: NaiveDate, duration: Duration) -> Result<Vec<FreeSlot>> {
        let window = WorkingHours::on(
            date,
            self.settings.work_start,
            self.settings.work_end,
            self.settings.time_zone,
        )?;
        let records = self.provider.list_busy_intervals(window.interval())?;
        let busy = to_busy_intervals(&records, self.settings.time_zone)?;
        Ok(find_free_slots(&window, &busy, duration)?)
    }

    /// The draft moved to the start of `slot`, keeping its duration.
    pub fn draft_for_slot(&self, draft: &EventDraft, slot: &FreeSlot) -> Result<EventDraft> {
        draft.retimed(slot.start)
    }

    /// The draft moved to a suggested time; the duration follows the suggestion.
    pub fn draft_for_suggestion(
        &self,
        draft: &EventDraft,
        suggestion: &Suggestion,
    ) -> Result<EventDraft> {
        let interval = TimeInterval::parse(
            &suggestion.start_time,
            &suggestion.end_time,
            self.settings.time_zone,
        )?;
        Ok(EventDraft {
            interval,
            ..draft.clone()
        })
    }

    /// Timed events in the next `days` days, at most [`MAX_UPCOMING`].
    ///
    /// Results are cached per `days` for the configured TTL; any write through
    /// this scheduler clears the cache.
    pub fn upcoming(&mut self, now: DateTime<FixedOffset>, days: i64) -> Result<Vec<BusyRecord>> {
        if days <= 0 {
            return Err(SlotError::InvalidDuration(format!(
                "look-ahead must be at least one day, got {}",
                days
            ))
            .into());
        }

        let instant = Instant::now();
        if let Some(cached) = self.upcoming.get(&days, instant) {
            debug!(days, "upcoming events served from cache");
            return Ok(cached);
        }

        let end = Duration::try_days(days)
            .and_then(|ahead| now.checked_add_signed(ahead))
            .ok_or_else(|| {
                SlotError::InvalidDuration(format!("look-ahead of {} days is out of range", days))
            })?;
        let window = TimeInterval::new(now, end)?;
        let events: Vec<BusyRecord> = self
            .provider
            .list_busy_intervals(&window)?
            .into_iter()
            .filter(|r| !r.is_all_day())
            .take(MAX_UPCOMING)
            .collect();

        self.upcoming.insert(days, events.clone(), instant);
        Ok(events)
    }

    pub fn update_event(&mut self, event_id: &str, patch: &EventPatch) -> Result<()> {
        self.provider.update_event(event_id, patch)?;
        self.upcoming.clear();
        info!(event_id, "event updated");
        Ok(())
    }

    pub fn delete_event(&mut self, event_id: &str) -> Result<()> {
        self.provider.delete_event(event_id)?;
        self.upcoming.clear();
        info!(event_id, "event deleted");
        Ok(())
    }
}
