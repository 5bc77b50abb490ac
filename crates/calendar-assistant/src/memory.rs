//! An in-process calendar for offline runs and tests.

use std::sync::{Mutex, MutexGuard};

use chrono_tz::Tz;
use slot_engine::interval::TimeInterval;

use crate::error::{AssistantError, Result};
use crate::provider::{BusyRecord, CalendarProvider, EventDraft, EventPatch};

#[derive(Debug, Default)]
struct Store {
    records: Vec<BusyRecord>,
    next_id: u64,
}

/// A [`CalendarProvider`] holding events in memory.
///
/// Listing returns timed events overlapping the window sorted by start, followed
/// by every all-day event. Ids are assigned as `evt-1`, `evt-2`, …
#[derive(Debug)]
pub struct InMemoryCalendar {
    time_zone: Tz,
    store: Mutex<Store>,
}

impl InMemoryCalendar {
    pub fn new(time_zone: Tz) -> Self {
        Self {
            time_zone,
            store: Mutex::new(Store::default()),
        }
    }

    /// Seed the calendar with existing records.
    pub fn with_records(time_zone: Tz, records: impl IntoIterator<Item = BusyRecord>) -> Self {
        let calendar = Self::new(time_zone);
        calendar.lock().records.extend(records);
        calendar
    }

    /// Every stored record, in insertion order.
    pub fn records(&self) -> Vec<BusyRecord> {
        self.lock().records.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Store> {
        self.store.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl CalendarProvider for InMemoryCalendar {
    fn list_busy_intervals(&self, window: &TimeInterval) -> Result<Vec<BusyRecord>> {
        let store = self.lock();
        let mut timed = Vec::new();
        let mut all_day = Vec::new();

        for record in &store.records {
            match record.to_busy_interval(self.time_zone)?.interval() {
                Some(interval) if interval.overlaps(window) => {
                    timed.push((interval.start(), record.clone()))
                }
                Some(_) => {}
                None => all_day.push(record.clone()),
            }
        }

        timed.sort_by_key(|(start, _)| *start);
        Ok(timed
            .into_iter()
            .map(|(_, record)| record)
            .chain(all_day)
            .collect())
    }

    fn create_event(&self, draft: &EventDraft) -> Result<String> {
        let mut store = self.lock();
        store.next_id += 1;
        let id = format!("evt-{}", store.next_id);
        store.records.push(BusyRecord {
            id: id.clone(),
            title: draft.title.clone(),
            start: Some(draft.start().to_rfc3339()),
            end: Some(draft.end().to_rfc3339()),
            location: draft.location.clone(),
        });
        Ok(id)
    }

    fn update_event(&self, event_id: &str, patch: &EventPatch) -> Result<()> {
        let mut store = self.lock();
        let record = store
            .records
            .iter_mut()
            .find(|r| r.id == event_id)
            .ok_or_else(|| AssistantError::NotFound(event_id.to_string()))?;

        if let Some(title) = &patch.title {
            record.title = title.clone();
        }
        if let Some(interval) = &patch.interval {
            record.start = Some(interval.start().to_rfc3339());
            record.end = Some(interval.end().to_rfc3339());
        }
        if let Some(location) = &patch.location {
            record.location = Some(location.clone());
        }
        Ok(())
    }

    fn delete_event(&self, event_id: &str) -> Result<()> {
        let mut store = self.lock();
        let before = store.records.len();
        store.records.retain(|r| r.id != event_id);
        if store.records.len() == before {
            return Err(AssistantError::NotFound(event_id.to_string()));
        }
        Ok(())
    }
}
