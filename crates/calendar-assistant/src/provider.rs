//! The calendar-provider port and the records that cross it.

use chrono::{DateTime, Duration, FixedOffset};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use slot_engine::interval::{BusyInterval, TimeInterval};
use slot_engine::SlotError;

use crate::error::Result;
use crate::extract::ExtractedEvent;

fn default_title() -> String {
    "No Title".to_string()
}

/// An event as listed by a calendar provider.
///
/// `start`/`end` are ISO 8601 strings; both are `None` for all-day events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusyRecord {
    pub id: String,
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl BusyRecord {
    pub fn to_busy_interval(&self, tz: Tz) -> Result<BusyInterval> {
        Ok(BusyInterval::from_iso(
            self.id.as_str(),
            self.title.as_str(),
            self.start.as_deref(),
            self.end.as_deref(),
            tz,
        )?)
    }

    pub fn is_all_day(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }
}

/// Convert a provider listing into busy intervals, failing on the first malformed record.
pub fn to_busy_intervals(records: &[BusyRecord], tz: Tz) -> Result<Vec<BusyInterval>> {
    records.iter().map(|r| r.to_busy_interval(tz)).collect()
}

/// A fully-resolved event ready to be written to a calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventDraft {
    pub title: String,
    pub interval: TimeInterval,
    pub location: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
}

impl EventDraft {
    pub fn new(title: impl Into<String>, interval: TimeInterval) -> Self {
        Self {
            title: title.into(),
            interval,
            location: None,
            description: None,
            category: None,
        }
    }

    /// Resolve an extraction's timestamps in `tz`.
    ///
    /// # Errors
    /// `MalformedInterval` when a timestamp does not parse or the end is not
    /// after the start.
    pub fn from_extraction(event: &ExtractedEvent, tz: Tz) -> Result<Self> {
        let interval = TimeInterval::parse(&event.start_time, &event.end_time, tz)?;
        Ok(Self {
            title: event.title.clone(),
            interval,
            location: event.location.clone().filter(|l| !l.is_empty()),
            description: event.description.clone().filter(|d| !d.is_empty()),
            category: event.category.clone(),
        })
    }

    pub fn start(&self) -> DateTime<FixedOffset> {
        self.interval.start()
    }

    pub fn end(&self) -> DateTime<FixedOffset> {
        self.interval.end()
    }

    pub fn duration(&self) -> Duration {
        self.interval.duration()
    }

    /// The same event moved to begin at `start`, keeping its duration.
    pub fn retimed(&self, start: DateTime<FixedOffset>) -> Result<Self> {
        let end = start.checked_add_signed(self.duration()).ok_or_else(|| {
            SlotError::MalformedInterval(format!("{} is too late to fit the event", start))
        })?;
        let interval = TimeInterval::new(start, end)?;
        Ok(Self {
            interval,
            ..self.clone()
        })
    }
}

/// Partial update of an existing event; `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventPatch {
    pub title: Option<String>,
    pub interval: Option<TimeInterval>,
    pub location: Option<String>,
    pub description: Option<String>,
}

impl EventPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.interval.is_none()
            && self.location.is_none()
            && self.description.is_none()
    }
}

/// Operations the assistant needs from a hosted calendar.
pub trait CalendarProvider {
    /// Events intersecting `window`, ordered by start time.
    fn list_busy_intervals(&self, window: &TimeInterval) -> Result<Vec<BusyRecord>>;

    /// Create an event and return its provider id.
    fn create_event(&self, draft: &EventDraft) -> Result<String>;

    fn update_event(&self, event_id: &str, patch: &EventPatch) -> Result<()>;

    fn delete_event(&self, event_id: &str) -> Result<()>;
}

impl<T: CalendarProvider + ?Sized> CalendarProvider for Box<T> {
    fn list_busy_intervals(&self, window: &TimeInterval) -> Result<Vec<BusyRecord>> {
        (**self).list_busy_intervals(window)
    }

    fn create_event(&self, draft: &EventDraft) -> Result<String> {
        (**self).create_event(draft)
    }

    fn update_event(&self, event_id: &str, patch: &EventPatch) -> Result<()> {
        (**self).update_event(event_id, patch)
    }

    fn delete_event(&self, event_id: &str) -> Result<()> {
        (**self).delete_event(event_id)
    }
}
