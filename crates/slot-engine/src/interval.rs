//! Interval data model shared by the conflict detector and the free-slot finder.
//!
//! Every timestamp is an absolute instant carrying the UTC offset it was
//! supplied with, so results can be rendered back in the caller's zone.
//! Intervals are half-open: `[start, end)`.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use chrono_tz::Tz;
use serde::Serialize;

use crate::error::{Result, SlotError};

/// A validated `[start, end)` time range with `start < end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TimeInterval {
    start: DateTime<FixedOffset>,
    end: DateTime<FixedOffset>,
}

impl TimeInterval {
    /// Build an interval, rejecting empty or inverted ranges.
    ///
    /// # Errors
    /// Returns `SlotError::MalformedInterval` when `start >= end`.
    pub fn new(start: DateTime<FixedOffset>, end: DateTime<FixedOffset>) -> Result<Self> {
        if start >= end {
            return Err(SlotError::MalformedInterval(format!(
                "start {} is not before end {}",
                start.to_rfc3339(),
                end.to_rfc3339()
            )));
        }
        Ok(Self { start, end })
    }

    /// Parse both bounds with [`parse_timestamp`] and validate the result.
    pub fn parse(start: &str, end: &str, tz: Tz) -> Result<Self> {
        Self::new(parse_timestamp(start, tz)?, parse_timestamp(end, tz)?)
    }

    pub fn start(&self) -> DateTime<FixedOffset> {
        self.start
    }

    pub fn end(&self) -> DateTime<FixedOffset> {
        self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Half-open overlap test. Intervals that merely touch do not overlap.
    pub fn overlaps(&self, other: &TimeInterval) -> bool {
        other.start < self.end && other.end > self.start
    }

    /// Widen the interval by `buffer` on both sides.
    ///
    /// # Errors
    /// Returns `SlotError::InvalidDuration` when `buffer` is negative or
    /// pushes either bound outside the representable date range.
    pub fn padded(&self, buffer: Duration) -> Result<Self> {
        if buffer < Duration::zero() {
            return Err(SlotError::InvalidDuration(format!(
                "buffer must not be negative, got {} minutes",
                buffer.num_minutes()
            )));
        }
        let out_of_range = || {
            SlotError::InvalidDuration(format!(
                "buffer of {} minutes is out of range",
                buffer.num_minutes()
            ))
        };
        let start = self.start.checked_sub_signed(buffer).ok_or_else(out_of_range)?;
        let end = self.end.checked_add_signed(buffer).ok_or_else(out_of_range)?;
        Ok(Self { start, end })
    }
}

/// Whether a busy interval occupies a time of day or a whole calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Timing {
    Timed(TimeInterval),
    /// All-day entries never count as conflicts and never block free slots.
    AllDay,
}

/// An existing calendar commitment supplied by the calendar provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BusyInterval {
    pub id: String,
    pub title: String,
    pub timing: Timing,
}

impl BusyInterval {
    pub fn timed(id: impl Into<String>, title: impl Into<String>, interval: TimeInterval) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            timing: Timing::Timed(interval),
        }
    }

    pub fn all_day(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            timing: Timing::AllDay,
        }
    }

    /// Build a busy interval from provider timestamps.
    ///
    /// Both timestamps absent means an all-day entry. Exactly one absent is
    /// malformed, as is any timestamp that fails [`parse_timestamp`].
    pub fn from_iso(
        id: impl Into<String>,
        title: impl Into<String>,
        start: Option<&str>,
        end: Option<&str>,
        tz: Tz,
    ) -> Result<Self> {
        let id = id.into();
        match (start, end) {
            (None, None) => Ok(Self::all_day(id, title)),
            (Some(start), Some(end)) => {
                let interval = TimeInterval::parse(start, end, tz)?;
                Ok(Self::timed(id, title, interval))
            }
            _ => Err(SlotError::MalformedInterval(format!(
                "busy interval '{}' has only one of start/end",
                id
            ))),
        }
    }

    /// The timed interval, or `None` for all-day entries.
    pub fn interval(&self) -> Option<&TimeInterval> {
        match &self.timing {
            Timing::Timed(interval) => Some(interval),
            Timing::AllDay => None,
        }
    }

    pub fn is_all_day(&self) -> bool {
        matches!(self.timing, Timing::AllDay)
    }
}

/// A time interval bounding the free-slot search on one calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct WorkingHours(TimeInterval);

impl WorkingHours {
    /// Wrap an interval whose bounds fall on the same local calendar day.
    pub fn new(interval: TimeInterval) -> Result<Self> {
        if interval.start.date_naive() != interval.end.date_naive() {
            return Err(SlotError::MalformedInterval(format!(
                "working hours {} .. {} span more than one day",
                interval.start.to_rfc3339(),
                interval.end.to_rfc3339()
            )));
        }
        Ok(Self(interval))
    }

    /// Working hours `start..end` on `date`, in local time of `tz`.
    pub fn on(date: NaiveDate, start: NaiveTime, end: NaiveTime, tz: Tz) -> Result<Self> {
        let start = localize(date.and_time(start), tz)?;
        let end = localize(date.and_time(end), tz)?;
        Self::new(TimeInterval::new(start, end)?)
    }

    pub fn interval(&self) -> &TimeInterval {
        &self.0
    }

    pub fn start(&self) -> DateTime<FixedOffset> {
        self.0.start
    }

    pub fn end(&self) -> DateTime<FixedOffset> {
        self.0.end
    }
}

/// A gap in the schedule, produced by [`crate::freebusy::find_free_slots`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FreeSlot {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
    pub duration_minutes: i64,
}

impl FreeSlot {
    pub(crate) fn between(start: DateTime<FixedOffset>, end: DateTime<FixedOffset>) -> Self {
        Self {
            start,
            end,
            duration_minutes: (end - start).num_minutes(),
        }
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

/// Parse an ISO 8601 timestamp.
///
/// Accepts RFC 3339 with `Z` or a numeric offset, which is kept as-is, and
/// naive local time (`2026-03-01T14:00:00`, seconds optional), which is
/// interpreted in `tz`.
///
/// # Errors
/// Returns `SlotError::MalformedInterval` for unparseable text and for local
/// times that are skipped or repeated by a DST transition in `tz`.
pub fn parse_timestamp(s: &str, tz: Tz) -> Result<DateTime<FixedOffset>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt);
    }
    let naive = s
        .parse::<NaiveDateTime>()
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M"))
        .map_err(|e| SlotError::MalformedInterval(format!("invalid timestamp '{}': {}", s, e)))?;
    localize(naive, tz)
}

fn localize(naive: NaiveDateTime, tz: Tz) -> Result<DateTime<FixedOffset>> {
    tz.from_local_datetime(&naive)
        .single()
        .map(|dt| dt.fixed_offset())
        .ok_or_else(|| {
            SlotError::MalformedInterval(format!(
                "local time {} does not exist exactly once in {}",
                naive, tz
            ))
        })
}
