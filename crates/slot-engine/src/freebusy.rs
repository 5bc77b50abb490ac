//! Compute free time slots inside a working-hours window.
//!
//! Sorts busy intervals by start time, then sweeps a cursor across the window,
//! emitting every gap of at least the requested duration.

use chrono::{DateTime, Duration, FixedOffset};
use tracing::debug;

use crate::error::{Result, SlotError};
use crate::interval::{BusyInterval, FreeSlot, WorkingHours};

/// Find free slots of at least `min_duration` within `window`.
///
/// `busy` may be unordered and may overlap. All-day entries are ignored, as
/// are timed entries that do not intersect the window at all. Entries that
/// stick out of either end of the window are clipped by the sweep: the cursor
/// never moves backwards and the trailing gap is capped at the window end.
///
/// Returns slots in chronological order; an empty list means the day is full.
///
/// # Errors
/// Returns `SlotError::InvalidDuration` if `min_duration` is not positive.
pub fn find_free_slots(
    window: &WorkingHours,
    busy: &[BusyInterval],
    min_duration: Duration,
) -> Result<Vec<FreeSlot>> {
    if min_duration <= Duration::zero() {
        return Err(SlotError::InvalidDuration(format!(
            "minimum slot duration must be positive, got {} minutes",
            min_duration.num_minutes()
        )));
    }

    let mut intervals: Vec<(DateTime<FixedOffset>, DateTime<FixedOffset>)> = busy
        .iter()
        .filter_map(BusyInterval::interval)
        .filter(|interval| interval.overlaps(window.interval()))
        .map(|interval| (interval.start(), interval.end()))
        .collect();

    // Sort by start time (then by end time for determinism).
    intervals.sort_by_key(|&(start, end)| (start, end));

    let mut slots = Vec::new();
    let mut cursor = window.start();

    for (busy_start, busy_end) in intervals {
        if busy_start - cursor >= min_duration {
            slots.push(FreeSlot::between(cursor, busy_start));
        }
        cursor = cursor.max(busy_end);
    }

    // Trailing slot after the last busy period.
    if window.end() - cursor >= min_duration {
        slots.push(FreeSlot::between(cursor, window.end()));
    }

    debug!(
        window_start = %window.start(),
        min_minutes = min_duration.num_minutes(),
        slots = slots.len(),
        "free-slot sweep"
    );

    Ok(slots)
}

/// Find the first free slot of at least `min_duration` within `window`.
///
/// Delegates to [`find_free_slots`].
pub fn find_first_free_slot(
    window: &WorkingHours,
    busy: &[BusyInterval],
    min_duration: Duration,
) -> Result<Option<FreeSlot>> {
    Ok(find_free_slots(window, busy, min_duration)?.into_iter().next())
}
