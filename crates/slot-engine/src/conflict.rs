//! Detect whether a candidate interval collides with existing commitments.
//!
//! The candidate is padded by a buffer on both sides before the overlap test.
//! Adjacent intervals (one ends exactly when the other starts) are NOT conflicts.

use chrono::Duration;
use serde::Serialize;
use tracing::debug;

use crate::error::Result;
use crate::interval::{BusyInterval, TimeInterval};

/// Result of a buffered conflict check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConflictCheck {
    pub has_conflict: bool,
    /// Every conflicting busy interval, in input order.
    pub conflicts: Vec<BusyInterval>,
}

/// Check `candidate`, widened by `buffer` on each side, against `busy`.
///
/// A busy interval `b` conflicts iff `b.start < padded.end && b.end > padded.start`.
/// All-day entries are skipped. Every conflict is returned, not just the first.
///
/// # Errors
/// Returns `SlotError::InvalidDuration` if `buffer` is negative or too large
/// to pad `candidate` within the representable date range.
pub fn has_conflict(
    candidate: &TimeInterval,
    busy: &[BusyInterval],
    buffer: Duration,
) -> Result<ConflictCheck> {
    let padded = candidate.padded(buffer)?;
    let conflicts: Vec<BusyInterval> = busy
        .iter()
        .filter(|b| b.interval().is_some_and(|interval| interval.overlaps(&padded)))
        .cloned()
        .collect();

    debug!(
        candidate_start = %candidate.start(),
        buffer_minutes = buffer.num_minutes(),
        checked = busy.len(),
        conflicts = conflicts.len(),
        "conflict check"
    );

    Ok(ConflictCheck {
        has_conflict: !conflicts.is_empty(),
        conflicts,
    })
}
