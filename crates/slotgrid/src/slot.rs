//! The slot clock: fixed-width slots aligned to the Unix-epoch instant grid.
//!
//! A slot is identified by its start instant. Alignment is computed on the
//! instant axis, never in a display zone, so a slot keeps its identity when
//! the grid is re-rendered in another zone.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Width of one grid slot in minutes.
pub const SLOT_MINUTES: i64 = 30;

/// Number of rows in a full-day grid column.
pub const SLOTS_PER_DAY: usize = (24 * 60 / SLOT_MINUTES) as usize;

const SLOT_SECONDS: i64 = SLOT_MINUTES * 60;

/// Width of one slot.
pub fn slot_width() -> Duration {
    Duration::minutes(SLOT_MINUTES)
}

/// A half-open slot `[start, start + SLOT_MINUTES)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Slot {
    pub start: DateTime<Utc>,
}

impl Slot {
    /// The slot containing `instant`.
    pub fn containing(instant: DateTime<Utc>) -> Self {
        Self {
            start: floor_to_slot(instant),
        }
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.start + slot_width()
    }

    pub fn next(&self) -> Self {
        Self { start: self.end() }
    }

    /// Any-overlap test against a half-open `[start, end)` range.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        start < self.end() && end > self.start
    }
}

/// Round `instant` down to the start of its slot.
pub fn floor_to_slot(instant: DateTime<Utc>) -> DateTime<Utc> {
    let secs = instant.timestamp();
    let floored = secs - secs.rem_euclid(SLOT_SECONDS);
    // Flooring never moves outside chrono's representable range for in-range input.
    DateTime::from_timestamp(floored, 0).unwrap_or(instant)
}

/// Whether `instant` sits exactly on a slot boundary.
pub fn is_aligned(instant: DateTime<Utc>) -> bool {
    instant.timestamp_subsec_nanos() == 0 && instant.timestamp().rem_euclid(SLOT_SECONDS) == 0
}

/// Every slot touched by the half-open range `[start, end)`.
///
/// A slot counts as soon as it overlaps the range at all, so a range that
/// starts or ends mid-slot still claims the partial slots at its edges.
/// Returns an empty list when `end <= start`.
pub fn quantize(start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<Slot> {
    let mut slots = Vec::new();
    if end <= start {
        return slots;
    }
    let mut slot = Slot::containing(start);
    while slot.start < end {
        slots.push(slot);
        slot = slot.next();
    }
    slots
}
