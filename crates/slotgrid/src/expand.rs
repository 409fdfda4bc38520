//! Expansion of stored intervals into per-slot participant membership.
//!
//! The output is keyed by slot start instant only. Placing a slot in a grid
//! cell happens later in [`crate::grid`], so re-rendering in another zone
//! never re-runs expansion.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::Result;
use crate::interval::{Interval, StoredInterval};
use crate::slot::{self, Slot};
use crate::wire::GridOut;

/// A participant as shown on the grid. Username uniqueness and color are
/// decided by the availability service.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Participant {
    pub username: String,
    pub color: String,
}

impl Participant {
    pub fn new(username: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            color: color.into(),
        }
    }
}

/// All stored intervals for one participant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipantIntervals {
    pub participant: Participant,
    pub intervals: Vec<StoredInterval>,
}

/// Slot start instant → participants covering that slot.
///
/// Only slots covered by at least one participant are present. Participants
/// within a slot keep insertion order and appear at most once per username.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotMembership {
    slots: BTreeMap<DateTime<Utc>, Vec<Participant>>,
}

impl SlotMembership {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `participant` in the slot starting at `slot_start`.
    pub fn insert(&mut self, slot_start: DateTime<Utc>, participant: &Participant) {
        let members = self.slots.entry(slot_start).or_default();
        if !members.iter().any(|p| p.username == participant.username) {
            members.push(participant.clone());
        }
    }

    /// Record `participant` in every slot `interval` touches.
    pub fn insert_interval(&mut self, interval: Interval, participant: &Participant) {
        for slot in interval.slots() {
            self.insert(slot.start, participant);
        }
    }

    pub fn get(&self, slot_start: DateTime<Utc>) -> &[Participant] {
        self.slots
            .get(&slot_start)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (DateTime<Utc>, &[Participant])> {
        self.slots.iter().map(|(k, v)| (*k, v.as_slice()))
    }

    /// Every occupied slot start, ascending.
    pub fn slot_starts(&self) -> BTreeSet<DateTime<Utc>> {
        self.slots.keys().copied().collect()
    }

    /// Slot starts covered by `username`.
    pub fn slots_of(&self, username: &str) -> BTreeSet<DateTime<Utc>> {
        self.slots
            .iter()
            .filter(|(_, members)| members.iter().any(|p| p.username == username))
            .map(|(k, _)| *k)
            .collect()
    }

    /// Slots where every one of `usernames` is present.
    pub fn common_slots(&self, usernames: &[&str]) -> BTreeSet<DateTime<Utc>> {
        self.slots
            .iter()
            .filter(|(_, members)| {
                usernames
                    .iter()
                    .all(|u| members.iter().any(|p| p.username == *u))
            })
            .map(|(k, _)| *k)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Build membership from a service grid response.
    ///
    /// Cell timestamps carry the response zone's offset; they are normalized to
    /// UTC and quantized with the same any-overlap rule as [`expand`].
    pub fn from_grid(grid: &GridOut) -> Self {
        let mut membership = Self::new();
        for cell in &grid.slots {
            let interval = Interval::new(
                cell.slot_start.with_timezone(&Utc),
                cell.slot_end.with_timezone(&Utc),
            );
            for participant in &cell.participants {
                membership.insert_interval(interval, participant);
            }
        }
        membership
    }
}

/// Expand stored intervals into slot membership.
///
/// An interval covers slot `S` iff `start < S.end && end > S.start`, so
/// intervals that do not sit on slot boundaries are accepted and claim every
/// slot they touch. Empty or inverted intervals are skipped.
///
/// # Errors
/// Returns the zone conversion error of the first civil interval that cannot
/// be resolved; there is no fallback zone.
pub fn expand(entries: &[ParticipantIntervals]) -> Result<SlotMembership> {
    let mut membership = SlotMembership::new();
    for entry in entries {
        for stored in &entry.intervals {
            let interval = stored.resolve()?;
            if interval.is_empty() {
                debug!(
                    username = %entry.participant.username,
                    start = %interval.start,
                    end = %interval.end,
                    "skipping empty interval"
                );
                continue;
            }
            if !slot::is_aligned(interval.start) || !slot::is_aligned(interval.end) {
                trace!(start = %interval.start, end = %interval.end, "misaligned interval");
            }
            membership.insert_interval(interval, &entry.participant);
        }
    }
    Ok(membership)
}

/// The set of slot starts covered by `intervals`.
pub fn slot_set(intervals: &[Interval]) -> BTreeSet<DateTime<Utc>> {
    intervals
        .iter()
        .flat_map(Interval::slots)
        .map(|s: Slot| s.start)
        .collect()
}
