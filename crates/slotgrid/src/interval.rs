//! Intervals on the instant axis and their stored representations.
//!
//! [`Interval`] is always absolute. Anything that arrives zone-relative is
//! held in [`StoredInterval::Civil`] until it has been resolved through
//! [`crate::zone`], so civil and absolute readings can never be mixed by
//! accident.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::slot::{self, Slot};
use crate::zone::{self, WallTime, Zone};

/// A half-open range `[start, end)` of instants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Interval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Interval {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// The single-slot interval starting at `slot`.
    pub fn from_slot(slot: Slot) -> Self {
        Self::new(slot.start, slot.end())
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }

    /// Slots touched by this interval under the any-overlap rule.
    pub fn slots(&self) -> Vec<Slot> {
        slot::quantize(self.start, self.end)
    }
}

/// An interval as it comes back from storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StoredInterval {
    /// Bounds already expressed as UTC instants.
    Absolute { start: DateTime<Utc>, end: DateTime<Utc> },
    /// Civil bounds that only mean something in `zone`.
    Civil {
        start_local: NaiveDateTime,
        end_local: NaiveDateTime,
        zone: Zone,
    },
}

impl StoredInterval {
    /// Resolve to absolute bounds, routing civil bounds through the zone
    /// converter with the default DST policy.
    pub fn resolve(&self) -> Result<Interval> {
        match self {
            StoredInterval::Absolute { start, end } => Ok(Interval::new(*start, *end)),
            StoredInterval::Civil {
                start_local,
                end_local,
                zone,
            } => {
                let start = zone::to_instant(&WallTime::new(*zone, *start_local))?;
                let end = zone::to_instant(&WallTime::new(*zone, *end_local))?;
                Ok(Interval::new(start, end))
            }
        }
    }
}

impl From<Interval> for StoredInterval {
    fn from(interval: Interval) -> Self {
        StoredInterval::Absolute {
            start: interval.start,
            end: interval.end,
        }
    }
}
