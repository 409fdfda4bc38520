//! Shapes exchanged with the availability service.
//!
//! Interval endpoints always travel as naive civil strings plus an explicit
//! zone; recovering the instant goes through [`crate::zone`].

use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::expand::Participant;
use crate::grid::EventBounds;
use crate::interval::{Interval, StoredInterval};
use crate::zone::Zone;

pub const DEFAULT_COLOR: &str = "#66ccff";

/// An event as returned by the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventOut {
    pub id: u64,
    pub title: String,
    pub default_timezone: Zone,
    pub start_utc: Option<DateTime<Utc>>,
    pub end_utc: Option<DateTime<Utc>>,
}

impl EventOut {
    /// The event's bounds, or `None` when the event has no time range configured.
    pub fn bounds(&self) -> Result<Option<EventBounds>> {
        match (self.start_utc, self.end_utc) {
            (Some(start), Some(end)) => EventBounds::new(start, end).map(Some),
            _ => Ok(None),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipantOut {
    pub id: u64,
    pub event_id: u64,
    pub username: String,
    pub timezone: Zone,
    pub color: String,
}

impl ParticipantOut {
    pub fn tag(&self) -> Participant {
        Participant::new(&self.username, &self.color)
    }
}

/// One submitted interval: civil endpoints read in `timezone`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireInterval {
    #[serde(with = "civil")]
    pub start_local: NaiveDateTime,
    #[serde(with = "civil")]
    pub end_local: NaiveDateTime,
    pub timezone: Zone,
}

impl WireInterval {
    pub fn resolve(&self) -> Result<Interval> {
        StoredInterval::from(self.clone()).resolve()
    }
}

impl From<WireInterval> for StoredInterval {
    fn from(w: WireInterval) -> Self {
        StoredInterval::Civil {
            start_local: w.start_local,
            end_local: w.end_local,
            zone: w.timezone,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailabilityIn {
    pub participant_id: u64,
    pub intervals: Vec<WireInterval>,
}

/// Acknowledgement of a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    pub status: String,
    pub slots_added: usize,
}

/// One occupied slot in a grid response, rendered in the requested zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellOut {
    pub slot_start: DateTime<FixedOffset>,
    pub slot_end: DateTime<FixedOffset>,
    pub participants: Vec<Participant>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridOut {
    pub event_id: u64,
    pub timezone: Zone,
    pub slots: Vec<CellOut>,
}

/// Serde adapter for civil date-times; tolerant of a stray offset suffix.
mod civil {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &NaiveDateTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&crate::zone::format_civil(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(d)?;
        crate::zone::parse_civil(&raw).map_err(serde::de::Error::custom)
    }
}
