//! The availability service seen from the engine, plus an in-memory
//! implementation of it.
//!
//! The trait is synchronous: the engine does no I/O of its own, and callers
//! wrap it in whatever transport and runtime they use. Response ordering is
//! handled by [`crate::session::RequestSeq`], not here.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::error::{GridError, Result};
use crate::expand::Participant;
use crate::grid::EventBounds;
use crate::slot;
use crate::wire::{Ack, AvailabilityIn, CellOut, EventOut, GridOut, ParticipantOut};
use crate::zone::{self, Zone};

/// Persistence and aggregation collaborator.
pub trait AvailabilityService {
    fn create_event(
        &mut self,
        title: &str,
        zone: Zone,
        start_utc: Option<DateTime<Utc>>,
        end_utc: Option<DateTime<Utc>>,
    ) -> Result<EventOut>;

    fn get_event(&self, event_id: u64) -> Result<EventOut>;

    /// Create or update the participant named `username` in the event. The
    /// returned color is authoritative.
    fn upsert_participant(
        &mut self,
        event_id: u64,
        username: &str,
        zone: Zone,
        color: &str,
    ) -> Result<ParticipantOut>;

    /// Occupied slots of the event, timestamps rendered in `zone`.
    fn fetch_grid(&self, event_id: u64, zone: Zone) -> Result<GridOut>;

    /// Replace the participant's availability with `payload`.
    fn submit_availability(&mut self, event_id: u64, payload: &AvailabilityIn) -> Result<Ack>;
}

/// In-process service with latest-write-wins participant updates.
///
/// - Participants are keyed by `(event, username)`; an upsert for an existing
///   name overwrites its zone and color.
/// - A submission replaces all previous slots of that participant.
/// - Submitted intervals are quantized with the any-overlap rule; inverted
///   intervals are ignored.
#[derive(Debug, Default)]
pub struct MemoryService {
    events: BTreeMap<u64, EventOut>,
    participants: BTreeMap<u64, ParticipantOut>,
    slots: BTreeMap<u64, BTreeSet<DateTime<Utc>>>,
    next_event_id: u64,
    next_participant_id: u64,
}

impl MemoryService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Participants of an event, sorted by username.
    pub fn list_participants(&self, event_id: u64) -> Vec<ParticipantOut> {
        let mut out: Vec<ParticipantOut> = self
            .participants
            .values()
            .filter(|p| p.event_id == event_id)
            .cloned()
            .collect();
        out.sort_by(|a, b| a.username.cmp(&b.username));
        out
    }

    fn event(&self, event_id: u64) -> Result<&EventOut> {
        self.events
            .get(&event_id)
            .ok_or_else(|| GridError::Service(format!("event {} not found", event_id)))
    }
}

impl AvailabilityService for MemoryService {
    fn create_event(
        &mut self,
        title: &str,
        zone: Zone,
        start_utc: Option<DateTime<Utc>>,
        end_utc: Option<DateTime<Utc>>,
    ) -> Result<EventOut> {
        if let (Some(start), Some(end)) = (start_utc, end_utc) {
            EventBounds::new(start, end)?;
        }
        self.next_event_id += 1;
        let event = EventOut {
            id: self.next_event_id,
            title: title.to_string(),
            default_timezone: zone,
            start_utc,
            end_utc,
        };
        self.events.insert(event.id, event.clone());
        info!(event_id = event.id, title, "event created");
        Ok(event)
    }

    fn get_event(&self, event_id: u64) -> Result<EventOut> {
        self.event(event_id).cloned()
    }

    fn upsert_participant(
        &mut self,
        event_id: u64,
        username: &str,
        zone: Zone,
        color: &str,
    ) -> Result<ParticipantOut> {
        self.event(event_id)?;
        let existing = self
            .participants
            .values_mut()
            .find(|p| p.event_id == event_id && p.username == username);
        if let Some(p) = existing {
            debug!(event_id, username, "participant updated");
            p.timezone = zone;
            p.color = color.to_string();
            return Ok(p.clone());
        }

        self.next_participant_id += 1;
        let participant = ParticipantOut {
            id: self.next_participant_id,
            event_id,
            username: username.to_string(),
            timezone: zone,
            color: color.to_string(),
        };
        self.participants.insert(participant.id, participant.clone());
        debug!(event_id, username, id = participant.id, "participant joined");
        Ok(participant)
    }

    fn fetch_grid(&self, event_id: u64, zone: Zone) -> Result<GridOut> {
        self.event(event_id)?;

        let mut buckets: BTreeMap<DateTime<Utc>, Vec<Participant>> = BTreeMap::new();
        for (participant_id, starts) in &self.slots {
            let Some(p) = self.participants.get(participant_id) else {
                continue;
            };
            if p.event_id != event_id {
                continue;
            }
            for start in starts {
                buckets.entry(*start).or_default().push(p.tag());
            }
        }

        let slots = buckets
            .into_iter()
            .map(|(start, participants)| {
                let end = start + slot::slot_width();
                CellOut {
                    slot_start: zone::to_offset_datetime(start, zone),
                    slot_end: zone::to_offset_datetime(end, zone),
                    participants,
                }
            })
            .collect();

        Ok(GridOut {
            event_id,
            timezone: zone,
            slots,
        })
    }

    fn submit_availability(&mut self, event_id: u64, payload: &AvailabilityIn) -> Result<Ack> {
        self.event(event_id)?;
        match self.participants.get(&payload.participant_id) {
            Some(p) if p.event_id == event_id => {}
            _ => {
                return Err(GridError::Service(format!(
                    "invalid participant {}",
                    payload.participant_id
                )))
            }
        }

        let mut starts = BTreeSet::new();
        for wire in &payload.intervals {
            let interval = wire.resolve()?;
            if interval.is_empty() {
                continue;
            }
            starts.extend(interval.slots().into_iter().map(|s| s.start));
        }

        let slots_added = starts.len();
        self.slots.insert(payload.participant_id, starts);
        info!(
            event_id,
            participant_id = payload.participant_id,
            slots_added,
            "availability replaced"
        );
        Ok(Ack {
            status: "ok".to_string(),
            slots_added,
        })
    }
}
