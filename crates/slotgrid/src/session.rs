//! One participant's visit to an event, as an explicit state object.
//!
//! ```text
//! NotJoined → Joined → GridLoaded → Editing → Saved → GridLoaded
//! ```
//!
//! Display-zone changes are self-transitions that only affect layout.
//! Navigating to another event resets to `NotJoined`. Every asynchronous
//! round trip is split into `begin_*` (issues a [`RequestToken`]) and
//! `complete_*` (applies the result only if its token is still current), so a
//! double-clicked join or save cannot apply a stale response.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::compress::{compress, encode_intervals, ensure_selection};
use crate::error::{GridError, Result};
use crate::expand::SlotMembership;
use crate::grid::{self, CellKey, EventBounds, GridLayout};
use crate::interval::Interval;
use crate::service::AvailabilityService;
use crate::wire::{Ack, AvailabilityIn, EventOut, ParticipantOut};
use crate::zone::Zone;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitState {
    NotJoined,
    Joined,
    GridLoaded,
    Editing,
    Saved,
}

impl fmt::Display for VisitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            VisitState::NotJoined => "not joined",
            VisitState::Joined => "joined",
            VisitState::GridLoaded => "grid loaded",
            VisitState::Editing => "editing",
            VisitState::Saved => "saved",
        };
        f.write_str(s)
    }
}

/// Identifies one issued request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestToken(u64);

/// Monotonic request counter; only the most recently issued token is current.
#[derive(Debug, Default, Clone)]
pub struct RequestSeq {
    last: u64,
}

impl RequestSeq {
    pub fn issue(&mut self) -> RequestToken {
        self.last += 1;
        RequestToken(self.last)
    }

    pub fn is_current(&self, token: RequestToken) -> bool {
        token.0 == self.last
    }
}

/// Whether a completed response was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    /// A newer request of the same kind was issued; the response was dropped.
    Superseded,
}

/// A save ready to submit.
#[derive(Debug, Clone, PartialEq)]
pub struct SavePlan {
    pub token: RequestToken,
    pub intervals: Vec<Interval>,
    pub request: AvailabilityIn,
}

#[derive(Debug, Clone)]
pub struct Visit {
    event_id: u64,
    bounds: Option<EventBounds>,
    display_zone: Zone,
    state: VisitState,
    participant: Option<ParticipantOut>,
    selection: BTreeSet<DateTime<Utc>>,
    membership: SlotMembership,
    joins: RequestSeq,
    loads: RequestSeq,
    saves: RequestSeq,
    pending_save: Option<RequestToken>,
}

impl Visit {
    pub fn new(event: &EventOut, display_zone: Zone) -> Result<Self> {
        Ok(Self {
            event_id: event.id,
            bounds: event.bounds()?,
            display_zone,
            state: VisitState::NotJoined,
            participant: None,
            selection: BTreeSet::new(),
            membership: SlotMembership::new(),
            joins: RequestSeq::default(),
            loads: RequestSeq::default(),
            saves: RequestSeq::default(),
            pending_save: None,
        })
    }

    /// Switch to another event. Everything but the display zone is reset, and
    /// responses still in flight for the old event become stale.
    pub fn navigate(&mut self, event: &EventOut) -> Result<()> {
        self.bounds = event.bounds()?;
        self.event_id = event.id;
        self.state = VisitState::NotJoined;
        self.participant = None;
        self.selection.clear();
        self.membership = SlotMembership::new();
        self.joins.issue();
        self.loads.issue();
        self.saves.issue();
        self.pending_save = None;
        Ok(())
    }

    pub fn event_id(&self) -> u64 {
        self.event_id
    }

    pub fn state(&self) -> VisitState {
        self.state
    }

    pub fn display_zone(&self) -> Zone {
        self.display_zone
    }

    pub fn participant(&self) -> Option<&ParticipantOut> {
        self.participant.as_ref()
    }

    pub fn selection(&self) -> &BTreeSet<DateTime<Utc>> {
        &self.selection
    }

    pub fn membership(&self) -> &SlotMembership {
        &self.membership
    }

    pub fn is_save_pending(&self) -> bool {
        self.pending_save.is_some()
    }

    /// Change the display zone. Selection and membership are keyed by instant
    /// and survive unchanged; only the layout differs.
    pub fn set_display_zone(&mut self, zone: Zone) {
        self.display_zone = zone;
    }

    pub fn begin_join(&mut self) -> RequestToken {
        self.joins.issue()
    }

    /// Apply the service's participant record. The server's color wins.
    pub fn complete_join(&mut self, token: RequestToken, participant: ParticipantOut) -> Outcome {
        if !self.joins.is_current(token) {
            debug!(?token, "discarding superseded join response");
            return Outcome::Superseded;
        }
        self.participant = Some(participant);
        if self.state == VisitState::NotJoined {
            self.state = VisitState::Joined;
        }
        Outcome::Applied
    }

    /// Start fetching the grid.
    ///
    /// # Errors
    /// `InvalidTransition` before joining or while a save is still in flight;
    /// a reload issued then could read server state from before the save.
    pub fn begin_reload(&mut self) -> Result<RequestToken> {
        if self.state == VisitState::NotJoined {
            return Err(self.invalid("load the grid"));
        }
        if self.pending_save.is_some() {
            return Err(self.invalid("reload during a pending save"));
        }
        Ok(self.loads.issue())
    }

    pub fn complete_reload(&mut self, token: RequestToken, membership: SlotMembership) -> Outcome {
        if !self.loads.is_current(token) {
            debug!(?token, "discarding superseded grid response");
            return Outcome::Superseded;
        }
        self.membership = membership;
        if self.state != VisitState::Editing {
            self.state = VisitState::GridLoaded;
        }
        Outcome::Applied
    }

    /// Toggle the slot shown at `cell` in the current display zone. Returns
    /// whether the slot is selected afterwards.
    pub fn toggle(&mut self, cell: CellKey) -> Result<bool> {
        let instant = grid::cell_to_slot(cell.day, cell.time, self.display_zone)?;
        self.toggle_instant(instant)
    }

    pub fn toggle_instant(&mut self, instant: DateTime<Utc>) -> Result<bool> {
        if !matches!(self.state, VisitState::GridLoaded | VisitState::Editing) {
            return Err(self.invalid("edit the selection"));
        }
        let selected = if self.selection.remove(&instant) {
            false
        } else {
            self.selection.insert(instant);
            true
        };
        self.state = VisitState::Editing;
        Ok(selected)
    }

    pub fn is_selected(&self, cell: CellKey) -> Result<bool> {
        let instant = grid::cell_to_slot(cell.day, cell.time, self.display_zone)?;
        Ok(self.selection.contains(&instant))
    }

    /// Compress the selection and encode it in the display zone.
    ///
    /// # Errors
    /// `InvalidTransition` before joining, `EmptySelection` when nothing is
    /// selected.
    pub fn prepare_save(&mut self) -> Result<SavePlan> {
        let participant_id = match &self.participant {
            Some(p) => p.id,
            None => return Err(self.invalid("save")),
        };
        ensure_selection(&self.selection)?;

        let intervals = compress(self.selection.iter().copied());
        let request = AvailabilityIn {
            participant_id,
            intervals: encode_intervals(&intervals, self.display_zone),
        };
        let token = self.saves.issue();
        self.pending_save = Some(token);
        Ok(SavePlan {
            token,
            intervals,
            request,
        })
    }

    pub fn complete_save(&mut self, token: RequestToken, ack: &Ack) -> Outcome {
        if !self.saves.is_current(token) {
            debug!(?token, "discarding superseded save response");
            return Outcome::Superseded;
        }
        debug!(slots_added = ack.slots_added, "save acknowledged");
        self.pending_save = None;
        self.selection.clear();
        self.state = VisitState::Saved;
        Outcome::Applied
    }

    /// Release a save that failed in transport, keeping the selection.
    pub fn fail_save(&mut self, token: RequestToken) {
        if self.pending_save == Some(token) {
            self.pending_save = None;
        }
    }

    /// Layout in the current display zone, or `None` when the event has no
    /// time bounds.
    pub fn layout(&self) -> Result<Option<GridLayout>> {
        self.bounds
            .as_ref()
            .map(|bounds| GridLayout::build(bounds, self.display_zone, &self.membership))
            .transpose()
    }

    /// Join (or update the profile) and load the grid in one blocking pass.
    pub fn join<S: AvailabilityService>(
        &mut self,
        service: &mut S,
        username: &str,
        color: &str,
    ) -> Result<()> {
        let token = self.begin_join();
        let participant =
            service.upsert_participant(self.event_id, username, self.display_zone, color)?;
        self.complete_join(token, participant);
        self.reload(service)
    }

    /// Fetch the grid and rebuild membership.
    pub fn reload<S: AvailabilityService>(&mut self, service: &S) -> Result<()> {
        let token = self.begin_reload()?;
        let grid = service.fetch_grid(self.event_id, Zone::UTC)?;
        self.complete_reload(token, SlotMembership::from_grid(&grid));
        Ok(())
    }

    /// Submit the selection, then reload once the save is acknowledged.
    pub fn save<S: AvailabilityService>(&mut self, service: &mut S) -> Result<Ack> {
        let plan = self.prepare_save()?;
        let ack = match service.submit_availability(self.event_id, &plan.request) {
            Ok(ack) => ack,
            Err(e) => {
                self.fail_save(plan.token);
                return Err(e);
            }
        };
        self.complete_save(plan.token, &ack);
        self.reload(service)?;
        Ok(ack)
    }

    fn invalid(&self, action: &'static str) -> GridError {
        GridError::InvalidTransition {
            from: self.state.to_string(),
            action,
        }
    }
}
