//! # slotgrid
//!
//! Timezone-aware availability grid for finding a time that works across
//! participants in different zones.
//!
//! Slots are fixed 30-minute buckets on the UTC instant axis. Participants
//! select slots on a grid rendered in their own display zone; the selection is
//! compressed into intervals for storage, and stored intervals are expanded
//! back into per-slot membership that can be laid out in any zone without
//! refetching.
//!
//! ## Modules
//!
//! - [`slot`] — slot width and epoch-aligned slot arithmetic
//! - [`zone`] — instant ↔ wall time conversion in IANA zones
//! - [`dst`] — resolution policies for repeated and skipped wall times
//! - [`grid`] — day columns, full-day rows, active windows, cell ↔ instant
//! - [`compress`] — slot selection → minimal interval list, civil encoding
//! - [`expand`] — stored intervals → per-slot participant membership
//! - [`interval`] — absolute intervals and the stored (absolute | civil) form
//! - [`wire`] — shapes exchanged with the availability service
//! - [`service`] — the service contract and an in-memory implementation
//! - [`session`] — a participant's visit as an explicit state machine
//! - [`error`] — Error types

pub mod compress;
pub mod dst;
pub mod error;
pub mod expand;
pub mod grid;
pub mod interval;
pub mod service;
pub mod session;
pub mod slot;
pub mod wire;
pub mod zone;

pub use compress::{compress, decode_intervals, encode_intervals, ensure_selection};
pub use dst::{AmbiguousPolicy, DstPolicy, NonexistentPolicy};
pub use error::GridError;
pub use expand::{expand, slot_set, Participant, ParticipantIntervals, SlotMembership};
pub use grid::{
    build_day_columns, build_full_day_rows, build_grid, cell_to_instant, cell_to_interval,
    cell_to_slot, compute_daily_range, instant_to_cell, CellKey, DailyRange, DayColumn,
    EventBounds, GridLayout,
};
pub use interval::{Interval, StoredInterval};
pub use service::{AvailabilityService, MemoryService};
pub use session::{Outcome, RequestSeq, RequestToken, Visit, VisitState};
pub use slot::{Slot, SLOT_MINUTES};
pub use wire::WireInterval;
pub use zone::{parse_zone, to_instant, to_local, WallTime, Zone};
