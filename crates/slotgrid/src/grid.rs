//! Grid layout for a display zone: day columns, full-day rows, active
//! windows, and the mapping between grid cells and instants.
//!
//! Layout is a pure function of already-fetched data and the display zone.
//! Switching zones re-runs these functions; it never requires a refetch.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{GridError, Result};
use crate::expand::{Participant, SlotMembership};
use crate::interval::Interval;
use crate::slot::{floor_to_slot, is_aligned, slot_width, SLOTS_PER_DAY, SLOT_MINUTES};
use crate::zone::{self, WallTime, Zone};

const MINUTES_PER_DAY: u32 = 24 * 60;

/// An event's configured range, `start < end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventBounds {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl EventBounds {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if end <= start {
            return Err(GridError::InvalidBounds {
                start: start.to_rfc3339(),
                end: end.to_rfc3339(),
            });
        }
        Ok(Self { start, end })
    }
}

/// Minutes-from-local-midnight window of a day that lies inside the event
/// bounds. `(0, 0)` marks a fully inactive day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DailyRange {
    pub start_min: u32,
    pub end_min: u32,
}

impl DailyRange {
    pub const INACTIVE: DailyRange = DailyRange {
        start_min: 0,
        end_min: 0,
    };

    pub fn is_active(&self) -> bool {
        self.end_min > self.start_min
    }

    /// Whether the row starting at `time` overlaps the window.
    pub fn covers_row(&self, time: NaiveTime) -> bool {
        let row_start = minutes_of(time);
        let row_end = row_start + SLOT_MINUTES as u32;
        self.is_active() && row_start < self.end_min && row_end > self.start_min
    }
}

/// One calendar day as rendered in the display zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayColumn {
    pub date_key: NaiveDate,
    pub label: String,
    pub active: DailyRange,
}

/// A grid cell address: local day plus row start time in the display zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CellKey {
    pub day: NaiveDate,
    pub time: NaiveTime,
}

impl fmt::Display for CellKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.day.format("%Y-%m-%d"), row_label(self.time))
    }
}

/// Build one column per local calendar day in `zone` that intersects the
/// closed range `[bounds.start, bounds.end]`, oldest first.
///
/// A day that touches the range only at an endpoint is still listed, with an
/// inactive window, so columns never disappear when the zone changes.
pub fn build_day_columns(bounds: &EventBounds, zone: Zone) -> Result<Vec<DayColumn>> {
    let first = zone::to_local(bounds.start, zone).date();
    let last = zone::to_local(bounds.end, zone).date();

    first
        .iter_days()
        .take_while(|day| *day <= last)
        .map(|day| {
            Ok(DayColumn {
                date_key: day,
                label: day_label(day),
                active: compute_daily_range(day, bounds, zone)?,
            })
        })
        .collect()
}

/// The 48 row start times of a full day, `00:00` through `23:30`.
///
/// Rows never depend on the event bounds; inactivity is carried by each
/// column's [`DailyRange`].
pub fn build_full_day_rows() -> Vec<NaiveTime> {
    (0..SLOTS_PER_DAY as u32)
        .map(|i| time_from_minutes(i * SLOT_MINUTES as u32))
        .collect()
}

/// `HH:MM` label of a row.
pub fn row_label(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

/// Column header, e.g. `Sat, Jun 1`.
pub fn day_label(day: NaiveDate) -> String {
    day.format("%a, %b %-d").to_string()
}

/// The part of `day` (in `zone`) that falls inside `bounds`.
///
/// The day runs from its local midnight to the next local midnight, so DST
/// days are 23 or 25 hours long. Minutes are wall-clock minutes clamped to
/// `[0, 1440]`; a window that reaches the end of the day reports `1440`.
///
/// The end is read with the offset in effect just before it, so a window
/// ending exactly at a fall-back transition keeps the repeated hour. When
/// the window contains a fall-back transition, the wall clock runs the
/// repeated hour twice and the window is widened to the hull of both
/// readings; it is never inverted.
pub fn compute_daily_range(day: NaiveDate, bounds: &EventBounds, zone: Zone) -> Result<DailyRange> {
    let next_day = day.succ_opt().ok_or_else(|| GridError::InvalidDateTime {
        input: day.to_string(),
        reason: "day has no successor".to_string(),
    })?;
    let day_start = local_midnight(day, zone)?;
    let day_end = local_midnight(next_day, zone)?;

    let start = day_start.max(bounds.start);
    let end = day_end.min(bounds.end);
    if end <= start {
        return Ok(DailyRange::INACTIVE);
    }

    let last = end - Duration::seconds(1);
    let start_offset = zone.offset_at(start);
    let end_offset = zone.offset_at(last);

    let mut start_min = minute_in_day(day, start.with_timezone(&start_offset).naive_local());
    let mut end_min = if end >= day_end {
        MINUTES_PER_DAY
    } else {
        minute_in_day(day, end.with_timezone(&end_offset).naive_local())
    };

    if end_offset.local_minus_utc() < start_offset.local_minus_utc() {
        let transition = offset_change(start, last, zone);
        let before = transition.with_timezone(&start_offset).naive_local();
        let after = transition.with_timezone(&end_offset).naive_local();
        debug!(%day, zone = %zone, %transition, "repeated hour inside daily window");
        start_min = start_min.min(minute_in_day(day, after));
        end_min = end_min.max(minute_in_day(day, before));
    }

    Ok(DailyRange { start_min, end_min })
}

/// The instant a grid cell starts at.
pub fn cell_to_instant(day: NaiveDate, time: NaiveTime, zone: Zone) -> Result<DateTime<Utc>> {
    zone::to_instant(&WallTime::from_parts(zone, day, time))
}

/// The slot start displayed in a cell.
///
/// In zones whose offset is not a whole number of half hours the cell's
/// wall time falls between slot boundaries; the boundary that still maps
/// back to the cell is returned, preferring the later one.
pub fn cell_to_slot(day: NaiveDate, time: NaiveTime, zone: Zone) -> Result<DateTime<Utc>> {
    let instant = cell_to_instant(day, time, zone)?;
    if is_aligned(instant) {
        return Ok(instant);
    }
    let target = instant_to_cell(instant, zone);
    let floor = floor_to_slot(instant);
    let ceil = floor + slot_width();
    if instant_to_cell(ceil, zone) == target {
        Ok(ceil)
    } else if instant_to_cell(floor, zone) == target {
        Ok(floor)
    } else {
        Ok(ceil)
    }
}

/// The slot-wide interval a grid cell stands for.
pub fn cell_to_interval(day: NaiveDate, time: NaiveTime, zone: Zone) -> Result<Interval> {
    let start = cell_to_instant(day, time, zone)?;
    Ok(Interval::new(start, start + slot_width()))
}

/// The cell `instant` is displayed in: its local day and the row containing
/// its local time of day.
pub fn instant_to_cell(instant: DateTime<Utc>, zone: Zone) -> CellKey {
    let local = zone::to_local(instant, zone);
    let minutes = minutes_of(local.time());
    CellKey {
        day: local.date(),
        time: time_from_minutes(minutes - minutes % SLOT_MINUTES as u32),
    }
}

/// Cell → participants, for every cell holding at least one membership slot.
///
/// Two slots can land in one cell during a fall-back hour; their participants
/// are merged by username.
pub fn build_grid(membership: &SlotMembership, zone: Zone) -> BTreeMap<CellKey, Vec<Participant>> {
    let mut cells: BTreeMap<CellKey, Vec<Participant>> = BTreeMap::new();
    for (slot_start, participants) in membership.iter() {
        let members = cells.entry(instant_to_cell(slot_start, zone)).or_default();
        for p in participants {
            if !members.iter().any(|m| m.username == p.username) {
                members.push(p.clone());
            }
        }
    }
    cells
}

/// Everything needed to render one grid: columns, rows and occupied cells.
#[derive(Debug, Clone, PartialEq)]
pub struct GridLayout {
    pub zone: Zone,
    pub columns: Vec<DayColumn>,
    pub rows: Vec<NaiveTime>,
    pub cells: BTreeMap<CellKey, Vec<Participant>>,
}

impl GridLayout {
    pub fn build(bounds: &EventBounds, zone: Zone, membership: &SlotMembership) -> Result<Self> {
        Ok(Self {
            zone,
            columns: build_day_columns(bounds, zone)?,
            rows: build_full_day_rows(),
            cells: build_grid(membership, zone),
        })
    }

    pub fn participants_at(&self, day: NaiveDate, time: NaiveTime) -> &[Participant] {
        self.cells
            .get(&CellKey { day, time })
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Whether the cell lies inside its column's active window.
    pub fn is_active(&self, day: NaiveDate, time: NaiveTime) -> bool {
        self.columns
            .iter()
            .find(|c| c.date_key == day)
            .is_some_and(|c| c.active.covers_row(time))
    }
}

fn local_midnight(day: NaiveDate, zone: Zone) -> Result<DateTime<Utc>> {
    zone::to_instant(&WallTime::from_parts(zone, day, NaiveTime::MIN))
}

/// Wall-clock minute of `local` within `day`, clamped to `[0, 1440]`.
fn minute_in_day(day: NaiveDate, local: NaiveDateTime) -> u32 {
    match local.date().cmp(&day) {
        Ordering::Less => 0,
        Ordering::Greater => MINUTES_PER_DAY,
        Ordering::Equal => minutes_of(local.time()),
    }
}

/// First instant in `(from, to]` whose offset differs from the one at `from`.
/// Callers guarantee the offsets at `from` and `to` differ.
fn offset_change(from: DateTime<Utc>, to: DateTime<Utc>, zone: Zone) -> DateTime<Utc> {
    let initial = zone.offset_at(from);
    let (mut lo, mut hi) = (from, to);
    while hi - lo > Duration::seconds(1) {
        let mid = lo + (hi - lo) / 2;
        if zone.offset_at(mid) == initial {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    hi
}

fn minutes_of(time: NaiveTime) -> u32 {
    time.hour() * 60 + time.minute()
}

fn time_from_minutes(minutes: u32) -> NaiveTime {
    NaiveTime::MIN + Duration::minutes(i64::from(minutes))
}
