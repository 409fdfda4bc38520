//! Property-based tests for compression, expansion and zone conversion.
//!
//! These hold for any selection of slots in 2026 and any of the listed zones,
//! not just the fixed cases in the other test files.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use proptest::prelude::*;
use slotgrid::compress::{compress, decode_intervals, encode_intervals};
use slotgrid::dst::{AmbiguousPolicy, DstPolicy, NonexistentPolicy};
use slotgrid::expand::{expand, slot_set, Participant, ParticipantIntervals};
use slotgrid::grid::{cell_to_instant, cell_to_slot, instant_to_cell, CellKey};
use slotgrid::interval::StoredInterval;
use slotgrid::slot::{is_aligned, slot_width, SLOT_MINUTES};
use slotgrid::zone::{
    is_unambiguous, parse_zone, to_instant, to_instant_with, to_local, WallTime, Zone,
};

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

/// Slots in one (non-leap) year.
const YEAR_OF_SLOTS: i64 = 365 * 48;

fn base() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
}

fn slot_at(index: i64) -> DateTime<Utc> {
    base() + Duration::minutes(SLOT_MINUTES * index)
}

/// A selection of aligned slot starts. Indices are drawn from a small window
/// half the time so that adjacent runs are common.
fn arb_selection() -> impl Strategy<Value = Vec<DateTime<Utc>>> {
    prop_oneof![
        prop::collection::vec(0i64..YEAR_OF_SLOTS, 0..40),
        (0i64..YEAR_OF_SLOTS - 200)
            .prop_flat_map(|start| prop::collection::vec(start..start + 200, 0..60)),
    ]
    .prop_map(|indices| indices.into_iter().map(slot_at).collect())
}

fn arb_instant() -> impl Strategy<Value = DateTime<Utc>> {
    (0i64..YEAR_OF_SLOTS).prop_map(slot_at)
}

/// A grid cell: a day of 2026 and one of its 48 rows.
fn arb_cell() -> impl Strategy<Value = CellKey> {
    (0u64..365, 0u32..48).prop_map(|(day, row)| CellKey {
        day: NaiveDate::from_ymd_opt(2026, 1, 1)
            .unwrap()
            .checked_add_days(chrono::Days::new(day))
            .unwrap(),
        time: NaiveTime::from_hms_opt(row / 2, (row % 2) * 30, 0).unwrap(),
    })
}

/// Whether the cell's wall time exists, i.e. is not skipped by a gap.
fn exists(cell: CellKey, zone: Zone) -> bool {
    let policy = DstPolicy {
        ambiguous: AmbiguousPolicy::Earliest,
        nonexistent: NonexistentPolicy::Reject,
    };
    to_instant_with(&WallTime::from_parts(zone, cell.day, cell.time), policy).is_ok()
}

/// Zones whose offsets are whole or half hours all year.
fn arb_grid_zone() -> impl Strategy<Value = Zone> {
    prop_oneof![
        Just("UTC"),
        Just("America/New_York"),
        Just("America/Los_Angeles"),
        Just("America/St_Johns"),
        Just("Europe/Berlin"),
        Just("Asia/Kolkata"),
        Just("Asia/Tokyo"),
        Just("Australia/Adelaide"),
    ]
    .prop_map(|name| parse_zone(name).unwrap())
}

/// Any zone, including quarter-hour offsets.
fn arb_zone() -> impl Strategy<Value = Zone> {
    prop_oneof![
        arb_grid_zone(),
        Just(parse_zone("Asia/Kathmandu").unwrap()),
        Just(parse_zone("Pacific/Chatham").unwrap()),
    ]
}

fn config() -> ProptestConfig {
    ProptestConfig {
        cases: 256,
        ..ProptestConfig::default()
    }
}

// ---------------------------------------------------------------------------
// Compression
// ---------------------------------------------------------------------------
proptest! {
    #![proptest_config(config())]

    #[test]
    fn compression_covers_exactly_the_selection(selection in arb_selection()) {
        let expected: BTreeSet<_> = selection.iter().copied().collect();
        let intervals = compress(selection);
        prop_assert_eq!(slot_set(&intervals), expected);
    }

    #[test]
    fn compression_is_minimal(selection in arb_selection()) {
        let intervals = compress(selection);
        for pair in intervals.windows(2) {
            prop_assert!(
                pair[0].end < pair[1].start,
                "adjacent intervals not merged: {:?} {:?}", pair[0], pair[1]
            );
        }
        for iv in &intervals {
            prop_assert!(iv.start < iv.end);
            prop_assert_eq!(iv.duration_minutes() % SLOT_MINUTES, 0);
        }
    }

    #[test]
    fn compression_is_idempotent(selection in arb_selection()) {
        let once = compress(selection);
        let twice = compress(slot_set(&once));
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn expansion_recovers_the_selection(selection in arb_selection()) {
        let expected: BTreeSet<_> = selection.iter().copied().collect();
        let stored: Vec<StoredInterval> = compress(selection).into_iter().map(Into::into).collect();
        let membership = expand(&[ParticipantIntervals {
            participant: Participant::new("p", "#000000"),
            intervals: stored,
        }])
        .unwrap();
        prop_assert_eq!(membership.slots_of("p"), expected);
    }
}

// ---------------------------------------------------------------------------
// Zone conversion
// ---------------------------------------------------------------------------
proptest! {
    #![proptest_config(config())]

    #[test]
    fn unambiguous_wall_times_round_trip(instant in arb_instant(), zone in arb_zone()) {
        let wall = to_local(instant, zone);
        prop_assume!(is_unambiguous(&wall));
        prop_assert_eq!(to_instant(&wall).unwrap(), instant);
    }

    #[test]
    fn cells_round_trip_on_grid_zones(instant in arb_instant(), zone in arb_grid_zone()) {
        prop_assume!(is_unambiguous(&to_local(instant, zone)));
        let cell = instant_to_cell(instant, zone);
        prop_assert_eq!(cell_to_instant(cell.day, cell.time, zone).unwrap(), instant);
    }

    #[test]
    fn cells_map_back_to_themselves_in_any_zone(cell in arb_cell(), zone in arb_zone()) {
        prop_assume!(exists(cell, zone));
        let instant = cell_to_instant(cell.day, cell.time, zone).unwrap();
        prop_assert_eq!(instant_to_cell(instant, zone), cell);
    }

    #[test]
    fn cell_slot_is_aligned_and_shown_in_its_cell(cell in arb_cell(), zone in arb_zone()) {
        let wall = WallTime::from_parts(zone, cell.day, cell.time);
        prop_assume!(exists(cell, zone) && is_unambiguous(&wall));
        let instant = cell_to_instant(cell.day, cell.time, zone).unwrap();
        prop_assume!(zone.offset_at(instant) == zone.offset_at(instant + slot_width()));

        let slot = cell_to_slot(cell.day, cell.time, zone).unwrap();
        prop_assert!(is_aligned(slot), "{} is not on a slot boundary", slot);
        prop_assert_eq!(instant_to_cell(slot, zone), cell);
    }

    #[test]
    fn civil_encoding_is_lossless(selection in arb_selection(), zone in arb_zone()) {
        let intervals = compress(selection);
        let decoded = decode_intervals(&encode_intervals(&intervals, zone)).unwrap();
        prop_assert_eq!(decoded, intervals);
    }
}
