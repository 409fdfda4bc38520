//! Compression of a slot selection into a minimal interval list, and the
//! civil-time encoding used to submit it.
//!
//! Sorts the selected slot starts, then sweeps once: a run is extended while
//! the next start is no later than the previous one plus a slot width, and is
//! closed at `previous + width` on any gap.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::{GridError, Result};
use crate::interval::Interval;
use crate::slot::slot_width;
use crate::wire::WireInterval;
use crate::zone::{self, WallTime, Zone};

/// Compress slot start instants into sorted, non-overlapping, non-adjacent
/// intervals.
///
/// Duplicates are ignored. An empty selection yields an empty list; callers
/// check for that with [`ensure_selection`] before submitting.
pub fn compress<I>(selection: I) -> Vec<Interval>
where
    I: IntoIterator<Item = DateTime<Utc>>,
{
    let mut instants: Vec<DateTime<Utc>> = selection.into_iter().collect();
    instants.sort_unstable();
    instants.dedup();

    let width = slot_width();
    let mut intervals = Vec::new();
    let mut iter = instants.into_iter();
    let Some(first) = iter.next() else {
        return intervals;
    };

    let mut run_start = first;
    let mut prev = first;
    for cur in iter {
        // `<=` also folds starts that are off the slot grid but still overlap
        // the running interval, keeping the output overlap-free.
        if cur <= prev + width {
            prev = cur;
            continue;
        }
        intervals.push(Interval::new(run_start, prev + width));
        run_start = cur;
        prev = cur;
    }
    intervals.push(Interval::new(run_start, prev + width));

    intervals
}

/// Fail with `GridError::EmptySelection` when nothing is selected.
pub fn ensure_selection(selection: &BTreeSet<DateTime<Utc>>) -> Result<()> {
    if selection.is_empty() {
        return Err(GridError::EmptySelection);
    }
    Ok(())
}

/// Render intervals as civil endpoints in `zone` for submission.
///
/// An endpoint that falls in a repeated (fall-back) hour cannot be recovered
/// from its civil reading alone; such an interval is encoded in UTC instead so
/// the round trip stays exact.
pub fn encode_intervals(intervals: &[Interval], zone: Zone) -> Vec<WireInterval> {
    intervals
        .iter()
        .map(|interval| {
            let start = zone::to_local(interval.start, zone);
            let end = zone::to_local(interval.end, zone);
            if round_trips(&start, interval.start) && round_trips(&end, interval.end) {
                WireInterval {
                    start_local: start.local,
                    end_local: end.local,
                    timezone: zone,
                }
            } else {
                debug!(
                    zone = %zone,
                    start = %interval.start,
                    end = %interval.end,
                    "civil endpoint is ambiguous, encoding interval in UTC"
                );
                WireInterval {
                    start_local: interval.start.naive_utc(),
                    end_local: interval.end.naive_utc(),
                    timezone: Zone::UTC,
                }
            }
        })
        .collect()
}

/// Resolve submitted intervals back to instants.
pub fn decode_intervals(wire: &[WireInterval]) -> Result<Vec<Interval>> {
    wire.iter().map(WireInterval::resolve).collect()
}

fn round_trips(wall: &WallTime, instant: DateTime<Utc>) -> bool {
    zone::is_unambiguous(wall) && zone::to_instant(wall).ok() == Some(instant)
}
