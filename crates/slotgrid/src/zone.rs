//! Instant ↔ civil time conversion in named IANA zones.
//!
//! This is the only module (with [`crate::dst`]) that knows about `chrono-tz`.
//! Everything else in the crate works with [`Zone`], [`WallTime`] and
//! `DateTime<Utc>`, so the timezone database binding can be swapped here
//! without touching layout, compression or expansion.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dst::{AmbiguousPolicy, DstPolicy, NonexistentPolicy};
use crate::error::{GridError, Result};

/// Civil date-time format used on the wire (`2026-03-08T02:30:00`).
pub const CIVIL_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// A named civil timezone with its offset and DST rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Zone(Tz);

impl Zone {
    pub const UTC: Zone = Zone(Tz::UTC);

    /// IANA name, e.g. `America/Los_Angeles`.
    pub fn name(&self) -> &'static str {
        self.0.name()
    }

    /// UTC offset in effect at `instant`.
    pub fn offset_at(&self, instant: DateTime<Utc>) -> FixedOffset {
        self.0.offset_from_utc_datetime(&instant.naive_utc()).fix()
    }
}

impl Default for Zone {
    fn default() -> Self {
        Zone::UTC
    }
}

impl FromStr for Zone {
    type Err = GridError;

    fn from_str(s: &str) -> Result<Self> {
        parse_zone(s)
    }
}

impl TryFrom<String> for Zone {
    type Error = GridError;

    fn try_from(value: String) -> Result<Self> {
        parse_zone(&value)
    }
}

impl From<Zone> for String {
    fn from(zone: Zone) -> Self {
        zone.name().to_string()
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A civil date-time paired with the zone that gives it meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WallTime {
    pub zone: Zone,
    pub local: NaiveDateTime,
}

impl WallTime {
    pub fn new(zone: Zone, local: NaiveDateTime) -> Self {
        Self { zone, local }
    }

    pub fn from_parts(zone: Zone, date: NaiveDate, time: NaiveTime) -> Self {
        Self::new(zone, date.and_time(time))
    }

    pub fn date(&self) -> NaiveDate {
        self.local.date()
    }

    pub fn time(&self) -> NaiveTime {
        self.local.time()
    }
}

impl fmt::Display for WallTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.local.format(CIVIL_FORMAT), self.zone)
    }
}

/// Parse an IANA zone identifier. There is no fallback zone: an unknown name
/// is always an error.
pub fn parse_zone(name: &str) -> Result<Zone> {
    name.trim()
        .parse::<Tz>()
        .map(Zone)
        .map_err(|_| GridError::InvalidZone(name.to_string()))
}

/// The civil time of `instant` in `zone`.
pub fn to_local(instant: DateTime<Utc>, zone: Zone) -> WallTime {
    WallTime::new(zone, instant.with_timezone(&zone.0).naive_local())
}

/// `instant` carrying the offset `zone` has at that moment.
pub fn to_offset_datetime(instant: DateTime<Utc>, zone: Zone) -> DateTime<FixedOffset> {
    instant.with_timezone(&zone.offset_at(instant))
}

/// The instant named by `wall`, resolving DST edge cases with the default
/// (compatible) [`DstPolicy`].
pub fn to_instant(wall: &WallTime) -> Result<DateTime<Utc>> {
    to_instant_with(wall, DstPolicy::default())
}

/// The instant named by `wall`, resolving DST edge cases with `policy`.
///
/// # Errors
/// Returns `GridError::AmbiguousLocalTime` or `GridError::NonexistentLocalTime`
/// only when the matching half of `policy` is `Reject`.
pub fn to_instant_with(wall: &WallTime, policy: DstPolicy) -> Result<DateTime<Utc>> {
    let tz = wall.zone.0;
    match tz.from_local_datetime(&wall.local) {
        chrono::LocalResult::Single(dt) => Ok(dt.with_timezone(&Utc)),
        chrono::LocalResult::Ambiguous(earliest, latest) => {
            debug!(local = %wall.local, zone = %wall.zone, ?policy, "ambiguous wall time");
            match policy.ambiguous {
                AmbiguousPolicy::Earliest => Ok(earliest.with_timezone(&Utc)),
                AmbiguousPolicy::Latest => Ok(latest.with_timezone(&Utc)),
                AmbiguousPolicy::Reject => Err(GridError::AmbiguousLocalTime {
                    local: wall.local.format(CIVIL_FORMAT).to_string(),
                    zone: wall.zone.to_string(),
                }),
            }
        }
        chrono::LocalResult::None => {
            debug!(local = %wall.local, zone = %wall.zone, ?policy, "nonexistent wall time");
            // Zones change offset at most once within a day, so the offsets a
            // day either side of the gap are the ones bracketing it.
            let offset = match policy.nonexistent {
                NonexistentPolicy::ShiftForward => {
                    tz.offset_from_utc_datetime(&(wall.local - Duration::days(1))).fix()
                }
                NonexistentPolicy::ShiftBackward => {
                    tz.offset_from_utc_datetime(&(wall.local + Duration::days(1))).fix()
                }
                NonexistentPolicy::Reject => {
                    return Err(GridError::NonexistentLocalTime {
                        local: wall.local.format(CIVIL_FORMAT).to_string(),
                        zone: wall.zone.to_string(),
                    })
                }
            };
            let naive_utc = wall.local - Duration::seconds(i64::from(offset.local_minus_utc()));
            Ok(Utc.from_utc_datetime(&naive_utc))
        }
    }
}

/// Whether `wall` names exactly one instant (no DST gap or overlap).
pub fn is_unambiguous(wall: &WallTime) -> bool {
    matches!(
        wall.zone.0.from_local_datetime(&wall.local),
        chrono::LocalResult::Single(_)
    )
}

/// Parse a civil (naive) date-time string.
///
/// Accepts `YYYY-MM-DDTHH:MM[:SS[.fff]]`, with `T` or a space as separator. A
/// trailing offset or `Z` is dropped and the remaining wall-clock reading is
/// kept, so a client that accidentally sends `...Z` is not double-converted.
pub fn parse_civil(input: &str) -> Result<NaiveDateTime> {
    let s = input.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.naive_local());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M"] {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(ndt);
        }
    }
    Err(GridError::InvalidDateTime {
        input: input.to_string(),
        reason: "expected YYYY-MM-DDTHH:MM:SS".to_string(),
    })
}

/// Format a civil date-time the way it travels on the wire.
pub fn format_civil(local: NaiveDateTime) -> String {
    local.format(CIVIL_FORMAT).to_string()
}

/// Parse an absolute instant.
///
/// Accepts RFC 3339 (`2026-02-17T14:00:00Z`, `...+02:00`). A string with no
/// offset is read as UTC.
pub fn parse_instant(input: &str) -> Result<DateTime<Utc>> {
    let s = input.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    parse_civil(s)
        .map(|ndt| ndt.and_utc())
        .map_err(|_| GridError::InvalidDateTime {
            input: input.to_string(),
            reason: "expected an RFC 3339 timestamp".to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn la() -> Zone {
        parse_zone("America/Los_Angeles").unwrap()
    }

    fn civil(s: &str) -> NaiveDateTime {
        parse_civil(s).unwrap()
    }

    #[test]
    fn unknown_zone_is_rejected() {
        assert_eq!(
            parse_zone("Mars/Olympus_Mons"),
            Err(GridError::InvalidZone("Mars/Olympus_Mons".to_string()))
        );
    }

    #[test]
    fn zone_serializes_as_name() {
        let json = serde_json::to_string(&la()).unwrap();
        assert_eq!(json, "\"America/Los_Angeles\"");
        let back: Zone = serde_json::from_str(&json).unwrap();
        assert_eq!(back, la());
        assert!(serde_json::from_str::<Zone>("\"Nowhere/Land\"").is_err());
    }

    #[test]
    fn spring_forward_gap_shifts_forward_by_default() {
        // 2026-03-08 02:30 does not exist in Los Angeles.
        let wall = WallTime::new(la(), civil("2026-03-08T02:30:00"));
        let instant = to_instant(&wall).unwrap();
        assert_eq!(instant, parse_instant("2026-03-08T10:30:00Z").unwrap());
        assert_eq!(to_local(instant, la()).local, civil("2026-03-08T03:30:00"));
    }

    #[test]
    fn spring_forward_gap_shift_backward_and_reject() {
        let wall = WallTime::new(la(), civil("2026-03-08T02:30:00"));
        let policy = DstPolicy {
            nonexistent: NonexistentPolicy::ShiftBackward,
            ..DstPolicy::default()
        };
        let instant = to_instant_with(&wall, policy).unwrap();
        assert_eq!(to_local(instant, la()).local, civil("2026-03-08T01:30:00"));

        assert!(matches!(
            to_instant_with(&wall, DstPolicy::STRICT),
            Err(GridError::NonexistentLocalTime { .. })
        ));
    }

    #[test]
    fn fall_back_overlap_resolves_to_earliest_by_default() {
        // 2026-11-01 01:30 happens twice in Los Angeles (PDT then PST).
        let wall = WallTime::new(la(), civil("2026-11-01T01:30:00"));
        assert!(!is_unambiguous(&wall));
        assert_eq!(
            to_instant(&wall).unwrap(),
            parse_instant("2026-11-01T08:30:00Z").unwrap()
        );
        let latest = DstPolicy {
            ambiguous: AmbiguousPolicy::Latest,
            ..DstPolicy::default()
        };
        assert_eq!(
            to_instant_with(&wall, latest).unwrap(),
            parse_instant("2026-11-01T09:30:00Z").unwrap()
        );
        assert!(matches!(
            to_instant_with(&wall, DstPolicy::STRICT),
            Err(GridError::AmbiguousLocalTime { .. })
        ));
    }

    #[test]
    fn civil_parsing_drops_offsets() {
        assert_eq!(civil("2026-02-17T14:00:00Z"), civil("2026-02-17T14:00:00"));
        assert_eq!(civil("2026-02-17T14:00"), civil("2026-02-17 14:00:00"));
        assert!(parse_civil("yesterday").is_err());
    }
}
