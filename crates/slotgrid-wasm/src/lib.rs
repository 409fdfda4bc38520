//! WASM bindings for slotgrid.
//!
//! Exposes zone conversion, grid layout, selection compression and interval
//! expansion to a browser grid via `wasm-bindgen`. Complex types cross the
//! boundary as JSON strings; instants are RFC 3339 strings in UTC.
//!
//! ## Build process
//!
//! ```sh
//! cargo build -p slotgrid-wasm --target wasm32-unknown-unknown --release
//! wasm-bindgen --target web --out-dir web/wasm/ \
//!   target/wasm32-unknown-unknown/release/slotgrid_wasm.wasm
//! ```

use std::fmt::Display;

use chrono::{DateTime, NaiveDate, NaiveTime, SecondsFormat, Utc};
use serde::Serialize;
use slotgrid::grid::{self, CellKey, EventBounds};
use slotgrid::interval::Interval;
use slotgrid::wire::{GridOut, WireInterval};
use slotgrid::zone::{self, WallTime, Zone};
use slotgrid::{DstPolicy, ParticipantIntervals, SlotMembership};
use wasm_bindgen::prelude::*;

type Result<T> = std::result::Result<T, String>;

// ---------------------------------------------------------------------------
// Serde-friendly DTOs for crossing the WASM boundary as JSON
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct IntervalDto {
    start: String,
    end: String,
}

impl From<&Interval> for IntervalDto {
    fn from(iv: &Interval) -> Self {
        Self {
            start: rfc3339(iv.start),
            end: rfc3339(iv.end),
        }
    }
}

#[derive(Serialize)]
struct WallTimeDto {
    local: String,
    offset: String,
    day: String,
    row: String,
}

#[derive(Serialize)]
struct CellDto {
    day: String,
    time: String,
    participants: Vec<ParticipantDto>,
}

#[derive(Serialize)]
struct ParticipantDto {
    username: String,
    color: String,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn rfc3339(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn err(e: impl Display) -> String {
    e.to_string()
}

fn to_js(e: String) -> JsValue {
    JsValue::from_str(&e)
}

fn to_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| format!("Serialization error: {}", e))
}

fn parse_zone(tz: &str) -> Result<Zone> {
    zone::parse_zone(tz).map_err(err)
}

fn parse_instant(s: &str) -> Result<DateTime<Utc>> {
    zone::parse_instant(s).map_err(err)
}

fn parse_day(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| format!("Invalid date '{}': {}", s, e))
}

fn parse_row(s: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(s, "%H:%M").map_err(|e| format!("Invalid row time '{}': {}", s, e))
}

fn cells_json(membership: &SlotMembership, tz: Zone) -> Result<String> {
    let cells: Vec<CellDto> = grid::build_grid(membership, tz)
        .into_iter()
        .map(|(CellKey { day, time }, participants)| CellDto {
            day: day.to_string(),
            time: grid::row_label(time),
            participants: participants
                .into_iter()
                .map(|p| ParticipantDto {
                    username: p.username,
                    color: p.color,
                })
                .collect(),
        })
        .collect();
    to_json(&cells)
}

// ---------------------------------------------------------------------------
// Implementations (plain Rust errors, so they run off-wasm in tests)
// ---------------------------------------------------------------------------

fn to_local_impl(instant: &str, tz: &str) -> Result<String> {
    let tz = parse_zone(tz)?;
    let instant = parse_instant(instant)?;
    let wall = zone::to_local(instant, tz);
    let cell = grid::instant_to_cell(instant, tz);
    to_json(&WallTimeDto {
        local: zone::format_civil(wall.local),
        offset: tz.offset_at(instant).to_string(),
        day: cell.day.to_string(),
        row: grid::row_label(cell.time),
    })
}

fn to_instant_impl(local: &str, tz: &str, strict: bool) -> Result<String> {
    let wall = WallTime::new(parse_zone(tz)?, zone::parse_civil(local).map_err(err)?);
    let policy = if strict {
        DstPolicy::STRICT
    } else {
        DstPolicy::COMPATIBLE
    };
    zone::to_instant_with(&wall, policy).map(rfc3339).map_err(err)
}

fn day_columns_impl(start: &str, end: &str, tz: &str) -> Result<String> {
    let bounds = EventBounds::new(parse_instant(start)?, parse_instant(end)?).map_err(err)?;
    let columns = grid::build_day_columns(&bounds, parse_zone(tz)?).map_err(err)?;
    to_json(&columns)
}

fn rows_impl() -> Result<String> {
    let labels: Vec<String> = grid::build_full_day_rows()
        .into_iter()
        .map(grid::row_label)
        .collect();
    to_json(&labels)
}

fn compress_impl(selection_json: &str, tz: &str) -> Result<String> {
    let raw: Vec<String> = serde_json::from_str(selection_json)
        .map_err(|e| format!("Invalid selection JSON: {}", e))?;
    let selection = raw
        .iter()
        .map(|s| parse_instant(s))
        .collect::<Result<Vec<_>>>()?;
    let intervals = slotgrid::compress(selection);
    to_json(&slotgrid::encode_intervals(&intervals, parse_zone(tz)?))
}

fn decode_impl(wire_json: &str) -> Result<String> {
    let wire: Vec<WireInterval> =
        serde_json::from_str(wire_json).map_err(|e| format!("Invalid intervals JSON: {}", e))?;
    let intervals = slotgrid::decode_intervals(&wire).map_err(err)?;
    let dtos: Vec<IntervalDto> = intervals.iter().map(IntervalDto::from).collect();
    to_json(&dtos)
}

fn expand_impl(entries_json: &str, tz: &str) -> Result<String> {
    let entries: Vec<ParticipantIntervals> = serde_json::from_str(entries_json)
        .map_err(|e| format!("Invalid availability JSON: {}", e))?;
    let membership = slotgrid::expand(&entries).map_err(err)?;
    cells_json(&membership, parse_zone(tz)?)
}

fn grid_cells_impl(grid_json: &str, tz: &str) -> Result<String> {
    let grid: GridOut =
        serde_json::from_str(grid_json).map_err(|e| format!("Invalid grid JSON: {}", e))?;
    cells_json(&SlotMembership::from_grid(&grid), parse_zone(tz)?)
}

fn cell_to_instant_impl(day: &str, time: &str, tz: &str) -> Result<String> {
    grid::cell_to_instant(parse_day(day)?, parse_row(time)?, parse_zone(tz)?)
        .map(rfc3339)
        .map_err(err)
}

// ---------------------------------------------------------------------------
// WASM exports
// ---------------------------------------------------------------------------

/// Wall time of an instant in `timezone`.
///
/// Returns `{local, offset, day, row}`: the civil reading, the UTC offset in
/// effect, and the grid cell (`YYYY-MM-DD`, `HH:MM`) the instant falls in.
#[wasm_bindgen(js_name = "toLocal")]
pub fn to_local(instant: &str, timezone: &str) -> std::result::Result<String, JsValue> {
    to_local_impl(instant, timezone).map_err(to_js)
}

/// Instant named by a civil date-time in `timezone`.
///
/// Skipped wall times shift forward and repeated ones take the earlier
/// instant, unless `strict` is set, in which case both are errors.
#[wasm_bindgen(js_name = "toInstant")]
pub fn to_instant(local: &str, timezone: &str, strict: bool) -> std::result::Result<String, JsValue> {
    to_instant_impl(local, timezone, strict).map_err(to_js)
}

/// Day columns for an event as seen from `timezone`.
#[wasm_bindgen(js_name = "buildDayColumns")]
pub fn build_day_columns(start: &str, end: &str, timezone: &str) -> std::result::Result<String, JsValue> {
    day_columns_impl(start, end, timezone).map_err(to_js)
}

/// The 48 row labels of a grid day (`"00:00"` … `"23:30"`).
#[wasm_bindgen(js_name = "buildFullDayRows")]
pub fn build_full_day_rows() -> std::result::Result<String, JsValue> {
    rows_impl().map_err(to_js)
}

/// Compress a JSON array of selected slot starts into the intervals to submit,
/// encoded as civil times in `timezone`.
#[wasm_bindgen(js_name = "compressSelection")]
pub fn compress_selection(selection_json: &str, timezone: &str) -> std::result::Result<String, JsValue> {
    compress_impl(selection_json, timezone).map_err(to_js)
}

/// Resolve submitted civil intervals back to UTC `{start, end}` pairs.
#[wasm_bindgen(js_name = "decodeIntervals")]
pub fn decode_intervals(wire_json: &str) -> std::result::Result<String, JsValue> {
    decode_impl(wire_json).map_err(to_js)
}

/// Expand stored intervals per participant and lay them out in `timezone`.
///
/// Returns an array of `{day, time, participants}` for every occupied cell.
#[wasm_bindgen(js_name = "expandAvailability")]
pub fn expand_availability(entries_json: &str, timezone: &str) -> std::result::Result<String, JsValue> {
    expand_impl(entries_json, timezone).map_err(to_js)
}

/// Lay out a grid response (fetched in any zone) in `timezone`.
#[wasm_bindgen(js_name = "gridCells")]
pub fn grid_cells(grid_json: &str, timezone: &str) -> std::result::Result<String, JsValue> {
    grid_cells_impl(grid_json, timezone).map_err(to_js)
}

/// UTC start of the slot shown at `day` / `time` in `timezone`.
#[wasm_bindgen(js_name = "cellToInstant")]
pub fn cell_to_instant(day: &str, time: &str, timezone: &str) -> std::result::Result<String, JsValue> {
    cell_to_instant_impl(day, time, timezone).map_err(to_js)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn parse(s: &str) -> Value {
        serde_json::from_str(s).unwrap()
    }

    #[test]
    fn local_reading_with_cell() {
        let out = parse(&to_local_impl("2026-06-01T02:00:00Z", "America/New_York").unwrap());
        assert_eq!(out["local"], "2026-05-31T22:00:00");
        assert_eq!(out["offset"], "-04:00");
        assert_eq!(out["day"], "2026-05-31");
        assert_eq!(out["row"], "22:00");
    }

    #[test]
    fn strict_instant_rejects_repeated_hour() {
        assert_eq!(
            to_instant_impl("2026-11-01T01:30:00", "America/Los_Angeles", false).unwrap(),
            "2026-11-01T08:30:00Z"
        );
        let e = to_instant_impl("2026-11-01T01:30:00", "America/Los_Angeles", true).unwrap_err();
        assert!(e.contains("Ambiguous local time"));
    }

    #[test]
    fn compress_then_decode() {
        let wire = compress_impl(
            r#"["2026-03-16T09:30:00Z","2026-03-16T09:00:00Z","2026-03-16T11:00:00Z"]"#,
            "Asia/Kolkata",
        )
        .unwrap();
        assert!(wire.contains(r#""start_local":"2026-03-16T14:30:00""#));

        let decoded = parse(&decode_impl(&wire).unwrap());
        assert_eq!(
            decoded,
            serde_json::json!([
                {"start": "2026-03-16T09:00:00Z", "end": "2026-03-16T10:00:00Z"},
                {"start": "2026-03-16T11:00:00Z", "end": "2026-03-16T11:30:00Z"}
            ])
        );
    }

    #[test]
    fn expand_into_cells() {
        let entries = r##"[{"participant": {"username": "alice", "color": "#ff0000"},
            "intervals": [{"kind": "absolute", "start": "2026-03-16T08:00:00Z", "end": "2026-03-16T08:30:00Z"}]}]"##;
        let cells = parse(&expand_impl(entries, "Europe/Berlin").unwrap());
        assert_eq!(cells[0]["day"], "2026-03-16");
        assert_eq!(cells[0]["time"], "09:00");
        assert_eq!(cells[0]["participants"][0]["username"], "alice");
    }

    #[test]
    fn bad_inputs_report_errors() {
        assert!(day_columns_impl("2026-03-16T00:00:00Z", "2026-03-17T00:00:00Z", "Nowhere/City")
            .unwrap_err()
            .contains("Invalid timezone"));
        assert!(cell_to_instant_impl("2026-03-16", "9", "UTC").is_err());
        assert!(grid_cells_impl("{}", "UTC").unwrap_err().contains("Invalid grid JSON"));
    }

    #[test]
    fn rows_and_cells() {
        let rows = parse(&rows_impl().unwrap());
        assert_eq!(rows.as_array().unwrap().len(), 48);
        assert_eq!(
            cell_to_instant_impl("2026-03-16", "09:00", "Europe/Berlin").unwrap(),
            "2026-03-16T08:00:00Z"
        );
    }
}
