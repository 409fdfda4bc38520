//! `slotgrid` CLI: zone conversion, grid layout, selection compression and
//! interval expansion from the command line. JSON goes in on stdin (or `-i`)
//! and comes out on stdout.
//!
//! ## Usage
//!
//! ```sh
//! # Instant → wall time in a zone
//! slotgrid convert --instant 2026-03-16T16:00:00Z --tz America/Los_Angeles
//!
//! # Wall time → instant (spring-forward gaps shift forward unless --strict)
//! slotgrid convert --local 2026-03-08T02:30 --tz America/Los_Angeles
//!
//! # Day columns for an event, as seen from New York
//! slotgrid columns --start 2024-06-01T00:00:00Z --end 2024-06-02T00:00:00Z --tz America/New_York
//!
//! # The 48 row labels
//! slotgrid rows
//!
//! # Selected slot starts → intervals, optionally encoded in a zone
//! echo '["2026-03-16T09:00:00Z","2026-03-16T09:30:00Z"]' | slotgrid compress --wire
//!
//! # Stored intervals per participant → slot membership (or grid cells with --cells)
//! slotgrid expand -i availability.json --cells --tz Asia/Tokyo
//!
//! # Cell ↔ instant
//! slotgrid cell --day 2026-03-16 --time 09:00 --tz Europe/Berlin
//! slotgrid cell --instant 2026-03-16T08:00:00Z --tz Europe/Berlin
//! ```
//!
//! The display zone defaults to `$SLOTGRID_TZ`, then UTC. Set `RUST_LOG`
//! (e.g. `RUST_LOG=debug`) to see DST decisions on stderr.

mod tracer;

use std::io::{self, Read};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::{json, Value};
use slotgrid::grid::{self, CellKey, EventBounds};
use slotgrid::zone::{self, WallTime, Zone};
use slotgrid::{DstPolicy, ParticipantIntervals};

#[derive(Parser)]
#[command(
    name = "slotgrid",
    version,
    about = "Timezone-aware availability grid tools"
)]
struct Cli {
    /// Display zone (IANA name)
    #[arg(long, global = true, env = "SLOTGRID_TZ", default_value = "UTC")]
    tz: Zone,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pretty: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert between an instant and a wall time in the display zone
    Convert {
        /// Absolute instant (RFC 3339)
        #[arg(long, conflicts_with = "local", required_unless_present = "local")]
        instant: Option<String>,
        /// Wall-clock reading (YYYY-MM-DDTHH:MM[:SS])
        #[arg(long)]
        local: Option<String>,
        /// Fail on repeated or skipped wall times instead of resolving them
        #[arg(long)]
        strict: bool,
    },
    /// List the day columns of an event
    Columns {
        /// Event start (RFC 3339)
        #[arg(long)]
        start: String,
        /// Event end (RFC 3339)
        #[arg(long)]
        end: String,
    },
    /// List the row labels of a day
    Rows,
    /// Compress a JSON array of selected slot starts into intervals
    Compress {
        /// Input file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
        /// Emit civil intervals in the display zone instead of UTC instants
        #[arg(long)]
        wire: bool,
    },
    /// Expand a JSON array of participants' stored intervals into slots
    Expand {
        /// Input file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
        /// Group by display cell instead of by slot instant
        #[arg(long)]
        cells: bool,
    },
    /// Map a grid cell to its slot, or an instant to its cell
    Cell {
        /// Local date of the column
        #[arg(long, requires = "time", conflicts_with = "instant")]
        day: Option<NaiveDate>,
        /// Row time (HH:MM)
        #[arg(long, requires = "day", value_parser = parse_row_time)]
        time: Option<NaiveTime>,
        /// Absolute instant (RFC 3339)
        #[arg(long)]
        instant: Option<String>,
    },
}

fn main() -> Result<()> {
    tracer::StderrTracer::register().context("Failed to install log subscriber")?;
    let cli = Cli::parse();
    let tz = cli.tz;

    let output = match cli.command {
        Commands::Convert {
            instant,
            local,
            strict,
        } => convert(tz, instant.as_deref(), local.as_deref(), strict)?,
        Commands::Columns { start, end } => {
            let bounds = EventBounds::new(parse_instant(&start)?, parse_instant(&end)?)?;
            to_value(grid::build_day_columns(&bounds, tz)?)?
        }
        Commands::Rows => {
            let labels: Vec<String> = grid::build_full_day_rows()
                .into_iter()
                .map(grid::row_label)
                .collect();
            to_value(labels)?
        }
        Commands::Compress { input, wire } => {
            let raw = read_input(input.as_deref())?;
            let selection: Vec<DateTime<Utc>> =
                serde_json::from_str(&raw).context("Expected a JSON array of RFC 3339 instants")?;
            let intervals = slotgrid::compress(selection);
            if wire {
                to_value(slotgrid::encode_intervals(&intervals, tz))?
            } else {
                to_value(intervals)?
            }
        }
        Commands::Expand { input, cells } => {
            let raw = read_input(input.as_deref())?;
            let entries: Vec<ParticipantIntervals> = serde_json::from_str(&raw)
                .context("Expected a JSON array of {participant, intervals} objects")?;
            let membership = slotgrid::expand(&entries)?;
            if cells {
                let cells: Vec<Value> = grid::build_grid(&membership, tz)
                    .into_iter()
                    .map(|(key, participants)| {
                        json!({
                            "day": key.day,
                            "time": grid::row_label(key.time),
                            "participants": participants,
                        })
                    })
                    .collect();
                Value::Array(cells)
            } else {
                let slots: Vec<Value> = membership
                    .iter()
                    .map(|(start, participants)| {
                        json!({
                            "slot_start": start,
                            "local": zone::format_civil(zone::to_local(start, tz).local),
                            "participants": participants,
                        })
                    })
                    .collect();
                Value::Array(slots)
            }
        }
        Commands::Cell { day, time, instant } => cell(tz, day, time, instant.as_deref())?,
    };

    let text = if cli.pretty {
        serde_json::to_string_pretty(&output)?
    } else {
        serde_json::to_string(&output)?
    };
    println!("{}", text);
    Ok(())
}

fn convert(tz: Zone, instant: Option<&str>, local: Option<&str>, strict: bool) -> Result<Value> {
    if let Some(raw) = instant {
        let instant = parse_instant(raw)?;
        let wall = zone::to_local(instant, tz);
        return Ok(json!({
            "instant": instant,
            "local": zone::format_civil(wall.local),
            "zone": tz,
            "offset": tz.offset_at(instant).to_string(),
        }));
    }
    let Some(raw) = local else {
        bail!("Either --instant or --local is required");
    };
    let wall = WallTime::new(tz, zone::parse_civil(raw)?);
    let policy = if strict {
        DstPolicy::STRICT
    } else {
        DstPolicy::COMPATIBLE
    };
    let instant = zone::to_instant_with(&wall, policy)
        .with_context(|| format!("Cannot resolve {}", wall))?;
    Ok(json!({
        "instant": instant,
        "local": zone::format_civil(wall.local),
        "zone": tz,
        "unambiguous": zone::is_unambiguous(&wall),
    }))
}

fn cell(
    tz: Zone,
    day: Option<NaiveDate>,
    time: Option<NaiveTime>,
    instant: Option<&str>,
) -> Result<Value> {
    match (day, time, instant) {
        (Some(day), Some(time), None) => {
            let interval = grid::cell_to_interval(day, time, tz)?;
            Ok(json!({
                "day": day,
                "time": grid::row_label(time),
                "start": interval.start,
                "end": interval.end,
            }))
        }
        (None, None, Some(raw)) => {
            let CellKey { day, time } = grid::instant_to_cell(parse_instant(raw)?, tz);
            Ok(json!({
                "day": day,
                "time": grid::row_label(time),
                "label": grid::day_label(day),
            }))
        }
        _ => bail!("Pass either --day with --time, or --instant"),
    }
}

fn parse_row_time(s: &str) -> std::result::Result<NaiveTime, String> {
    NaiveTime::parse_from_str(s, "%H:%M").map_err(|e| format!("expected HH:MM: {}", e))
}

fn parse_instant(raw: &str) -> Result<DateTime<Utc>> {
    zone::parse_instant(raw).with_context(|| format!("Invalid instant: {}", raw))
}

fn to_value<T: Serialize>(value: T) -> Result<Value> {
    serde_json::to_value(value).context("Failed to serialize output")
}

fn read_input(path: Option<&str>) -> Result<String> {
    match path {
        Some(path) => {
            std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {}", path))
        }
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read from stdin")?;
            Ok(buf)
        }
    }
}
