//! Error types for slotgrid operations.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GridError {
    #[error("Invalid timezone: {0}")]
    InvalidZone(String),

    #[error("Invalid datetime '{input}': {reason}")]
    InvalidDateTime { input: String, reason: String },

    /// The wall time falls in a spring-forward gap and the DST policy rejects it.
    #[error("Nonexistent local time {local} in {zone}")]
    NonexistentLocalTime { local: String, zone: String },

    /// The wall time occurs twice (fall-back) and the DST policy rejects it.
    #[error("Ambiguous local time {local} in {zone}")]
    AmbiguousLocalTime { local: String, zone: String },

    #[error("Invalid event bounds: end {end} is not after start {start}")]
    InvalidBounds { start: String, end: String },

    /// Raised by caller-side precondition checks, never by compression itself.
    #[error("No slots selected")]
    EmptySelection,

    #[error("Cannot {action} while {from}")]
    InvalidTransition { from: String, action: &'static str },

    #[error("Service error: {0}")]
    Service(String),
}

pub type Result<T> = std::result::Result<T, GridError>;
