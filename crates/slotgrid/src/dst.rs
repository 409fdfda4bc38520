//! DST resolution policies for wall times that do not map to exactly one instant.
//!
//! chrono-tz reports these cases explicitly through `LocalResult` instead of
//! picking an answer, so every caller that turns a wall time into an instant
//! goes through a [`DstPolicy`]. The default is the "compatible" rule used by
//! most civil-time libraries: the earlier instant of a repeated hour, and the
//! pre-transition offset for a skipped hour (which pushes the wall time
//! forward by the length of the gap).

/// What to do with a wall time that occurs twice (DST fall-back).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AmbiguousPolicy {
    /// Use the first occurrence (the pre-transition offset).
    #[default]
    Earliest,
    /// Use the second occurrence (the post-transition offset).
    Latest,
    /// Fail with `GridError::AmbiguousLocalTime`.
    Reject,
}

/// What to do with a wall time skipped by a DST spring-forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NonexistentPolicy {
    /// Interpret with the offset in effect before the gap (02:30 → 03:30).
    #[default]
    ShiftForward,
    /// Interpret with the offset in effect after the gap (02:30 → 01:30).
    ShiftBackward,
    /// Fail with `GridError::NonexistentLocalTime`.
    Reject,
}

/// Combined policy applied by [`crate::zone::to_instant_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DstPolicy {
    pub ambiguous: AmbiguousPolicy,
    pub nonexistent: NonexistentPolicy,
}

impl DstPolicy {
    /// Reject both ambiguous and nonexistent wall times.
    pub const STRICT: DstPolicy = DstPolicy {
        ambiguous: AmbiguousPolicy::Reject,
        nonexistent: NonexistentPolicy::Reject,
    };

    /// Earliest for repeated hours, shift forward across gaps.
    pub const COMPATIBLE: DstPolicy = DstPolicy {
        ambiguous: AmbiguousPolicy::Earliest,
        nonexistent: NonexistentPolicy::ShiftForward,
    };
}
