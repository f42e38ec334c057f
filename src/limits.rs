//! Hard bounds enforced before any mutation is accepted.

/// Fixed duration of the auto-generated cleanup booking, in minutes.
pub const CLEANUP_DURATION_MIN: i64 = 30;

/// Longest base duration a single booking may have (one full day).
pub const MAX_DURATION_MIN: i64 = 24 * 60;

/// Largest overtime a booking may accumulate.
pub const MAX_OVERTIME_MIN: i64 = 12 * 60;

/// Most primary bookings one suite can carry on one date.
pub const MAX_BOOKINGS_PER_SUITE_DAY: usize = 64;

/// Longest accepted suite / procedure-type name.
pub const MAX_NAME_LEN: usize = 128;
