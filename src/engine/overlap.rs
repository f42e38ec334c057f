use ulid::Ulid;

use crate::limits::{MAX_DURATION_MIN, MAX_OVERTIME_MIN};
use crate::model::{Booking, BookingState, TimeWindow};

use super::SchedulerError;

pub(super) fn validate_durations(base: i64, overtime: i64) -> Result<(), SchedulerError> {
    if base <= 0 {
        return Err(SchedulerError::Validation("base duration must be positive"));
    }
    if overtime < 0 {
        return Err(SchedulerError::Validation("overtime must not be negative"));
    }
    if base > MAX_DURATION_MIN {
        return Err(SchedulerError::LimitExceeded("base duration too long"));
    }
    if overtime > MAX_OVERTIME_MIN {
        return Err(SchedulerError::LimitExceeded("overtime too long"));
    }
    Ok(())
}

/// First sibling whose occupancy overlaps `candidate`, if any.
///
/// Cancelled and finished bookings hold no slot. Cleanup bookings are not
/// checked against primaries — their windows are maintained by relocation,
/// not by admission control.
pub(super) fn find_conflict(
    candidate: &TimeWindow,
    exclude: Option<Ulid>,
    siblings: &[Booking],
) -> Option<Ulid> {
    siblings
        .iter()
        .find(|b| {
            !b.is_cleanup
                && !matches!(b.state, BookingState::Cancelled | BookingState::Finished)
                && exclude != Some(b.id)
                && b.window().overlaps(candidate)
        })
        .map(|b| b.id)
}
