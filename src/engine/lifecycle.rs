use chrono::NaiveDateTime;

use crate::model::{Booking, BookingState};

type Guard = fn(&Booking, NaiveDateTime) -> bool;

/// One legal time-driven transition.
struct Transition {
    from: BookingState,
    cleanup: bool,
    to: BookingState,
    fires: Guard,
}

fn past_start(b: &Booking, now: NaiveDateTime) -> bool {
    now >= b.start_instant()
}

fn inside_overtime(b: &Booking, now: NaiveDateTime) -> bool {
    b.overtime_min > 0 && now >= b.end_instant_base() && now < b.end_instant_full()
}

fn past_full_end(b: &Booking, now: NaiveDateTime) -> bool {
    now >= b.end_instant_full()
}

/// The whole lifecycle as one table, keyed by `(from, is_cleanup)`.
/// Every guard is a threshold on elapsed time, so transitions can only
/// fire "later", never un-fire. `Cancelled` is not here — it is reachable
/// only through an explicit command.
const TRANSITIONS: &[Transition] = &[
    Transition {
        from: BookingState::Scheduled,
        cleanup: false,
        to: BookingState::InProgress,
        fires: past_start,
    },
    Transition {
        from: BookingState::InProgress,
        cleanup: false,
        to: BookingState::Complicated,
        fires: inside_overtime,
    },
    Transition {
        from: BookingState::InProgress,
        cleanup: false,
        to: BookingState::Finished,
        fires: past_full_end,
    },
    Transition {
        from: BookingState::Complicated,
        cleanup: false,
        to: BookingState::Finished,
        fires: past_full_end,
    },
    Transition {
        from: BookingState::Scheduled,
        cleanup: true,
        to: BookingState::InCleanup,
        fires: past_start,
    },
    Transition {
        from: BookingState::InCleanup,
        cleanup: true,
        to: BookingState::Finished,
        fires: past_full_end,
    },
];

/// Advance `booking`'s state as far as `now` allows.
///
/// Runs the table to a fixpoint, so a single call at a late enough `now`
/// walks a booking through every intermediate state to `Finished`. Pure:
/// the stored record is untouched, the caller persists the result.
pub fn advance(booking: &Booking, now: NaiveDateTime) -> BookingState {
    let mut state = booking.state;
    loop {
        let fired = TRANSITIONS.iter().find(|t| {
            t.from == state && t.cleanup == booking.is_cleanup && (t.fires)(booking, now)
        });
        match fired {
            Some(t) => state = t.to,
            None => return state,
        }
    }
}
