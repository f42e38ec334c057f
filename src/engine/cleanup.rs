use tracing::warn;
use ulid::Ulid;

use crate::limits::CLEANUP_DURATION_MIN;
use crate::model::{Booking, BookingState};

use super::Scheduler;

/// Build the trailing cleanup for a freshly created primary: same suite,
/// starting the instant the primary's occupancy ends.
pub(super) fn derive_cleanup(primary: &Booking) -> Booking {
    let start = primary.end_instant_full();
    Booking {
        id: Ulid::new(),
        suite_id: primary.suite_id,
        date: start.date(),
        start_time: start.time(),
        base_duration_min: CLEANUP_DURATION_MIN,
        overtime_min: 0,
        state: BookingState::Scheduled,
        is_cleanup: true,
        parent_id: Some(primary.id),
        patient_id: None,
        surgeon_id: None,
        procedure_type_id: None,
    }
}

impl Scheduler {
    /// Move a primary's cleanup so it trails the primary's current end,
    /// keeping its identity and whatever state it has reached.
    ///
    /// A missing or unsaveable cleanup degrades to a logged warning — the
    /// primary mutation has already been accepted and must not be rolled
    /// back over its side effect.
    pub(super) async fn relocate_cleanup(&self, primary: &Booking) {
        debug_assert!(!primary.is_cleanup);
        let cleanup = match self.store.find_child(primary.id).await {
            Ok(Some(c)) => c,
            Ok(None) => {
                relink_miss(primary.id, "no linked cleanup");
                return;
            }
            Err(e) => {
                relink_miss(primary.id, &e.to_string());
                return;
            }
        };
        if cleanup.state.is_terminal() {
            return;
        }

        let target = primary.end_instant_full();
        if cleanup.suite_id == primary.suite_id && cleanup.start_instant() == target {
            return;
        }

        let mut moved = cleanup;
        moved.suite_id = primary.suite_id;
        moved.date = target.date();
        moved.start_time = target.time();
        if let Err(e) = self.store.save(moved).await {
            relink_miss(primary.id, &e.to_string());
        }
    }

    /// Cancel the linked cleanup if it has not started; a cleanup already
    /// under way (or finished) is left alone.
    pub(super) async fn cancel_linked_cleanup(&self, primary: &Booking) {
        match self.store.find_child(primary.id).await {
            Ok(Some(mut c)) if c.state == BookingState::Scheduled => {
                c.state = BookingState::Cancelled;
                if let Err(e) = self.store.save(c).await {
                    relink_miss(primary.id, &e.to_string());
                }
            }
            Ok(Some(_)) => {}
            Ok(None) => relink_miss(primary.id, "no linked cleanup"),
            Err(e) => relink_miss(primary.id, &e.to_string()),
        }
    }
}

fn relink_miss(primary_id: Ulid, reason: &str) {
    metrics::counter!(crate::observability::CLEANUP_RELINK_FAILURES_TOTAL).increment(1);
    warn!("cleanup for booking {primary_id} could not be updated: {reason}");
}
