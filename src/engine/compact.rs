use chrono::{Duration, NaiveDate, NaiveDateTime};
use ulid::Ulid;

use crate::model::BookingState;

use super::{Scheduler, SchedulerError};

impl Scheduler {
    /// Re-sequence one suite's primaries on `date` into a contiguous,
    /// gap-free timeline: the first keeps its stored start, each next one
    /// starts where the previous occupancy (overtime included) ends.
    ///
    /// Destructive to previously chosen start times, so it runs only after
    /// an explicit duration/overtime/reassignment edit, never on a read.
    /// Every booking it touches has its cleanup relocated to the new end.
    /// Caller must hold the suite lock.
    pub(super) async fn compact_day(
        &self,
        suite_id: Ulid,
        date: NaiveDate,
    ) -> Result<(), SchedulerError> {
        let mut day = self
            .store
            .find_bookings(Some(suite_id), Some(date), None)
            .await?;
        day.retain(|b| !b.is_cleanup && b.state != BookingState::Cancelled);
        day.sort_by_key(|b| b.start_time);

        let mut cursor: Option<NaiveDateTime> = None;
        for mut b in day {
            let slot_start = cursor.unwrap_or_else(|| b.start_instant());
            if b.start_instant() != slot_start {
                b.date = slot_start.date();
                b.start_time = slot_start.time();
                self.store.save(b.clone()).await?;
            }
            cursor = Some(slot_start + Duration::minutes(b.base_duration_min + b.overtime_min));
            self.relocate_cleanup(&b).await;
        }
        Ok(())
    }
}
