use chrono::{NaiveDate, NaiveDateTime};
use ulid::Ulid;

use crate::model::{BookingState, BookingView, DaySummary};

use super::{Scheduler, SchedulerError};

/// How many upcoming bookings the day summary lists.
const UPCOMING_LIMIT: usize = 5;

impl Scheduler {
    pub async fn booking(&self, id: Ulid) -> Result<BookingView, SchedulerError> {
        self.store
            .find_booking(id)
            .await?
            .map(|b| BookingView::from(&b))
            .ok_or(SchedulerError::NotFound(id))
    }

    /// Bookings matching the optional filters, ordered by date then start.
    pub async fn list_bookings(
        &self,
        suite_id: Option<Ulid>,
        date: Option<NaiveDate>,
    ) -> Result<Vec<BookingView>, SchedulerError> {
        let mut bookings = self.store.find_bookings(suite_id, date, None).await?;
        bookings.sort_by_key(|b| (b.date, b.start_time));
        Ok(bookings.iter().map(BookingView::from).collect())
    }

    /// Condensed board for one date: headline counts plus the next
    /// scheduled entries. `now` defaults to the injected clock.
    pub async fn day_summary(
        &self,
        date: NaiveDate,
        now: Option<NaiveDateTime>,
    ) -> Result<DaySummary, SchedulerError> {
        let now = now.unwrap_or_else(|| self.clock.now());
        let day = self.store.find_bookings(None, Some(date), None).await?;

        let total = day.iter().filter(|b| !b.is_cleanup).count();
        let in_execution = day
            .iter()
            .filter(|b| {
                !b.is_cleanup
                    && matches!(
                        b.state,
                        BookingState::InProgress | BookingState::Complicated
                    )
            })
            .count();
        let delayed = day
            .iter()
            .filter(|b| !b.is_cleanup && b.state == BookingState::Complicated)
            .count();
        let cleanups_active = day
            .iter()
            .filter(|b| b.is_cleanup && b.state == BookingState::InCleanup)
            .count();

        let mut upcoming: Vec<_> = day
            .iter()
            .filter(|b| {
                !b.is_cleanup
                    && b.state == BookingState::Scheduled
                    && b.start_instant() >= now
            })
            .collect();
        upcoming.sort_by_key(|b| b.start_time);
        let upcoming = upcoming
            .into_iter()
            .take(UPCOMING_LIMIT)
            .map(BookingView::from)
            .collect();

        Ok(DaySummary {
            date,
            total,
            in_execution,
            delayed,
            cleanups_active,
            upcoming,
        })
    }
}
