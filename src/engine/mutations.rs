use chrono::{NaiveDate, NaiveTime};
use tracing::info;
use ulid::Ulid;

use crate::limits::MAX_BOOKINGS_PER_SUITE_DAY;
use crate::model::{Booking, BookingState};
use crate::observability::{BOOKINGS_CREATED_TOTAL, CONFLICTS_REJECTED_TOTAL};

use super::cleanup::derive_cleanup;
use super::overlap::{find_conflict, validate_durations};
use super::{Scheduler, SchedulerError};

/// A candidate primary booking. The id, state and cleanup linkage are
/// assigned by the engine.
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub suite_id: Ulid,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    /// Defaults from the procedure type when absent.
    pub base_duration_min: Option<i64>,
    pub overtime_min: i64,
    pub patient_id: Option<Ulid>,
    pub surgeon_id: Option<Ulid>,
    pub procedure_type_id: Option<Ulid>,
}

/// Partial update; `None` fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct BookingPatch {
    pub suite_id: Option<Ulid>,
    pub date: Option<NaiveDate>,
    pub start_time: Option<NaiveTime>,
    /// `Some(None)` re-derives the duration from the procedure type.
    pub base_duration_min: Option<Option<i64>>,
    pub overtime_min: Option<i64>,
    pub patient_id: Option<Ulid>,
    pub surgeon_id: Option<Ulid>,
    pub procedure_type_id: Option<Ulid>,
}

impl BookingPatch {
    fn touches_schedule(&self) -> bool {
        self.suite_id.is_some()
            || self.date.is_some()
            || self.start_time.is_some()
            || self.base_duration_min.is_some()
            || self.overtime_min.is_some()
    }
}

impl Scheduler {
    /// Validate and persist a primary booking, then synthesize its trailing
    /// cleanup. Nothing is persisted when any check fails.
    pub async fn create_booking(&self, req: NewBooking) -> Result<Booking, SchedulerError> {
        if self.store.find_suite(req.suite_id).await?.is_none() {
            return Err(SchedulerError::Validation("unknown suite"));
        }
        let default_duration = match req.procedure_type_id {
            Some(tid) => Some(
                self.store
                    .find_procedure_type(tid)
                    .await?
                    .ok_or(SchedulerError::Validation("unknown procedure type"))?
                    .default_duration_min,
            ),
            None => None,
        };
        let base = match req.base_duration_min {
            Some(d) => d,
            None => default_duration.ok_or(SchedulerError::Validation(
                "base duration or procedure type required",
            ))?,
        };
        validate_durations(base, req.overtime_min)?;

        let booking = Booking {
            id: Ulid::new(),
            suite_id: req.suite_id,
            date: req.date,
            start_time: req.start_time,
            base_duration_min: base,
            overtime_min: req.overtime_min,
            state: BookingState::Scheduled,
            is_cleanup: false,
            parent_id: None,
            patient_id: req.patient_id,
            surgeon_id: req.surgeon_id,
            procedure_type_id: req.procedure_type_id,
        };

        let _guard = self.lock_suite(req.suite_id).await;
        let siblings = self
            .store
            .find_bookings(Some(req.suite_id), Some(req.date), None)
            .await?;
        if siblings.iter().filter(|b| !b.is_cleanup).count() >= MAX_BOOKINGS_PER_SUITE_DAY {
            return Err(SchedulerError::LimitExceeded("too many bookings on suite/day"));
        }
        if let Some(with) = find_conflict(&booking.window(), None, &siblings) {
            metrics::counter!(CONFLICTS_REJECTED_TOTAL).increment(1);
            return Err(SchedulerError::Conflict { with });
        }

        let saved = self.store.save(booking).await?;
        self.store.save(derive_cleanup(&saved)).await?;

        metrics::counter!(BOOKINGS_CREATED_TOTAL).increment(1);
        info!(
            "booked suite {} on {} at {} for {} min",
            saved.suite_id, saved.date, saved.start_time, saved.base_duration_min
        );
        Ok(saved)
    }

    /// Apply a partial edit. Overlap is re-validated only when a schedule
    /// field changed on a primary; the cleanup follows the new end instant.
    pub async fn update_booking(
        &self,
        id: Ulid,
        patch: BookingPatch,
    ) -> Result<Booking, SchedulerError> {
        let current = self
            .store
            .find_booking(id)
            .await?
            .ok_or(SchedulerError::NotFound(id))?;
        let touches_schedule = patch.touches_schedule();

        let mut updated = current.clone();
        if let Some(s) = patch.suite_id {
            if self.store.find_suite(s).await?.is_none() {
                return Err(SchedulerError::Validation("unknown suite"));
            }
            updated.suite_id = s;
        }
        if let Some(d) = patch.date {
            updated.date = d;
        }
        if let Some(t) = patch.start_time {
            updated.start_time = t;
        }
        if let Some(tid) = patch.procedure_type_id {
            if self.store.find_procedure_type(tid).await?.is_none() {
                return Err(SchedulerError::Validation("unknown procedure type"));
            }
            updated.procedure_type_id = Some(tid);
        }
        if let Some(p) = patch.patient_id {
            updated.patient_id = Some(p);
        }
        if let Some(s) = patch.surgeon_id {
            updated.surgeon_id = Some(s);
        }
        match patch.base_duration_min {
            Some(Some(d)) => updated.base_duration_min = d,
            Some(None) => {
                let tid = updated.procedure_type_id.ok_or(SchedulerError::Validation(
                    "no procedure type to derive the duration from",
                ))?;
                updated.base_duration_min = self
                    .store
                    .find_procedure_type(tid)
                    .await?
                    .ok_or(SchedulerError::Validation("unknown procedure type"))?
                    .default_duration_min;
            }
            None => {}
        }
        if let Some(o) = patch.overtime_min {
            updated.overtime_min = o;
        }
        validate_durations(updated.base_duration_min, updated.overtime_min)?;

        let mut lock_ids = vec![updated.suite_id];
        if current.suite_id != updated.suite_id {
            lock_ids.push(current.suite_id);
        }
        let _guards = self.lock_suites(lock_ids).await;

        if touches_schedule && !updated.is_cleanup {
            let siblings = self
                .store
                .find_bookings(Some(updated.suite_id), Some(updated.date), None)
                .await?;
            if let Some(with) = find_conflict(&updated.window(), Some(id), &siblings) {
                metrics::counter!(CONFLICTS_REJECTED_TOTAL).increment(1);
                return Err(SchedulerError::Conflict { with });
            }
        }

        let saved = self.store.save(updated).await?;
        if !saved.is_cleanup
            && (saved.end_instant_full() != current.end_instant_full()
                || saved.suite_id != current.suite_id)
        {
            self.relocate_cleanup(&saved).await;
        }
        Ok(saved)
    }

    /// Explicit state change. Forward moves only; `Cancelled` is allowed
    /// from any non-terminal state and propagates to a not-yet-started
    /// cleanup when a primary is cancelled.
    pub async fn set_state(
        &self,
        id: Ulid,
        new_state: BookingState,
    ) -> Result<Booking, SchedulerError> {
        let mut booking = self
            .store
            .find_booking(id)
            .await?
            .ok_or(SchedulerError::NotFound(id))?;
        if booking.state == new_state {
            return Ok(booking);
        }
        if booking.state.is_terminal() {
            return Err(SchedulerError::Validation("booking is in a terminal state"));
        }
        if new_state == BookingState::InCleanup && !booking.is_cleanup {
            return Err(SchedulerError::Validation("primary cannot enter cleanup state"));
        }
        if matches!(new_state, BookingState::InProgress | BookingState::Complicated)
            && booking.is_cleanup
        {
            return Err(SchedulerError::Validation("cleanup cannot enter surgery states"));
        }
        if new_state != BookingState::Cancelled && new_state.rank() < booking.state.rank() {
            return Err(SchedulerError::Validation("state may not move backwards"));
        }

        let prior = booking.state;
        booking.state = new_state;
        let saved = self.store.save(booking).await?;
        info!("booking {} state {:?} -> {:?}", saved.id, prior, new_state);

        if new_state == BookingState::Cancelled && !saved.is_cleanup {
            self.cancel_linked_cleanup(&saved).await;
        }
        Ok(saved)
    }

    /// Record overtime and re-sequence the rest of the suite's day behind
    /// the longer occupancy. Returns the booking as stored after compaction.
    pub async fn set_overtime(&self, id: Ulid, minutes: i64) -> Result<Booking, SchedulerError> {
        let mut booking = self
            .store
            .find_booking(id)
            .await?
            .ok_or(SchedulerError::NotFound(id))?;
        validate_durations(booking.base_duration_min, minutes)?;

        let _guard = self.lock_suite(booking.suite_id).await;
        booking.overtime_min = minutes;
        let saved = self.store.save(booking).await?;
        if !saved.is_cleanup {
            self.compact_day(saved.suite_id, saved.date).await?;
        }
        self.store
            .find_booking(id)
            .await?
            .ok_or(SchedulerError::NotFound(id))
    }

    /// Move a booking to another suite and re-sequence both days. The
    /// vacated day closes its gap, the receiving day pushes conflicts out.
    pub async fn reassign_suite(
        &self,
        id: Ulid,
        suite_id: Ulid,
    ) -> Result<Booking, SchedulerError> {
        let mut booking = self
            .store
            .find_booking(id)
            .await?
            .ok_or(SchedulerError::NotFound(id))?;
        if self.store.find_suite(suite_id).await?.is_none() {
            return Err(SchedulerError::Validation("unknown suite"));
        }
        if booking.suite_id == suite_id {
            return Ok(booking);
        }
        let vacated = booking.suite_id;

        let _guards = self.lock_suites(vec![vacated, suite_id]).await;
        booking.suite_id = suite_id;
        let saved = self.store.save(booking).await?;
        if !saved.is_cleanup {
            self.compact_day(suite_id, saved.date).await?;
            self.compact_day(vacated, saved.date).await?;
        }
        self.store
            .find_booking(id)
            .await?
            .ok_or(SchedulerError::NotFound(id))
    }

    /// Hard delete. A primary's not-yet-started cleanup is cancelled, not
    /// deleted, so the record of the reserved servicing window survives.
    pub async fn delete_booking(&self, id: Ulid) -> Result<(), SchedulerError> {
        let booking = self
            .store
            .find_booking(id)
            .await?
            .ok_or(SchedulerError::NotFound(id))?;
        let _guard = self.lock_suite(booking.suite_id).await;
        if !booking.is_cleanup {
            self.cancel_linked_cleanup(&booking).await;
        }
        self.store.delete(id).await?;
        Ok(())
    }
}
