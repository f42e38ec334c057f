use chrono::NaiveDateTime;
use tracing::{debug, info, warn};
use ulid::Ulid;

use crate::model::ACTIVE_STATES;
use crate::observability::{
    RECONCILE_PASS_DURATION_SECONDS, RECONCILE_SKIPPED_TOTAL, STATE_TRANSITIONS_TOTAL,
};

use super::{lifecycle, Scheduler, SchedulerError};

impl Scheduler {
    /// One reconciliation pass: advance every active booking's state as far
    /// as `now` allows and persist the changes. Returns how many bookings
    /// moved.
    ///
    /// Each booking is re-read and rewritten under its suite lock, and the
    /// state machine converges under repetition, so overlapping or redundant
    /// passes are harmless. A single booking's store failure is logged and
    /// skipped; it never aborts the pass.
    pub async fn reconcile(&self, now: Option<NaiveDateTime>) -> Result<usize, SchedulerError> {
        let now = now.unwrap_or_else(|| self.clock.now());
        let started = std::time::Instant::now();

        let active = self
            .store
            .find_bookings(None, None, Some(&ACTIVE_STATES))
            .await?;

        let mut updated = 0usize;
        for candidate in active {
            let _guard = self.lock_suite(candidate.suite_id).await;
            let fresh = match self.store.find_booking(candidate.id).await {
                Ok(Some(b)) => b,
                Ok(None) => continue, // deleted since the scan
                Err(e) => {
                    skip(candidate.id, &e);
                    continue;
                }
            };
            if !fresh.state.is_active() {
                continue; // cancelled or finished since the scan
            }

            let next = lifecycle::advance(&fresh, now);
            if next == fresh.state {
                continue;
            }
            let prior = fresh.state;
            let mut changed = fresh;
            changed.state = next;
            match self.store.save(changed).await {
                Ok(saved) => {
                    updated += 1;
                    metrics::counter!(STATE_TRANSITIONS_TOTAL).increment(1);
                    debug!("booking {} advanced {:?} -> {:?}", saved.id, prior, next);
                }
                Err(e) => skip(candidate.id, &e),
            }
        }

        metrics::histogram!(RECONCILE_PASS_DURATION_SECONDS)
            .record(started.elapsed().as_secs_f64());
        if updated > 0 {
            info!("reconciliation advanced {updated} bookings");
        }
        Ok(updated)
    }
}

fn skip(id: Ulid, err: &SchedulerError) {
    metrics::counter!(RECONCILE_SKIPPED_TOTAL).increment(1);
    warn!("reconciliation skipped booking {id}: {err}");
}
