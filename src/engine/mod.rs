mod cleanup;
mod compact;
mod error;
mod lifecycle;
mod mutations;
mod overlap;
mod queries;
mod reconcile;

pub use error::SchedulerError;
pub use lifecycle::advance;
pub use mutations::{BookingPatch, NewBooking};

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use ulid::Ulid;

use crate::clock::TimeSource;
use crate::store::BookingStore;

/// The scheduling engine: overlap-validated booking mutations, derived
/// cleanup maintenance, schedule compaction and time-driven reconciliation,
/// all on top of an abstract [`BookingStore`].
pub struct Scheduler {
    store: Arc<dyn BookingStore>,
    clock: Arc<dyn TimeSource>,
    /// One guard per suite, held across each validate-then-write critical
    /// section so two concurrent creations cannot both pass validation
    /// against a stale snapshot.
    suite_locks: DashMap<Ulid, Arc<Mutex<()>>>,
}

impl Scheduler {
    pub fn new(store: Arc<dyn BookingStore>, clock: Arc<dyn TimeSource>) -> Self {
        Self {
            store,
            clock,
            suite_locks: DashMap::new(),
        }
    }

    pub(super) async fn lock_suite(&self, suite_id: Ulid) -> OwnedMutexGuard<()> {
        let cell = self.suite_locks.entry(suite_id).or_default().clone();
        cell.lock_owned().await
    }

    /// Lock several suites in sorted id order to avoid lock-order inversion.
    pub(super) async fn lock_suites(&self, mut ids: Vec<Ulid>) -> Vec<OwnedMutexGuard<()>> {
        ids.sort();
        ids.dedup();
        let mut guards = Vec::with_capacity(ids.len());
        for id in ids {
            guards.push(self.lock_suite(id).await);
        }
        guards
    }
}
