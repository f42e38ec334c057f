use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::engine::Scheduler;
use crate::store::MemoryStore;

/// Background task that periodically advances booking lifecycles.
/// The engine has no internal scheduler; this loop is the periodic trigger.
pub async fn run_reconciler(scheduler: Arc<Scheduler>, every: Duration) {
    let mut interval = tokio::time::interval(every);
    loop {
        interval.tick().await;
        match scheduler.reconcile(None).await {
            Ok(0) => debug!("reconciliation pass: nothing to advance"),
            Ok(n) => info!("reconciliation pass advanced {n} bookings"),
            Err(e) => warn!("reconciliation pass failed: {e}"),
        }
    }
}

/// Background task that rewrites the WAL once enough appends accumulate.
pub async fn run_compactor(store: Arc<MemoryStore>, threshold: u64) {
    let mut interval = tokio::time::interval(Duration::from_secs(60));
    loop {
        interval.tick().await;
        if store.appends_since_rewrite() >= threshold {
            match store.compact_wal().await {
                Ok(()) => info!("WAL compacted"),
                Err(e) => warn!("WAL compaction failed: {e}"),
            }
        }
    }
}
