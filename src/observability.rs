use std::net::SocketAddr;

// ── RED metrics (request-driven) ────────────────────────────────

/// Counter: primary bookings accepted.
pub const BOOKINGS_CREATED_TOTAL: &str = "opsched_bookings_created_total";

/// Counter: booking mutations rejected for interval overlap.
pub const CONFLICTS_REJECTED_TOTAL: &str = "opsched_conflicts_rejected_total";

// ── Reconciliation ──────────────────────────────────────────────

/// Counter: time-driven state transitions persisted.
pub const STATE_TRANSITIONS_TOTAL: &str = "opsched_state_transitions_total";

/// Counter: bookings skipped inside a reconciliation pass.
pub const RECONCILE_SKIPPED_TOTAL: &str = "opsched_reconcile_skipped_total";

/// Histogram: duration of one reconciliation pass in seconds.
pub const RECONCILE_PASS_DURATION_SECONDS: &str = "opsched_reconcile_pass_duration_seconds";

/// Counter: cleanup bookings the engine failed to relink after a primary
/// edit. Anything non-zero means a cleanup was modified out of band.
pub const CLEANUP_RELINK_FAILURES_TOTAL: &str = "opsched_cleanup_relink_failures_total";

// ── WAL ─────────────────────────────────────────────────────────

/// Histogram: WAL group-commit flush duration in seconds.
pub const WAL_FLUSH_DURATION_SECONDS: &str = "opsched_wal_flush_duration_seconds";

/// Histogram: WAL group-commit batch size (events per flush).
pub const WAL_FLUSH_BATCH_SIZE: &str = "opsched_wal_flush_batch_size";

/// Install the Prometheus metrics exporter on the given port. No-op if
/// `port` is `None`.
pub fn init(port: Option<u16>) {
    let Some(port) = port else { return };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .expect("failed to install Prometheus metrics exporter");
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
}
