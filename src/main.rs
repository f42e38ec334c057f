use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use opsched::clock::SystemClock;
use opsched::engine::Scheduler;
use opsched::reconciler;
use opsched::store::MemoryStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let metrics_port: Option<u16> = std::env::var("OPSCHED_METRICS_PORT")
        .ok()
        .and_then(|s| s.parse().ok());
    opsched::observability::init(metrics_port);

    let data_dir = std::env::var("OPSCHED_DATA_DIR").unwrap_or_else(|_| "./data".into());
    let reconcile_secs: u64 = std::env::var("OPSCHED_RECONCILE_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(30);
    let compact_threshold: u64 = std::env::var("OPSCHED_COMPACT_THRESHOLD")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(1000);

    std::fs::create_dir_all(&data_dir)?;
    let wal_path = PathBuf::from(&data_dir).join("bookings.wal");

    let store = Arc::new(MemoryStore::open(&wal_path)?);
    let scheduler = Arc::new(Scheduler::new(store.clone(), Arc::new(SystemClock)));

    info!("opsched running");
    info!("  data_dir: {data_dir}");
    info!("  reconcile every: {reconcile_secs}s");
    info!(
        "  metrics: {}",
        metrics_port.map_or("disabled".to_string(), |p| format!(
            "http://0.0.0.0:{p}/metrics"
        ))
    );

    tokio::spawn(reconciler::run_reconciler(
        scheduler.clone(),
        Duration::from_secs(reconcile_secs),
    ));
    tokio::spawn(reconciler::run_compactor(store.clone(), compact_threshold));

    // Run until SIGTERM/ctrl-c, then flush state through one final compaction.
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to register SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
    }

    info!("shutdown signal received");
    if let Err(e) = store.compact_wal().await {
        tracing::warn!("final WAL compaction failed: {e}");
    }
    info!("opsched stopped");
    Ok(())
}
