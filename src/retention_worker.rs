// Background task: prune time-series rows past the retention horizon.
// Runs every cleanup_interval_hours; VACUUM follows on an optional cron schedule.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::store::{MetricsStore, StoreResult};
use chrono::{DateTime, TimeDelta, Utc};
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone)]
pub struct RetentionWorkerConfig {
    pub retention_days: u32,
    pub cleanup_interval_secs: u64,
    /// Optional cron expression for VACUUM (e.g. "0 0 4 * * *"). Uses local time.
    pub vacuum_schedule: Option<String>,
}

/// Spawns the retention loop. Returns a join handle.
pub fn spawn(
    store: Arc<MetricsStore>,
    config: RetentionWorkerConfig,
    shutdown_rx: tokio::sync::watch::Receiver<bool>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        run(store, config, shutdown_rx).await;
    })
}

#[instrument(skip(store, shutdown_rx), fields(retention_days = config.retention_days))]
async fn run(
    store: Arc<MetricsStore>,
    config: RetentionWorkerConfig,
    mut shutdown_rx: tokio::sync::watch::Receiver<bool>,
) {
    let period = Duration::from_secs(config.cleanup_interval_secs);
    // First sweep one full period after startup.
    let mut sweep = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    sweep.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let (vacuum_tx, mut vacuum_rx) = tokio::sync::mpsc::channel::<()>(1);
    let vacuum_task = config
        .vacuum_schedule
        .clone()
        .map(|schedule| tokio::spawn(vacuum_scheduler(schedule, vacuum_tx)));

    loop {
        tokio::select! {
            _ = sweep.tick() => {
                match run_once(&store, &config, Utc::now()).await {
                    Ok(deleted) => info!(deleted, "cleaned up data older than {} days", config.retention_days),
                    Err(e) => warn!(error = %e, operation = "prune", "retention sweep failed"),
                }
            }
            Some(()) = vacuum_rx.recv() => {
                if let Err(e) = store.vacuum().await {
                    warn!(error = %e, "vacuum failed");
                } else {
                    info!("vacuum complete");
                }
            }
            _ = shutdown_rx.changed() => {
                debug!("Retention worker shutting down");
                break;
            }
        }
    }
    if let Some(task) = vacuum_task {
        task.abort();
    }
}

/// Rows older than this instant are eligible for deletion.
pub fn cutoff(now: DateTime<Utc>, retention_days: u32) -> DateTime<Utc> {
    // Out-of-range horizons clamp to the epoch, which prunes nothing.
    TimeDelta::try_days(i64::from(retention_days))
        .and_then(|horizon| now.checked_sub_signed(horizon))
        .unwrap_or(DateTime::UNIX_EPOCH)
}

/// One sweep: delete metrics older than `now - retention_days`. Returns rows deleted.
pub async fn run_once(
    store: &MetricsStore,
    config: &RetentionWorkerConfig,
    now: DateTime<Utc>,
) -> StoreResult<u64> {
    store.prune(cutoff(now, config.retention_days)).await
}

/// Sends a message on `tx` at each VACUUM time. Uses local time for cron.
async fn vacuum_scheduler(cron_str: String, tx: tokio::sync::mpsc::Sender<()>) {
    let Ok(schedule) = cron::Schedule::from_str(&cron_str) else {
        warn!(cron = %cron_str, "invalid vacuum_schedule; VACUUM will not run");
        return;
    };
    loop {
        let now = chrono::Local::now();
        if let Some(next) = schedule.after(&now).next() {
            let delay = (next - now).to_std().unwrap_or(Duration::from_secs(1));
            tokio::time::sleep(delay).await;
            if tx.send(()).await.is_err() {
                break;
            }
        } else {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
    }
}
