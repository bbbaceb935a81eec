// Background task: recompute every server's liveness status on a fixed cadence.

use std::sync::Arc;
use std::time::Duration;

use crate::liveness::LivenessPolicy;
use crate::store::{MetricsStore, StoreResult};
use chrono::{DateTime, Utc};
use tracing::{debug, instrument, warn};

#[derive(Debug, Clone)]
pub struct LivenessWorkerConfig {
    pub check_interval_secs: u64,
    pub policy: LivenessPolicy,
}

/// Spawns the liveness loop. Returns a join handle.
pub fn spawn(
    store: Arc<MetricsStore>,
    config: LivenessWorkerConfig,
    mut shutdown_rx: tokio::sync::watch::Receiver<bool>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(Duration::from_secs(config.check_interval_secs));
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = tick.tick() => {
                    if let Err(e) = recompute(&store, &config.policy, Utc::now()).await {
                        warn!(error = %e, operation = "recompute_liveness", "liveness recompute failed");
                    }
                }
                _ = shutdown_rx.changed() => {
                    debug!("Liveness worker shutting down");
                    break;
                }
            }
        }
    })
}

/// One pass: read heartbeats, derive statuses, write them back. Servers without a
/// heartbeat are left alone, as are servers whose heartbeat moved after the read.
/// Returns how many rows changed status.
#[instrument(skip(store, policy), fields(operation = "recompute_liveness"))]
pub async fn recompute(
    store: &MetricsStore,
    policy: &LivenessPolicy,
    now: DateTime<Utc>,
) -> StoreResult<u64> {
    let heartbeats = store.heartbeats().await?;
    let updates = policy.derive_all(&heartbeats, now);
    let changed = store.set_statuses(&updates).await?;
    if changed > 0 {
        debug!(servers = heartbeats.len(), changed, "liveness statuses updated");
    }
    Ok(changed)
}
