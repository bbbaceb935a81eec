// Agent collection loop: sample the host on a fixed cadence and push each tick to the
// aggregator. Sampling runs on the blocking pool; a failed tick is logged and skipped.

use crate::config::AgentIdentity;
use crate::models::{AgentReport, ReportAck};
use crate::reporter::Reporter;
use crate::sampler::{HostProbe, Sampler};
use std::sync::{Arc, Mutex};
use tokio::time::{Duration, MissedTickBehavior, interval};

const UNKNOWN_LOCATION: &str = "unknown";

/// Identity stamped on every report.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportIdentity {
    pub server_id: String,
    pub server_name: String,
    pub os: String,
    pub location: String,
}

impl ReportIdentity {
    /// Name falls back to `hostname`, then to the id. Location falls back to "unknown".
    pub fn resolve(identity: &AgentIdentity, hostname: Option<String>) -> Self {
        let server_name = identity
            .name
            .clone()
            .filter(|n| !n.trim().is_empty())
            .or(hostname.filter(|h| !h.trim().is_empty()))
            .unwrap_or_else(|| identity.id.clone());
        let location = identity
            .location
            .clone()
            .filter(|l| !l.trim().is_empty())
            .unwrap_or_else(|| UNKNOWN_LOCATION.to_string());
        Self {
            server_id: identity.id.clone(),
            server_name,
            os: std::env::consts::OS.to_string(),
            location,
        }
    }
}

/// Sampler, transport and shutdown for the agent loop.
pub struct AgentWorkerDeps<P> {
    pub sampler: Arc<Mutex<Sampler<P>>>,
    pub reporter: Reporter,
    pub identity: ReportIdentity,
    pub shutdown_rx: tokio::sync::oneshot::Receiver<()>,
}

pub struct AgentWorkerConfig {
    pub interval_secs: u64,
}

/// Runs one collection on the blocking pool and assembles the report.
pub async fn collect_report<P: HostProbe + 'static>(
    sampler: &Arc<Mutex<Sampler<P>>>,
    identity: &ReportIdentity,
) -> anyhow::Result<AgentReport> {
    let sampler = Arc::clone(sampler);
    let server_id = identity.server_id.clone();
    let collection = tokio::task::spawn_blocking(move || {
        let mut sampler = sampler
            .lock()
            .map_err(|e| anyhow::anyhow!("sampler lock poisoned: {}", e))?;
        sampler.collect(&server_id)
    })
    .await
    .map_err(|e| anyhow::anyhow!("sampler task: {}", e))??;

    Ok(AgentReport {
        server_id: identity.server_id.clone(),
        server_name: identity.server_name.clone(),
        os: identity.os.clone(),
        location: identity.location.clone(),
        timestamp: collection.metrics.timestamp,
        metrics: collection.metrics,
        info: collection.info,
        disks: collection.disks,
        processes: collection.processes,
        network: collection.network,
    })
}

/// Collect and send once.
pub async fn run_tick<P: HostProbe + 'static>(
    sampler: &Arc<Mutex<Sampler<P>>>,
    reporter: &Reporter,
    identity: &ReportIdentity,
) -> anyhow::Result<ReportAck> {
    let report = collect_report(sampler, identity).await?;
    reporter.report(&report).await
}

/// Spawns the agent loop. The first tick fires immediately. Shutdown is only observed
/// between ticks, so an in-flight report is never cut short.
pub fn spawn<P: HostProbe + 'static>(
    deps: AgentWorkerDeps<P>,
    config: AgentWorkerConfig,
) -> tokio::task::JoinHandle<()> {
    let AgentWorkerDeps {
        sampler,
        reporter,
        identity,
        mut shutdown_rx,
    } = deps;

    tokio::spawn(async move {
        let mut tick = interval(Duration::from_secs(config.interval_secs));
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut advised_interval: Option<u64> = None;
        let mut reports_sent: u64 = 0;

        loop {
            tokio::select! {
                _ = tick.tick() => {
                    match run_tick(&sampler, &reporter, &identity).await {
                        Ok(ack) => {
                            reports_sent += 1;
                            if advised_interval != Some(ack.next_report_interval) {
                                tracing::debug!(
                                    next_report_interval = ack.next_report_interval,
                                    configured = config.interval_secs,
                                    "server advised report interval"
                                );
                                advised_interval = Some(ack.next_report_interval);
                            }
                        }
                        Err(e) => {
                            tracing::warn!(
                                error = %e,
                                operation = "report",
                                server_id = %identity.server_id,
                                "report failed"
                            );
                        }
                    }
                }
                _ = &mut shutdown_rx => {
                    tracing::debug!(reports_sent, "Agent worker shutting down");
                    break;
                }
            }
        }
    })
}
