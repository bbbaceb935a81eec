// Agent: samples this host and reports to the aggregator on a fixed cadence.

use anyhow::Result;
use hostwatch::agent_worker::{self, AgentWorkerConfig, AgentWorkerDeps, ReportIdentity};
use hostwatch::config::AgentConfig;
use hostwatch::reporter::Reporter;
use hostwatch::sampler::{Sampler, SysinfoProbe};
use hostwatch::{logging, version};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[tokio::main]
async fn main() -> Result<()> {
    let config = AgentConfig::load()?;
    logging::init(config.logging.level.as_deref());

    let identity = ReportIdentity::resolve(&config.server, sysinfo::System::host_name());
    let reporter = Reporter::new(
        &config.api.endpoint,
        &config.api.agent_key,
        Duration::from_secs(config.api.timeout_secs),
    )?;
    tracing::info!(
        version = version::VERSION,
        server_id = %identity.server_id,
        server_name = %identity.server_name,
        endpoint = %reporter.url(),
        interval_secs = config.reporting.interval_secs,
        "starting agent"
    );

    let process_limit = config.reporting.process_limit;
    let probe = tokio::task::spawn_blocking(SysinfoProbe::new)
        .await
        .map_err(|e| anyhow::anyhow!("probe init: {}", e))?;
    let sampler = Arc::new(Mutex::new(Sampler::new(probe, process_limit)));

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let worker_handle = agent_worker::spawn(
        AgentWorkerDeps {
            sampler,
            reporter,
            identity,
            shutdown_rx,
        },
        AgentWorkerConfig {
            interval_secs: config.reporting.interval_secs,
        },
    );

    wait_for_signal().await;
    tracing::info!("Received shutdown signal");
    let _ = shutdown_tx.send(());
    let _ = worker_handle.await;
    Ok(())
}

async fn wait_for_signal() {
    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(s) => s,
                Err(_) => {
                    let _ = tokio::signal::ctrl_c().await;
                    return;
                }
            };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
