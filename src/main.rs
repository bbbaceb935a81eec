// Aggregator: agent ingest, query API, liveness and retention workers over SQLite.

use anyhow::Result;
use hostwatch::*;
use std::net::SocketAddr;
use std::sync::Arc;

#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[tokio::main]
async fn main() -> Result<()> {
    let app_config = config::ServerConfig::load()?;
    logging::init(app_config.logging.level.as_deref());
    tracing::info!(name = version::NAME, version = version::VERSION, "starting aggregator");

    let store = Arc::new(
        store::MetricsStore::connect(
            &app_config.database.path,
            app_config.database.max_pool_size,
        )
        .await?,
    );
    store.init().await?;

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    let liveness_handle = liveness_worker::spawn(
        store.clone(),
        liveness_worker::LivenessWorkerConfig {
            check_interval_secs: app_config.liveness.check_interval_secs,
            policy: app_config.liveness.policy(),
        },
        shutdown_rx.clone(),
    );
    let retention_handle = retention_worker::spawn(
        store.clone(),
        retention_worker::RetentionWorkerConfig {
            retention_days: app_config.retention.retention_days,
            cleanup_interval_secs: app_config.retention.cleanup_interval_hours.saturating_mul(3_600),
            vacuum_schedule: app_config.retention.vacuum_schedule.clone(),
        },
        shutdown_rx,
    );

    let app = routes::app(store, &app_config)
        .into_make_service_with_connect_info::<SocketAddr>();
    let addr = format!("{}:{}", app_config.server.host, app_config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Received shutdown signal");
    let _ = shutdown_tx.send(true);
    let _ = liveness_handle.await;
    let _ = retention_handle.await;
    Ok(())
}

async fn shutdown_signal() {
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
