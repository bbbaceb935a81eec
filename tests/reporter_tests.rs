// Agent -> aggregator round trip over a real loopback listener

mod common;

use common::*;
use hostwatch::agent_worker::{self, ReportIdentity};
use hostwatch::config::{AgentIdentity, ServerConfig};
use hostwatch::models::{Disk, ServerStatus};
use hostwatch::reporter::Reporter;
use hostwatch::routes;
use hostwatch::sampler::{HostProbe, IoCounters, MemoryReading, ProcessReading, Sampler};
use hostwatch::store::MetricsStore;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

struct StaticProbe;

impl HostProbe for StaticProbe {
    fn cpu_percent(&mut self) -> Option<f64> {
        Some(42.0)
    }
    fn memory(&mut self) -> Option<MemoryReading> {
        Some(MemoryReading {
            total_bytes: 4 * 1024 * 1024 * 1024,
            used_bytes: 1024 * 1024 * 1024,
        })
    }
    fn disk_io(&mut self) -> anyhow::Result<Vec<IoCounters>> {
        Ok(vec![])
    }
    fn network_io(&mut self) -> anyhow::Result<Vec<IoCounters>> {
        Ok(vec![IoCounters {
            name: "eth0".into(),
            bytes_in: 0,
            bytes_out: 0,
        }])
    }
    fn partitions(&mut self) -> anyhow::Result<Vec<Disk>> {
        Ok(vec![disk("sda1")])
    }
    fn processes(&mut self) -> anyhow::Result<Vec<ProcessReading>> {
        Ok(vec![ProcessReading {
            pid: 7,
            name: "sshd".into(),
            cpu: Some(0.5),
            memory: Some(0.1),
            user: "root".into(),
            status: "Sleep".into(),
        }])
    }
    fn cpu_cores(&self) -> u32 {
        2
    }
    fn uptime_secs(&self) -> u64 {
        90
    }
}

async fn spawn_server() -> (TempDir, Arc<MetricsStore>, String) {
    let (dir, store) = temp_store().await;
    let store = Arc::new(store);
    let config = ServerConfig::load_from_str(SERVER_CONFIG).unwrap();
    let app = routes::app(store.clone(), &config);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });
    (dir, store, format!("http://{addr}"))
}

#[tokio::test]
async fn report_round_trip_returns_ack() {
    let (_dir, store, endpoint) = spawn_server().await;
    let reporter = Reporter::new(&format!("{endpoint}/"), AGENT_KEY, Duration::from_secs(5)).unwrap();
    assert_eq!(reporter.url(), format!("{endpoint}/api/v1/agent/report"));

    let ack = reporter
        .report(&report("srv-1", chrono::Utc::now()))
        .await
        .unwrap();
    assert!(ack.success);
    assert_eq!(ack.next_report_interval, 5);

    let rec = store.get_server("srv-1").await.unwrap();
    assert_eq!(rec.ip, "127.0.0.1");
    assert_eq!(rec.status, ServerStatus::Online);
}

#[tokio::test]
async fn wrong_agent_key_is_an_error() {
    let (_dir, store, endpoint) = spawn_server().await;
    let reporter = Reporter::new(&endpoint, "wrong", Duration::from_secs(5)).unwrap();
    let err = reporter
        .report(&report("srv-1", chrono::Utc::now()))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("401"));
    assert!(store.get_server("srv-1").await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn unreachable_server_is_an_error() {
    // Bind then drop to get a port nothing listens on
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let reporter = Reporter::new(&format!("http://{addr}"), AGENT_KEY, Duration::from_secs(2)).unwrap();
    assert!(reporter.report(&report("srv-1", chrono::Utc::now())).await.is_err());
}

#[tokio::test]
async fn agent_tick_lands_in_store() {
    let (_dir, store, endpoint) = spawn_server().await;
    let reporter = Reporter::new(&endpoint, AGENT_KEY, Duration::from_secs(5)).unwrap();
    let identity = ReportIdentity::resolve(
        &AgentIdentity {
            id: "edge-1".into(),
            name: None,
            location: Some("rack-4".into()),
        },
        Some("edge-host".into()),
    );
    let sampler = Arc::new(Mutex::new(Sampler::new(StaticProbe, 20)));

    let ack = agent_worker::run_tick(&sampler, &reporter, &identity)
        .await
        .unwrap();
    assert!(ack.success);

    let rec = store.get_server("edge-1").await.unwrap();
    assert_eq!(rec.name, "edge-host");
    assert_eq!(rec.location, "rack-4");
    assert_eq!(rec.os, std::env::consts::OS);

    let latest = store.latest("edge-1").await.unwrap().unwrap();
    assert_eq!(latest.cpu, 42.0);
    assert_eq!(latest.memory, 25.0);
    assert_eq!(latest.network_in, 0.0);

    let info = store.get_server_info("edge-1").await.unwrap().unwrap();
    assert_eq!(info.cpu_cores, 2);
    assert_eq!(info.total_memory, 4096);

    let procs = store
        .processes("edge-1", hostwatch::store::ProcessSort::Cpu, 20)
        .await
        .unwrap();
    assert_eq!(procs.len(), 1);
    assert_eq!(procs[0].name, "sshd");
    assert_eq!(store.network_interfaces("edge-1").await.unwrap().len(), 1);
}
