// Shared test helpers
#![allow(dead_code)]

use chrono::{DateTime, Utc};
use hostwatch::models::*;
use hostwatch::store::MetricsStore;
use tempfile::TempDir;

pub const API_KEY: &str = "operator-secret";
pub const AGENT_KEY: &str = "agent-secret";

pub const SERVER_CONFIG: &str = r#"
[server]
port = 8080
host = "127.0.0.1"

[database]
path = "data/test.db"
max_pool_size = 2

[auth]
api_key = "operator-secret"
agent_key = "agent-secret"
"#;

/// Fresh store in a temp dir. Keep the TempDir alive for the test's duration.
pub async fn temp_store() -> (TempDir, MetricsStore) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("metrics.db");
    let store = MetricsStore::connect(path.to_str().unwrap(), 2)
        .await
        .unwrap();
    store.init().await.unwrap();
    (dir, store)
}

pub fn metrics_at(server_id: &str, ts: DateTime<Utc>, cpu: f64) -> Metrics {
    let mut m = Metrics::zeroed(server_id, ts);
    m.cpu = cpu;
    m.memory = 40.0;
    m.network_in = 2.0;
    m.network_out = 1.0;
    m
}

pub fn disk(name: &str) -> Disk {
    Disk {
        name: name.into(),
        mount_point: format!("/mnt/{name}"),
        fs_type: "ext4".into(),
        total_size: 1000,
        used_size: 250,
        available_size: 750,
        usage_percent: 25.0,
    }
}

pub fn process(pid: u32, cpu: f64, memory: f64) -> Process {
    Process {
        pid,
        name: format!("proc-{pid}"),
        cpu,
        memory,
        user: "root".into(),
        status: "Run".into(),
    }
}

pub fn interface(name: &str) -> NetworkInterface {
    NetworkInterface {
        name: name.into(),
        type_: "ethernet".into(),
        upload_speed: 0.5,
        download_speed: 1.5,
        total_upload: 10,
        total_download: 20,
        status: "up".into(),
    }
}

pub fn report(server_id: &str, ts: DateTime<Utc>) -> AgentReport {
    AgentReport {
        server_id: server_id.into(),
        server_name: format!("{server_id}-name"),
        os: "linux".into(),
        location: "lab".into(),
        timestamp: ts,
        metrics: metrics_at(server_id, ts, 12.0),
        info: ServerInfo {
            server_id: server_id.into(),
            cpu_cores: 4,
            total_memory: 8192,
            used_memory: 2048,
            uptime: 3600,
        },
        disks: vec![disk("sda1")],
        processes: vec![process(1, 5.0, 1.0), process(2, 50.0, 0.5)],
        network: vec![interface("eth0")],
    }
}
