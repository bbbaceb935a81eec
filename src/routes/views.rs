// Response shapes for the query API. Kept separate from the stored models so the
// wire format can differ from the row layout.

use serde::Serialize;

use crate::models::{Disk, Metrics, NetworkInterface, Process, ServerInfo, ServerRecord, ServerStatus};

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct VersionView {
    pub name: &'static str,
    pub version: &'static str,
}

#[derive(Debug, Serialize)]
pub struct SuccessView {
    pub success: bool,
    pub message: &'static str,
}

/// Dashboard tile values derived from the latest snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurrentMetrics {
    pub cpu: f64,
    pub memory: f64,
    pub network: f64,
    pub upload: f64,
    pub download: f64,
}

impl From<&Metrics> for CurrentMetrics {
    fn from(m: &Metrics) -> Self {
        Self {
            cpu: m.cpu,
            memory: m.memory,
            network: (m.network_in + m.network_out) / 2.0,
            upload: m.network_out,
            download: m.network_in,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerSummary {
    #[serde(flatten)]
    pub server: ServerRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_metrics: Option<CurrentMetrics>,
}

#[derive(Debug, Serialize)]
pub struct ServersView {
    pub servers: Vec<ServerSummary>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerDetail {
    pub id: String,
    pub name: String,
    pub ip: String,
    pub status: ServerStatus,
    pub os: String,
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<Metrics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info: Option<ServerInfo>,
}

impl ServerDetail {
    pub fn new(server: ServerRecord, metrics: Option<Metrics>, info: Option<ServerInfo>) -> Self {
        Self {
            id: server.id,
            name: server.name,
            ip: server.ip,
            status: server.status,
            os: server.os,
            location: server.location,
            metrics,
            info,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ServerDetailView {
    pub server: ServerDetail,
}

#[derive(Debug, Serialize)]
pub struct HistoryView {
    pub history: Vec<Metrics>,
}

#[derive(Debug, Serialize)]
pub struct DisksView {
    pub disks: Vec<Disk>,
}

#[derive(Debug, Serialize)]
pub struct ProcessesView {
    pub processes: Vec<Process>,
}

#[derive(Debug, Serialize)]
pub struct NetworkView {
    pub interfaces: Vec<NetworkInterface>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn current_metrics_averages_network_directions() {
        let mut m = Metrics::zeroed("a", Utc::now());
        m.cpu = 12.5;
        m.network_in = 3.0;
        m.network_out = 1.0;
        let c = CurrentMetrics::from(&m);
        assert_eq!(c.cpu, 12.5);
        assert_eq!(c.network, 2.0);
        assert_eq!(c.upload, 1.0);
        assert_eq!(c.download, 3.0);
    }
}
