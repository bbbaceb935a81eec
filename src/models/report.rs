// Agent -> server payload and the server's acknowledgement

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Disk, Metrics, NetworkInterface, Process, ServerInfo};

/// Ingest path on the aggregator, relative to its base URL.
pub const REPORT_PATH: &str = "/api/v1/agent/report";
/// Header carrying the agent credential.
pub const AGENT_KEY_HEADER: &str = "X-Agent-Key";
/// Header carrying the operator credential for the query surface.
pub const API_KEY_HEADER: &str = "X-API-Key";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentReport {
    pub server_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub server_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub os: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub location: String,
    pub timestamp: DateTime<Utc>,
    pub metrics: Metrics,
    pub info: ServerInfo,
    #[serde(default)]
    pub disks: Vec<Disk>,
    #[serde(default)]
    pub processes: Vec<Process>,
    #[serde(default)]
    pub network: Vec<NetworkInterface>,
}

/// Response to a successful ingest. The interval is advisory only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportAck {
    pub success: bool,
    pub next_report_interval: u64,
}
