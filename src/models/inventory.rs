// Current-state host inventory. Stored replace-on-write, never as history.

use serde::{Deserialize, Serialize};

/// Static-ish host facts; memory in MB, uptime in seconds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerInfo {
    #[serde(default)]
    pub server_id: String,
    pub cpu_cores: u32,
    pub total_memory: i64,
    pub used_memory: i64,
    pub uptime: i64,
}

/// Mounted partition; sizes in MB.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Disk {
    pub name: String,
    pub mount_point: String,
    pub fs_type: String,
    pub total_size: u64,
    pub used_size: u64,
    pub available_size: u64,
    pub usage_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Process {
    pub pid: u32,
    pub name: String,
    pub cpu: f64,
    pub memory: f64,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub status: String,
}

/// Per-interface rates (MB/s) and lifetime totals (MB).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInterface {
    pub name: String,
    #[serde(rename = "type")]
    pub type_: String,
    pub upload_speed: f64,
    pub download_speed: f64,
    pub total_upload: u64,
    pub total_download: u64,
    pub status: String,
}
