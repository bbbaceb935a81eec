// Scalar time-series row: one per collection tick per server

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Normalized snapshot. Rates are MB/s, cpu and memory are percentages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metrics {
    #[serde(default)]
    pub server_id: String,
    pub timestamp: DateTime<Utc>,
    pub cpu: f64,
    pub memory: f64,
    #[serde(default)]
    pub disk_read: f64,
    #[serde(default)]
    pub disk_write: f64,
    #[serde(default)]
    pub network_in: f64,
    #[serde(default)]
    pub network_out: f64,
}

impl Metrics {
    /// Empty snapshot at `timestamp`; every metric zero.
    pub fn zeroed(server_id: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            server_id: server_id.into(),
            timestamp,
            cpu: 0.0,
            memory: 0.0,
            disk_read: 0.0,
            disk_write: 0.0,
            network_in: 0.0,
            network_out: 0.0,
        }
    }
}
