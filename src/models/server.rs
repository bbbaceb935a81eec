// Server registry row and its derived liveness status

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Liveness status; serializes to lowercase JSON (e.g. "online").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerStatus {
    Online,
    Warning,
    #[default]
    Offline,
}

impl ServerStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ServerStatus::Online => "online",
            ServerStatus::Warning => "warning",
            ServerStatus::Offline => "offline",
        }
    }

    /// Parse the stored column value; anything unrecognised reads as offline.
    pub fn from_db(s: &str) -> Self {
        match s {
            "online" => ServerStatus::Online,
            "warning" => ServerStatus::Warning,
            _ => ServerStatus::Offline,
        }
    }
}

impl std::fmt::Display for ServerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerRecord {
    pub id: String,
    pub name: String,
    pub ip: String,
    pub os: String,
    pub location: String,
    pub status: ServerStatus,
    pub last_heartbeat: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A derived status together with the heartbeat it was derived from. The write is
/// skipped if the stored heartbeat has moved on since it was read.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusUpdate {
    pub server_id: String,
    pub last_heartbeat: DateTime<Utc>,
    pub status: ServerStatus,
}
