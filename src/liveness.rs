// Liveness derivation: online/warning/offline from heartbeat age alone.

use crate::models::{ServerStatus, StatusUpdate};
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Age thresholds. Both comparisons are strict: an age equal to a threshold
/// stays in the healthier state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LivenessPolicy {
    pub warning_after: Duration,
    pub offline_after: Duration,
}

impl Default for LivenessPolicy {
    fn default() -> Self {
        Self {
            warning_after: Duration::from_secs(30),
            offline_after: Duration::from_secs(60),
        }
    }
}

impl LivenessPolicy {
    pub fn new(warning_after: Duration, offline_after: Duration) -> Self {
        Self {
            warning_after,
            offline_after,
        }
    }

    pub fn status_for_age(&self, age: Duration) -> ServerStatus {
        if age > self.offline_after {
            ServerStatus::Offline
        } else if age > self.warning_after {
            ServerStatus::Warning
        } else {
            ServerStatus::Online
        }
    }

    /// Heartbeats in the future (clock skew) count as age zero.
    pub fn status_at(&self, last_heartbeat: DateTime<Utc>, now: DateTime<Utc>) -> ServerStatus {
        let age = (now - last_heartbeat).to_std().unwrap_or(Duration::ZERO);
        self.status_for_age(age)
    }

    /// Status for every (id, heartbeat) pair; same inputs always give the same output.
    /// Each update carries the heartbeat it was derived from.
    pub fn derive_all(
        &self,
        heartbeats: &[(String, DateTime<Utc>)],
        now: DateTime<Utc>,
    ) -> Vec<StatusUpdate> {
        heartbeats
            .iter()
            .map(|(id, hb)| StatusUpdate {
                server_id: id.clone(),
                last_heartbeat: *hb,
                status: self.status_at(*hb, now),
            })
            .collect()
    }
}
