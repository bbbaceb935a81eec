// Server-side handling of one agent report: registry upsert, time-series append,
// host info upsert and the detail-table swaps.

use crate::models::{AgentReport, ServerStatus};
use crate::store::{MetricsStore, ServerUpsert, StoreResult};
use chrono::{DateTime, Utc};
use tracing::instrument;

const UNKNOWN_OS: &str = "Unknown";
const UNKNOWN_LOCATION: &str = "unknown";

/// Registry fields derived from a report, with empty strings replaced by defaults.
pub fn server_upsert(report: &AgentReport, client_ip: &str) -> ServerUpsert {
    ServerUpsert {
        id: report.server_id.clone(),
        name: non_empty_or(&report.server_name, &report.server_id),
        ip: client_ip.to_string(),
        os: non_empty_or(&report.os, UNKNOWN_OS),
        location: non_empty_or(&report.location, UNKNOWN_LOCATION),
        status: ServerStatus::Online,
        last_heartbeat: report.timestamp,
    }
}

fn non_empty_or(value: &str, fallback: &str) -> String {
    if value.trim().is_empty() {
        fallback.to_string()
    } else {
        value.to_string()
    }
}

/// Persist one report. Detail collections are only swapped when the agent sent a
/// non-empty set, so a category that failed to read on the agent keeps its last state.
#[instrument(skip(store, report), fields(operation = "ingest_report", server_id = %report.server_id))]
pub async fn ingest_report(
    store: &MetricsStore,
    report: AgentReport,
    client_ip: &str,
    now: DateTime<Utc>,
) -> StoreResult<()> {
    store
        .upsert_server(&server_upsert(&report, client_ip), now)
        .await?;

    let AgentReport {
        server_id,
        mut metrics,
        mut info,
        disks,
        processes,
        network,
        ..
    } = report;

    metrics.server_id = server_id.clone();
    store.append(&metrics).await?;

    info.server_id = server_id.clone();
    store.upsert_server_info(&info, now).await?;

    if !disks.is_empty() {
        store.replace_disks(&server_id, &disks, now).await?;
    }
    if !processes.is_empty() {
        store.replace_processes(&server_id, &processes, now).await?;
    }
    if !network.is_empty() {
        store
            .replace_network_interfaces(&server_id, &network, now)
            .await?;
    }
    tracing::debug!(
        disks = disks.len(),
        processes = processes.len(),
        interfaces = network.len(),
        "report stored"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Metrics, ServerInfo};

    fn report(name: &str, os: &str, location: &str) -> AgentReport {
        let ts = Utc::now();
        AgentReport {
            server_id: "srv-1".into(),
            server_name: name.into(),
            os: os.into(),
            location: location.into(),
            timestamp: ts,
            metrics: Metrics::zeroed("", ts),
            info: ServerInfo::default(),
            disks: vec![],
            processes: vec![],
            network: vec![],
        }
    }

    #[test]
    fn empty_identity_fields_fall_back() {
        let u = server_upsert(&report("", "", ""), "10.0.0.7");
        assert_eq!(u.name, "srv-1");
        assert_eq!(u.os, "Unknown");
        assert_eq!(u.location, "unknown");
        assert_eq!(u.ip, "10.0.0.7");
        assert_eq!(u.status, ServerStatus::Online);
    }

    #[test]
    fn provided_identity_fields_are_kept() {
        let r = report("web-01", "linux", "eu-west");
        let u = server_upsert(&r, "10.0.0.7");
        assert_eq!(u.name, "web-01");
        assert_eq!(u.os, "linux");
        assert_eq!(u.location, "eu-west");
        assert_eq!(u.last_heartbeat, r.timestamp);
    }
}
