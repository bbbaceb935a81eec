// HTTP handlers: agent ingest and the operator query API.

use axum::{
    Extension, Json,
    extract::{Path, Query, State, rejection::JsonRejection},
};
use chrono::Utc;
use serde::Deserialize;

use super::AppState;
use super::error::ApiError;
use super::params::{ClientIp, DEFAULT_HISTORY_WINDOW, parse_limit, parse_window};
use super::views::{
    CurrentMetrics, DisksView, HistoryView, NetworkView, ProcessesView, ServerDetail,
    ServerDetailView, ServerSummary, ServersView, SuccessView, VersionView,
};
use crate::ingest;
use crate::models::{AgentReport, ReportAck};
use crate::store::ProcessSort;
use crate::version::{NAME, VERSION};

/// GET /version: service name and version (from Cargo.toml at build time).
pub(super) async fn version_handler() -> Json<VersionView> {
    Json(VersionView {
        name: NAME,
        version: VERSION,
    })
}

/// POST /api/v1/agent/report
pub(super) async fn agent_report(
    State(state): State<AppState>,
    Extension(ClientIp(ip)): Extension<ClientIp>,
    payload: Result<Json<AgentReport>, JsonRejection>,
) -> Result<Json<ReportAck>, ApiError> {
    let Json(report) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    if report.server_id.trim().is_empty() {
        return Err(ApiError::BadRequest("serverId is required".into()));
    }
    ingest::ingest_report(&state.store, report, &ip, Utc::now()).await?;
    Ok(Json(ReportAck {
        success: true,
        next_report_interval: state.next_report_interval_secs,
    }))
}

/// POST /api/v1/auth/verify. Reaching the handler means the key was accepted.
pub(super) async fn verify() -> Json<SuccessView> {
    Json(SuccessView {
        success: true,
        message: "API key is valid",
    })
}

/// GET /api/v1/servers
pub(super) async fn list_servers(
    State(state): State<AppState>,
) -> Result<Json<ServersView>, ApiError> {
    let records = state.store.list_servers().await?;
    let mut servers = Vec::with_capacity(records.len());
    for server in records {
        let current_metrics = state
            .store
            .latest(&server.id)
            .await?
            .as_ref()
            .map(CurrentMetrics::from);
        servers.push(ServerSummary {
            server,
            current_metrics,
        });
    }
    Ok(Json(ServersView { servers }))
}

/// GET /api/v1/servers/{id}
pub(super) async fn server_detail(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ServerDetailView>, ApiError> {
    let server = state.store.get_server(&id).await?;
    let metrics = state.store.latest(&id).await?;
    let info = state.store.get_server_info(&id).await?;
    Ok(Json(ServerDetailView {
        server: ServerDetail::new(server, metrics, info),
    }))
}

/// DELETE /api/v1/servers/{id}
pub(super) async fn delete_server(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SuccessView>, ApiError> {
    state.store.delete_server(&id).await?;
    tracing::info!(server_id = %id, "server deleted");
    Ok(Json(SuccessView {
        success: true,
        message: "Server deleted",
    }))
}

#[derive(Debug, Deserialize)]
pub(super) struct HistoryQuery {
    duration: Option<String>,
}

/// GET /api/v1/servers/{id}/history?duration=20m
pub(super) async fn history(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(q): Query<HistoryQuery>,
) -> Result<Json<HistoryView>, ApiError> {
    let raw = q
        .duration
        .filter(|d| !d.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_HISTORY_WINDOW.to_string());
    let window = parse_window(&raw)
        .and_then(|w| chrono::Duration::from_std(w).ok())
        .ok_or_else(|| ApiError::BadRequest(format!("Invalid duration: {}", raw)))?;
    state.store.ensure_server(&id).await?;
    let since = Utc::now()
        .checked_sub_signed(window)
        .unwrap_or(chrono::DateTime::UNIX_EPOCH);
    let history = state.store.range(&id, since).await?;
    Ok(Json(HistoryView { history }))
}

/// GET /api/v1/servers/{id}/disks
pub(super) async fn disks(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DisksView>, ApiError> {
    state.store.ensure_server(&id).await?;
    let disks = state.store.disks(&id).await?;
    Ok(Json(DisksView { disks }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ProcessQuery {
    sort_by: Option<String>,
    limit: Option<String>,
}

/// GET /api/v1/servers/{id}/processes?sortBy=cpu|memory&limit=20
pub(super) async fn processes(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(q): Query<ProcessQuery>,
) -> Result<Json<ProcessesView>, ApiError> {
    let sort = q
        .sort_by
        .as_deref()
        .map(ProcessSort::from_query)
        .unwrap_or_default();
    let limit = parse_limit(q.limit.as_deref());
    state.store.ensure_server(&id).await?;
    let processes = state.store.processes(&id, sort, limit).await?;
    Ok(Json(ProcessesView { processes }))
}

/// GET /api/v1/servers/{id}/network
pub(super) async fn network(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<NetworkView>, ApiError> {
    state.store.ensure_server(&id).await?;
    let interfaces = state.store.network_interfaces(&id).await?;
    Ok(Json(NetworkView { interfaces }))
}
