// HTTP routes: agent ingest, operator query API and version

mod auth;
mod error;
mod http;
mod params;
mod views;

pub use error::ApiError;
pub use params::{ClientIp, client_ip, parse_window};
pub use views::CurrentMetrics;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::config::{AuthConfig, ServerConfig};
use crate::store::MetricsStore;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) store: Arc<MetricsStore>,
    pub(crate) auth: Arc<AuthConfig>,
    pub(crate) next_report_interval_secs: u64,
}

pub fn app(store: Arc<MetricsStore>, config: &ServerConfig) -> Router {
    let state = AppState {
        store,
        auth: Arc::new(config.auth.clone()),
        next_report_interval_secs: config.ingest.next_report_interval_secs,
    };

    let agent = Router::new()
        .route("/api/v1/agent/report", post(http::agent_report)) // POST /api/v1/agent/report
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_agent_key,
        ));

    let api = Router::new()
        .route("/api/v1/auth/verify", post(http::verify))
        .route("/api/v1/servers", get(http::list_servers))
        .route(
            "/api/v1/servers/{id}",
            get(http::server_detail).delete(http::delete_server),
        )
        .route("/api/v1/servers/{id}/history", get(http::history))
        .route("/api/v1/servers/{id}/disks", get(http::disks))
        .route("/api/v1/servers/{id}/processes", get(http::processes))
        .route("/api/v1/servers/{id}/network", get(http::network))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_api_key,
        ));

    Router::new()
        .route("/version", get(http::version_handler)) // GET /version
        .merge(agent)
        .merge(api)
        .layer(middleware::from_fn(params::record_client_ip))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
