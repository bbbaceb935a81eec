// TOML configuration for both binaries. Parsing and validation only; callers
// receive plain values.

mod agent;
mod server;

pub use agent::{AgentApiConfig, AgentConfig, AgentIdentity, ReportingConfig};
pub use server::{
    AuthConfig, DatabaseConfig, IngestConfig, ListenConfig, LivenessConfig, RetentionConfig,
    ServerConfig,
};

use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when RUST_LOG is unset (e.g. "info", "hostwatch=debug").
    #[serde(default)]
    pub level: Option<String>,
}

/// Config file path: first CLI argument, else CONFIG_FILE, else `default`.
pub fn config_path(default: &str) -> String {
    std::env::args()
        .nth(1)
        .or_else(|| std::env::var("CONFIG_FILE").ok())
        .unwrap_or_else(|| default.into())
}
