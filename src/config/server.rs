use serde::Deserialize;
use std::time::Duration;

use super::LoggingConfig;
use crate::liveness::LivenessPolicy;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub server: ListenConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub retention: RetentionConfig,
    #[serde(default)]
    pub liveness: LivenessConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListenConfig {
    pub port: u16,
    pub host: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
    #[serde(default = "default_max_pool_size")]
    pub max_pool_size: u32,
}

fn default_max_pool_size() -> u32 {
    5
}

/// Operator (`X-API-Key`) and agent (`X-Agent-Key`) credentials.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub api_key: String,
    pub agent_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetentionConfig {
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
    #[serde(default = "default_cleanup_interval_hours")]
    pub cleanup_interval_hours: u64,
    /// Cron expression (local time) for VACUUM; none disables it.
    #[serde(default)]
    pub vacuum_schedule: Option<String>,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            retention_days: default_retention_days(),
            cleanup_interval_hours: default_cleanup_interval_hours(),
            vacuum_schedule: None,
        }
    }
}

/// One hundred years.
const MAX_RETENTION_DAYS: u32 = 36_500;
/// One year.
const MAX_CLEANUP_INTERVAL_HOURS: u64 = 8_760;

fn default_retention_days() -> u32 {
    7
}

fn default_cleanup_interval_hours() -> u64 {
    24
}

#[derive(Debug, Clone, Deserialize)]
pub struct LivenessConfig {
    #[serde(default = "default_check_interval_secs")]
    pub check_interval_secs: u64,
    #[serde(default = "default_warning_secs")]
    pub warning_secs: u64,
    #[serde(default = "default_offline_secs")]
    pub offline_secs: u64,
}

impl Default for LivenessConfig {
    fn default() -> Self {
        Self {
            check_interval_secs: default_check_interval_secs(),
            warning_secs: default_warning_secs(),
            offline_secs: default_offline_secs(),
        }
    }
}

impl LivenessConfig {
    pub fn policy(&self) -> LivenessPolicy {
        LivenessPolicy::new(
            Duration::from_secs(self.warning_secs),
            Duration::from_secs(self.offline_secs),
        )
    }
}

fn default_check_interval_secs() -> u64 {
    10
}

fn default_warning_secs() -> u64 {
    30
}

fn default_offline_secs() -> u64 {
    60
}

#[derive(Debug, Clone, Deserialize)]
pub struct IngestConfig {
    /// Advisory interval returned to agents in the report acknowledgement.
    #[serde(default = "default_next_report_interval_secs")]
    pub next_report_interval_secs: u64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            next_report_interval_secs: default_next_report_interval_secs(),
        }
    }
}

fn default_next_report_interval_secs() -> u64 {
    5
}

impl ServerConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = super::config_path("server-config.toml");
        let s = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("reading config {}: {}", path, e))?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: ServerConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.server.port > 0,
            "server.port must be between 1 and 65535, got {}",
            self.server.port
        );
        anyhow::ensure!(
            !self.database.path.is_empty(),
            "database.path must be non-empty"
        );
        anyhow::ensure!(
            self.database.max_pool_size > 0,
            "database.max_pool_size must be > 0, got {}",
            self.database.max_pool_size
        );
        anyhow::ensure!(!self.auth.api_key.is_empty(), "auth.api_key must be non-empty");
        anyhow::ensure!(
            !self.auth.agent_key.is_empty(),
            "auth.agent_key must be non-empty"
        );
        anyhow::ensure!(
            (1..=MAX_RETENTION_DAYS).contains(&self.retention.retention_days),
            "retention.retention_days must be in 1..={MAX_RETENTION_DAYS}, got {}",
            self.retention.retention_days
        );
        anyhow::ensure!(
            (1..=MAX_CLEANUP_INTERVAL_HOURS).contains(&self.retention.cleanup_interval_hours),
            "retention.cleanup_interval_hours must be in 1..={MAX_CLEANUP_INTERVAL_HOURS}, got {}",
            self.retention.cleanup_interval_hours
        );
        anyhow::ensure!(
            self.liveness.check_interval_secs > 0,
            "liveness.check_interval_secs must be > 0, got {}",
            self.liveness.check_interval_secs
        );
        anyhow::ensure!(
            self.liveness.warning_secs < self.liveness.offline_secs,
            "liveness.warning_secs ({}) must be < liveness.offline_secs ({})",
            self.liveness.warning_secs,
            self.liveness.offline_secs
        );
        anyhow::ensure!(
            self.ingest.next_report_interval_secs > 0,
            "ingest.next_report_interval_secs must be > 0, got {}",
            self.ingest.next_report_interval_secs
        );
        Ok(())
    }
}
