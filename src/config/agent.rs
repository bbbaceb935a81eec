use serde::Deserialize;

use super::LoggingConfig;

#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    pub server: AgentIdentity,
    pub api: AgentApiConfig,
    #[serde(default)]
    pub reporting: ReportingConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// How this host identifies itself to the aggregator.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentIdentity {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AgentApiConfig {
    /// Base URL of the aggregator, e.g. "http://monitor:8080".
    pub endpoint: String,
    pub agent_key: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    10
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportingConfig {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_process_limit")]
    pub process_limit: usize,
}

impl Default for ReportingConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            process_limit: default_process_limit(),
        }
    }
}

fn default_interval_secs() -> u64 {
    5
}

fn default_process_limit() -> usize {
    20
}

impl AgentConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = super::config_path("agent-config.toml");
        let s = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("reading config {}: {}", path, e))?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AgentConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(!self.server.id.is_empty(), "server.id must be non-empty");
        anyhow::ensure!(
            self.api.endpoint.starts_with("http://") || self.api.endpoint.starts_with("https://"),
            "api.endpoint must be an http(s) URL, got {:?}",
            self.api.endpoint
        );
        anyhow::ensure!(!self.api.agent_key.is_empty(), "api.agent_key must be non-empty");
        anyhow::ensure!(
            self.api.timeout_secs > 0,
            "api.timeout_secs must be > 0, got {}",
            self.api.timeout_secs
        );
        anyhow::ensure!(
            self.reporting.interval_secs > 0,
            "reporting.interval_secs must be > 0, got {}",
            self.reporting.interval_secs
        );
        Ok(())
    }
}
