// Pushes one AgentReport per tick to the aggregator over HTTP.
// No retry queue: a failed report is dropped and the next tick sends fresh data.

use crate::models::{AGENT_KEY_HEADER, AgentReport, REPORT_PATH, ReportAck};
use anyhow::Context;
use std::time::Duration;
use tracing::instrument;

pub struct Reporter {
    url: String,
    agent_key: String,
    client: reqwest::Client,
}

impl Reporter {
    /// `endpoint` is the aggregator base URL; `timeout` bounds each request end to end.
    pub fn new(endpoint: &str, agent_key: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "-agent/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("building HTTP client")?;
        Ok(Self {
            url: format!("{}{}", endpoint.trim_end_matches('/'), REPORT_PATH),
            agent_key: agent_key.to_string(),
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    #[instrument(skip(self, report), fields(operation = "report", server_id = %report.server_id))]
    pub async fn report(&self, report: &AgentReport) -> anyhow::Result<ReportAck> {
        let response = self
            .client
            .post(&self.url)
            .header(AGENT_KEY_HEADER, &self.agent_key)
            .json(report)
            .send()
            .await
            .context("failed to send report")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("server returned status {}: {}", status.as_u16(), body.trim());
        }
        response
            .json::<ReportAck>()
            .await
            .context("failed to decode report acknowledgement")
    }
}
