// Domain models shared by the agent and the server (JSON is camelCase on the wire)

mod inventory;
mod metrics;
mod report;
mod server;

pub use inventory::{Disk, NetworkInterface, Process, ServerInfo};
pub use metrics::Metrics;
pub use report::{API_KEY_HEADER, AGENT_KEY_HEADER, AgentReport, REPORT_PATH, ReportAck};
pub use server::{ServerRecord, ServerStatus, StatusUpdate};
