// Library for both binaries and the integration tests

pub mod agent_worker;
pub mod config;
pub mod ingest;
pub mod liveness;
pub mod liveness_worker;
pub mod logging;
pub mod models;
pub mod rate;
pub mod reporter;
pub mod retention_worker;
pub mod routes;
pub mod sampler;
pub mod store;
pub mod version;
