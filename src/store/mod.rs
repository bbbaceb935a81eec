// SQLite persistence. `metrics` is the append-only time series; servers, server_info
// and the detail tables hold current state only.
// Timestamps are stored as INTEGER milliseconds since the Unix epoch.

mod details;
mod error;
mod servers;

pub use details::ProcessSort;
pub use error::{StoreError, StoreResult};
pub use servers::ServerUpsert;

use crate::models::Metrics;
use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use tracing::instrument;

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS servers (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        ip TEXT NOT NULL,
        os TEXT NOT NULL DEFAULT '',
        location TEXT NOT NULL DEFAULT '',
        status TEXT NOT NULL DEFAULT 'offline',
        last_heartbeat INTEGER,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS metrics (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        server_id TEXT NOT NULL,
        timestamp INTEGER NOT NULL,
        cpu REAL NOT NULL,
        memory REAL NOT NULL,
        disk_read REAL NOT NULL,
        disk_write REAL NOT NULL,
        network_in REAL NOT NULL,
        network_out REAL NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_metrics_server_time ON metrics(server_id, timestamp)",
    "CREATE INDEX IF NOT EXISTS idx_metrics_time ON metrics(timestamp)",
    r#"
    CREATE TABLE IF NOT EXISTS server_info (
        server_id TEXT PRIMARY KEY,
        cpu_cores INTEGER NOT NULL,
        total_memory INTEGER NOT NULL,
        used_memory INTEGER NOT NULL,
        uptime INTEGER NOT NULL,
        updated_at INTEGER NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS disks (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        server_id TEXT NOT NULL,
        name TEXT NOT NULL,
        mount_point TEXT NOT NULL,
        fs_type TEXT NOT NULL,
        total_size INTEGER NOT NULL,
        used_size INTEGER NOT NULL,
        available_size INTEGER NOT NULL,
        usage_percent REAL NOT NULL,
        updated_at INTEGER NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_disks_server ON disks(server_id)",
    r#"
    CREATE TABLE IF NOT EXISTS processes (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        server_id TEXT NOT NULL,
        pid INTEGER NOT NULL,
        name TEXT NOT NULL,
        cpu REAL NOT NULL,
        memory REAL NOT NULL,
        username TEXT NOT NULL,
        status TEXT NOT NULL,
        updated_at INTEGER NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_processes_server ON processes(server_id)",
    r#"
    CREATE TABLE IF NOT EXISTS network_interfaces (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        server_id TEXT NOT NULL,
        name TEXT NOT NULL,
        type TEXT NOT NULL,
        upload_speed REAL NOT NULL,
        download_speed REAL NOT NULL,
        total_upload INTEGER NOT NULL,
        total_download INTEGER NOT NULL,
        status TEXT NOT NULL,
        updated_at INTEGER NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_network_interfaces_server ON network_interfaces(server_id)",
];

const METRICS_COLUMNS: &str =
    "server_id, timestamp, cpu, memory, disk_read, disk_write, network_in, network_out";

pub(crate) fn to_ms(t: DateTime<Utc>) -> i64 {
    t.timestamp_millis()
}

pub(crate) fn from_ms(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or(DateTime::UNIX_EPOCH)
}

pub struct MetricsStore {
    pool: SqlitePool,
}

impl MetricsStore {
    /// Connect to SQLite at `path`, create parent dir and DB if missing, enable WAL + pragmas.
    pub async fn connect(path: &str, max_connections: u32) -> anyhow::Result<Self> {
        if let Some(parent) = Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}", path))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .busy_timeout(std::time::Duration::from_secs(5))
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(opts)
            .await?;
        Ok(Self { pool })
    }

    /// Create tables and indexes. Safe to call repeatedly.
    pub async fn init(&self) -> StoreResult<()> {
        for stmt in SCHEMA {
            sqlx::query(stmt).execute(&self.pool).await?;
        }
        Ok(())
    }

    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Pure insert: no dedup, duplicate timestamps produce additional rows.
    #[instrument(skip(self, m), fields(repo = "store", operation = "append", server_id = %m.server_id))]
    pub async fn append(&self, m: &Metrics) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO metrics (server_id, timestamp, cpu, memory, disk_read, disk_write, network_in, network_out)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(&m.server_id)
        .bind(to_ms(m.timestamp))
        .bind(m.cpu)
        .bind(m.memory)
        .bind(m.disk_read)
        .bind(m.disk_write)
        .bind(m.network_in)
        .bind(m.network_out)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Most recent snapshot for the server, by timestamp then insertion order.
    pub async fn latest(&self, server_id: &str) -> StoreResult<Option<Metrics>> {
        let row = sqlx::query(&format!(
            "SELECT {METRICS_COLUMNS} FROM metrics WHERE server_id = $1
             ORDER BY timestamp DESC, id DESC LIMIT 1"
        ))
        .bind(server_id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(parse_metrics_row).transpose()
    }

    /// Snapshots with timestamp >= `since`, ascending.
    #[instrument(skip(self), fields(repo = "store", operation = "range"))]
    pub async fn range(&self, server_id: &str, since: DateTime<Utc>) -> StoreResult<Vec<Metrics>> {
        let rows = sqlx::query(&format!(
            "SELECT {METRICS_COLUMNS} FROM metrics WHERE server_id = $1 AND timestamp >= $2
             ORDER BY timestamp ASC, id ASC"
        ))
        .bind(server_id)
        .bind(to_ms(since))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(parse_metrics_row).collect()
    }

    /// Delete time-series rows strictly older than `older_than`. Detail tables are untouched.
    #[instrument(skip(self), fields(repo = "store", operation = "prune"))]
    pub async fn prune(&self, older_than: DateTime<Utc>) -> StoreResult<u64> {
        let r = sqlx::query("DELETE FROM metrics WHERE timestamp < $1")
            .bind(to_ms(older_than))
            .execute(&self.pool)
            .await?;
        Ok(r.rows_affected())
    }

    pub async fn metrics_count(&self, server_id: &str) -> StoreResult<i64> {
        let n = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM metrics WHERE server_id = $1")
            .bind(server_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(n)
    }

    /// Reclaim space after deletes (run periodically after pruning).
    #[instrument(skip(self), fields(repo = "store", operation = "vacuum"))]
    pub async fn vacuum(&self) -> StoreResult<()> {
        sqlx::query("VACUUM").execute(&self.pool).await?;
        Ok(())
    }
}

fn parse_metrics_row(row: &sqlx::sqlite::SqliteRow) -> StoreResult<Metrics> {
    let timestamp: i64 = row.try_get("timestamp")?;
    Ok(Metrics {
        server_id: row.try_get("server_id")?,
        timestamp: from_ms(timestamp),
        cpu: row.try_get("cpu")?,
        memory: row.try_get("memory")?,
        disk_read: row.try_get("disk_read")?,
        disk_write: row.try_get("disk_write")?,
        network_in: row.try_get("network_in")?,
        network_out: row.try_get("network_out")?,
    })
}
