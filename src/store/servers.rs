// Server registry, host info and the liveness read/write hooks.

use super::{MetricsStore, StoreError, StoreResult, from_ms, to_ms};
use crate::models::{ServerInfo, ServerRecord, ServerStatus, StatusUpdate};
use chrono::{DateTime, Utc};
use sqlx::Row;
use tracing::instrument;

/// Fields written on every report. `created_at` is set once on first insert.
#[derive(Debug, Clone)]
pub struct ServerUpsert {
    pub id: String,
    pub name: String,
    pub ip: String,
    pub os: String,
    pub location: String,
    pub status: ServerStatus,
    pub last_heartbeat: DateTime<Utc>,
}

const SERVER_COLUMNS: &str =
    "id, name, ip, os, location, status, last_heartbeat, created_at, updated_at";

impl MetricsStore {
    #[instrument(skip(self, s), fields(repo = "store", operation = "upsert_server", server_id = %s.id))]
    pub async fn upsert_server(&self, s: &ServerUpsert, now: DateTime<Utc>) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO servers (id, name, ip, os, location, status, last_heartbeat, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                ip = excluded.ip,
                os = excluded.os,
                location = excluded.location,
                status = excluded.status,
                last_heartbeat = excluded.last_heartbeat,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&s.id)
        .bind(&s.name)
        .bind(&s.ip)
        .bind(&s.os)
        .bind(&s.location)
        .bind(s.status.as_str())
        .bind(to_ms(s.last_heartbeat))
        .bind(to_ms(now))
        .bind(to_ms(now))
        .execute(self.pool())
        .await?;
        Ok(())
    }

    pub async fn get_server(&self, id: &str) -> StoreResult<ServerRecord> {
        let row = sqlx::query(&format!("SELECT {SERVER_COLUMNS} FROM servers WHERE id = $1"))
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        match row {
            Some(row) => parse_server_row(&row),
            None => Err(StoreError::not_found(id)),
        }
    }

    /// Fails with NotFound when the id is unknown; otherwise a no-op.
    pub async fn ensure_server(&self, id: &str) -> StoreResult<()> {
        let exists = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM servers WHERE id = $1")
            .bind(id)
            .fetch_one(self.pool())
            .await?;
        if exists == 0 {
            return Err(StoreError::not_found(id));
        }
        Ok(())
    }

    pub async fn list_servers(&self) -> StoreResult<Vec<ServerRecord>> {
        let rows = sqlx::query(&format!(
            "SELECT {SERVER_COLUMNS} FROM servers ORDER BY name ASC, id ASC"
        ))
        .fetch_all(self.pool())
        .await?;
        rows.iter().map(parse_server_row).collect()
    }

    /// Remove a server together with its history and current-state rows.
    #[instrument(skip(self), fields(repo = "store", operation = "delete_server"))]
    pub async fn delete_server(&self, id: &str) -> StoreResult<()> {
        let mut tx = self.pool().begin().await?;
        for table in [
            "metrics",
            "server_info",
            "disks",
            "processes",
            "network_interfaces",
        ] {
            sqlx::query(&format!("DELETE FROM {table} WHERE server_id = $1"))
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }
        let r = sqlx::query("DELETE FROM servers WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if r.rows_affected() == 0 {
            return Err(StoreError::not_found(id));
        }
        tx.commit().await?;
        Ok(())
    }

    /// (id, last_heartbeat) for every server that has reported at least once.
    pub async fn heartbeats(&self) -> StoreResult<Vec<(String, DateTime<Utc>)>> {
        let rows = sqlx::query(
            "SELECT id, last_heartbeat FROM servers WHERE last_heartbeat IS NOT NULL ORDER BY id",
        )
        .fetch_all(self.pool())
        .await?;
        rows.iter()
            .map(|row| -> StoreResult<(String, DateTime<Utc>)> {
                let id: String = row.try_get("id")?;
                let hb: i64 = row.try_get("last_heartbeat")?;
                Ok((id, from_ms(hb)))
            })
            .collect()
    }

    /// Write derived statuses in one transaction. Only the status column changes, and
    /// only where the stored heartbeat still equals the one the status was derived from,
    /// so an ingest landing between read and write keeps its fresh status.
    #[instrument(skip(self, updates), fields(repo = "store", operation = "set_statuses", count = updates.len()))]
    pub async fn set_statuses(&self, updates: &[StatusUpdate]) -> StoreResult<u64> {
        if updates.is_empty() {
            return Ok(0);
        }
        let mut tx = self.pool().begin().await?;
        let mut changed = 0;
        for u in updates {
            let r = sqlx::query(
                "UPDATE servers SET status = $1
                 WHERE id = $2 AND last_heartbeat = $3 AND status <> $4",
            )
            .bind(u.status.as_str())
            .bind(&u.server_id)
            .bind(to_ms(u.last_heartbeat))
            .bind(u.status.as_str())
            .execute(&mut *tx)
            .await?;
            changed += r.rows_affected();
        }
        tx.commit().await?;
        Ok(changed)
    }

    #[instrument(skip(self, info), fields(repo = "store", operation = "upsert_server_info", server_id = %info.server_id))]
    pub async fn upsert_server_info(&self, info: &ServerInfo, now: DateTime<Utc>) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO server_info (server_id, cpu_cores, total_memory, used_memory, uptime, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT(server_id) DO UPDATE SET
                cpu_cores = excluded.cpu_cores,
                total_memory = excluded.total_memory,
                used_memory = excluded.used_memory,
                uptime = excluded.uptime,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&info.server_id)
        .bind(info.cpu_cores as i64)
        .bind(info.total_memory)
        .bind(info.used_memory)
        .bind(info.uptime)
        .bind(to_ms(now))
        .execute(self.pool())
        .await?;
        Ok(())
    }

    pub async fn get_server_info(&self, server_id: &str) -> StoreResult<Option<ServerInfo>> {
        let row = sqlx::query(
            "SELECT server_id, cpu_cores, total_memory, used_memory, uptime FROM server_info WHERE server_id = $1",
        )
        .bind(server_id)
        .fetch_optional(self.pool())
        .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let cpu_cores: i64 = row.try_get("cpu_cores")?;
        Ok(Some(ServerInfo {
            server_id: row.try_get("server_id")?,
            cpu_cores: cpu_cores.clamp(0, u32::MAX as i64) as u32,
            total_memory: row.try_get("total_memory")?,
            used_memory: row.try_get("used_memory")?,
            uptime: row.try_get("uptime")?,
        }))
    }
}

fn parse_server_row(row: &sqlx::sqlite::SqliteRow) -> StoreResult<ServerRecord> {
    let status: String = row.try_get("status")?;
    let last_heartbeat: Option<i64> = row.try_get("last_heartbeat")?;
    let created_at: i64 = row.try_get("created_at")?;
    let updated_at: i64 = row.try_get("updated_at")?;
    Ok(ServerRecord {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        ip: row.try_get("ip")?,
        os: row.try_get("os")?,
        location: row.try_get("location")?,
        status: ServerStatus::from_db(&status),
        last_heartbeat: last_heartbeat.map(from_ms),
        created_at: from_ms(created_at),
        updated_at: from_ms(updated_at),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::liveness::LivenessPolicy;
    use chrono::TimeZone;

    #[tokio::test]
    async fn server_without_heartbeat_is_left_alone_by_recompute() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("servers.db");
        let store = MetricsStore::connect(path.to_str().unwrap(), 1).await.unwrap();
        store.init().await.unwrap();

        let created = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        sqlx::query(
            "INSERT INTO servers (id, name, ip, status, last_heartbeat, created_at, updated_at)
             VALUES ('quiet', 'quiet', '10.0.0.9', 'warning', NULL, $1, $1)",
        )
        .bind(to_ms(created))
        .execute(store.pool())
        .await
        .unwrap();

        assert!(store.heartbeats().await.unwrap().is_empty());
        let now = created + chrono::TimeDelta::days(1);
        let changed = crate::liveness_worker::recompute(&store, &LivenessPolicy::default(), now)
            .await
            .unwrap();
        assert_eq!(changed, 0);

        let server = store.get_server("quiet").await.unwrap();
        assert_eq!(server.status, ServerStatus::Warning);
        assert_eq!(server.last_heartbeat, None);
    }
}
