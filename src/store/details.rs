// Replace-on-write detail tables: each call swaps a server's full set atomically.

use super::{MetricsStore, StoreResult, to_ms};
use crate::models::{Disk, NetworkInterface, Process};
use chrono::{DateTime, Utc};
use sqlx::Row;
use tracing::instrument;

/// Ordering for the process listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcessSort {
    #[default]
    Cpu,
    Memory,
}

impl ProcessSort {
    /// "memory" sorts by memory; anything else by CPU.
    pub fn from_query(s: &str) -> Self {
        if s.eq_ignore_ascii_case("memory") {
            ProcessSort::Memory
        } else {
            ProcessSort::Cpu
        }
    }

    fn order_by(self) -> &'static str {
        match self {
            ProcessSort::Cpu => "cpu DESC, id ASC",
            ProcessSort::Memory => "memory DESC, id ASC",
        }
    }
}

impl MetricsStore {
    #[instrument(skip(self, disks), fields(repo = "store", operation = "replace_disks", count = disks.len()))]
    pub async fn replace_disks(
        &self,
        server_id: &str,
        disks: &[Disk],
        now: DateTime<Utc>,
    ) -> StoreResult<()> {
        let mut tx = self.pool().begin().await?;
        sqlx::query("DELETE FROM disks WHERE server_id = $1")
            .bind(server_id)
            .execute(&mut *tx)
            .await?;
        for d in disks {
            sqlx::query(
                "INSERT INTO disks (server_id, name, mount_point, fs_type, total_size, used_size, available_size, usage_percent, updated_at)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
            )
            .bind(server_id)
            .bind(&d.name)
            .bind(&d.mount_point)
            .bind(&d.fs_type)
            .bind(d.total_size as i64)
            .bind(d.used_size as i64)
            .bind(d.available_size as i64)
            .bind(d.usage_percent)
            .bind(to_ms(now))
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    pub async fn disks(&self, server_id: &str) -> StoreResult<Vec<Disk>> {
        let rows = sqlx::query(
            "SELECT name, mount_point, fs_type, total_size, used_size, available_size, usage_percent
             FROM disks WHERE server_id = $1 ORDER BY id ASC",
        )
        .bind(server_id)
        .fetch_all(self.pool())
        .await?;
        rows.iter()
            .map(|row| -> StoreResult<Disk> {
                Ok(Disk {
                    name: row.try_get("name")?,
                    mount_point: row.try_get("mount_point")?,
                    fs_type: row.try_get("fs_type")?,
                    total_size: row.try_get::<i64, _>("total_size")?.max(0) as u64,
                    used_size: row.try_get::<i64, _>("used_size")?.max(0) as u64,
                    available_size: row.try_get::<i64, _>("available_size")?.max(0) as u64,
                    usage_percent: row.try_get("usage_percent")?,
                })
            })
            .collect()
    }

    #[instrument(skip(self, processes), fields(repo = "store", operation = "replace_processes", count = processes.len()))]
    pub async fn replace_processes(
        &self,
        server_id: &str,
        processes: &[Process],
        now: DateTime<Utc>,
    ) -> StoreResult<()> {
        let mut tx = self.pool().begin().await?;
        sqlx::query("DELETE FROM processes WHERE server_id = $1")
            .bind(server_id)
            .execute(&mut *tx)
            .await?;
        for p in processes {
            sqlx::query(
                "INSERT INTO processes (server_id, pid, name, cpu, memory, username, status, updated_at)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
            )
            .bind(server_id)
            .bind(p.pid as i64)
            .bind(&p.name)
            .bind(p.cpu)
            .bind(p.memory)
            .bind(&p.user)
            .bind(&p.status)
            .bind(to_ms(now))
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    pub async fn processes(
        &self,
        server_id: &str,
        sort: ProcessSort,
        limit: u32,
    ) -> StoreResult<Vec<Process>> {
        let rows = sqlx::query(&format!(
            "SELECT pid, name, cpu, memory, username, status FROM processes
             WHERE server_id = $1 ORDER BY {} LIMIT $2",
            sort.order_by()
        ))
        .bind(server_id)
        .bind(limit as i64)
        .fetch_all(self.pool())
        .await?;
        rows.iter()
            .map(|row| -> StoreResult<Process> {
                Ok(Process {
                    pid: row.try_get::<i64, _>("pid")?.max(0) as u32,
                    name: row.try_get("name")?,
                    cpu: row.try_get("cpu")?,
                    memory: row.try_get("memory")?,
                    user: row.try_get("username")?,
                    status: row.try_get("status")?,
                })
            })
            .collect()
    }

    #[instrument(skip(self, interfaces), fields(repo = "store", operation = "replace_network_interfaces", count = interfaces.len()))]
    pub async fn replace_network_interfaces(
        &self,
        server_id: &str,
        interfaces: &[NetworkInterface],
        now: DateTime<Utc>,
    ) -> StoreResult<()> {
        let mut tx = self.pool().begin().await?;
        sqlx::query("DELETE FROM network_interfaces WHERE server_id = $1")
            .bind(server_id)
            .execute(&mut *tx)
            .await?;
        for i in interfaces {
            sqlx::query(
                "INSERT INTO network_interfaces (server_id, name, type, upload_speed, download_speed, total_upload, total_download, status, updated_at)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
            )
            .bind(server_id)
            .bind(&i.name)
            .bind(&i.type_)
            .bind(i.upload_speed)
            .bind(i.download_speed)
            .bind(i.total_upload as i64)
            .bind(i.total_download as i64)
            .bind(&i.status)
            .bind(to_ms(now))
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    pub async fn network_interfaces(&self, server_id: &str) -> StoreResult<Vec<NetworkInterface>> {
        let rows = sqlx::query(
            "SELECT name, type, upload_speed, download_speed, total_upload, total_download, status
             FROM network_interfaces WHERE server_id = $1 ORDER BY id ASC",
        )
        .bind(server_id)
        .fetch_all(self.pool())
        .await?;
        rows.iter()
            .map(|row| -> StoreResult<NetworkInterface> {
                Ok(NetworkInterface {
                    name: row.try_get("name")?,
                    type_: row.try_get("type")?,
                    upload_speed: row.try_get("upload_speed")?,
                    download_speed: row.try_get("download_speed")?,
                    total_upload: row.try_get::<i64, _>("total_upload")?.max(0) as u64,
                    total_download: row.try_get::<i64, _>("total_download")?.max(0) as u64,
                    status: row.try_get("status")?,
                })
            })
            .collect()
    }
}
