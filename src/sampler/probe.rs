// HostProbe backed by sysinfo, with /proc helpers where sysinfo has no counter.

use super::{HostProbe, IoCounters, MemoryReading, ProcessReading, linux};
use crate::models::Disk;
use sysinfo::{Disks, Networks, ProcessesToUpdate, System, Users};

const BYTES_PER_MB: u64 = 1024 * 1024;

pub struct SysinfoProbe {
    sys: System,
    disks: Disks,
    networks: Networks,
    users: Users,
}

impl Default for SysinfoProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl SysinfoProbe {
    pub fn new() -> Self {
        let mut sys = System::new_all();
        sys.refresh_all();
        Self {
            sys,
            disks: Disks::new_with_refreshed_list(),
            networks: Networks::new_with_refreshed_list(),
            users: Users::new_with_refreshed_list(),
        }
    }
}

impl HostProbe for SysinfoProbe {
    fn cpu_percent(&mut self) -> Option<f64> {
        // Usage is measured between consecutive refreshes; the first value after
        // startup covers the interval since `new()`.
        self.sys.refresh_cpu_usage();
        if self.sys.cpus().is_empty() {
            return None;
        }
        let usage = self.sys.global_cpu_usage() as f64;
        usage.is_finite().then_some(usage)
    }

    fn memory(&mut self) -> Option<MemoryReading> {
        self.sys.refresh_memory();
        let total = self.sys.total_memory();
        if total == 0 {
            return None;
        }
        let used = total.saturating_sub(self.sys.available_memory());
        Some(MemoryReading {
            total_bytes: total,
            used_bytes: used,
        })
    }

    fn disk_io(&mut self) -> anyhow::Result<Vec<IoCounters>> {
        linux::read_disk_io_counters()
    }

    fn network_io(&mut self) -> anyhow::Result<Vec<IoCounters>> {
        self.networks.refresh(true);
        let mut out: Vec<IoCounters> = self
            .networks
            .list()
            .iter()
            .map(|(name, data)| IoCounters {
                name: name.clone(),
                bytes_in: data.total_received(),
                bytes_out: data.total_transmitted(),
            })
            .collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(out)
    }

    fn partitions(&mut self) -> anyhow::Result<Vec<Disk>> {
        self.disks.refresh(true);
        Ok(self
            .disks
            .list()
            .iter()
            .map(|d| {
                let total = d.total_space();
                let available = d.available_space();
                let used = total.saturating_sub(available);
                let usage_percent = if total > 0 {
                    (used as f64 / total as f64) * 100.0
                } else {
                    0.0
                };
                Disk {
                    name: d.name().to_string_lossy().into_owned(),
                    mount_point: d.mount_point().to_string_lossy().into_owned(),
                    fs_type: d.file_system().to_string_lossy().into_owned(),
                    total_size: total / BYTES_PER_MB,
                    used_size: used / BYTES_PER_MB,
                    available_size: available / BYTES_PER_MB,
                    usage_percent,
                }
            })
            .collect())
    }

    fn processes(&mut self) -> anyhow::Result<Vec<ProcessReading>> {
        self.sys.refresh_processes(ProcessesToUpdate::All, true);
        self.users.refresh();
        let total_memory = self.sys.total_memory();

        let mut procs: Vec<_> = self.sys.processes().values().collect();
        procs.sort_by_key(|p| p.pid().as_u32());

        Ok(procs
            .into_iter()
            .map(|p| {
                let cpu = p.cpu_usage() as f64;
                let memory = (total_memory > 0)
                    .then(|| (p.memory() as f64 / total_memory as f64) * 100.0);
                ProcessReading {
                    pid: p.pid().as_u32(),
                    name: p.name().to_string_lossy().into_owned(),
                    cpu: cpu.is_finite().then_some(cpu),
                    memory,
                    user: p
                        .user_id()
                        .and_then(|uid| self.users.get_user_by_id(uid))
                        .map(|u| u.name().to_string())
                        .unwrap_or_default(),
                    status: p.status().to_string(),
                }
            })
            .collect())
    }

    fn cpu_cores(&self) -> u32 {
        self.sys.cpus().len() as u32
    }

    fn uptime_secs(&self) -> u64 {
        System::uptime()
    }
}
