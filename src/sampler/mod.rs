// Per-tick host sampling: instantaneous gauges plus counter-derived rates.
// OS access goes through HostProbe so the rate pipeline can be driven by scripted readings.

mod linux;
mod probe;

pub use probe::SysinfoProbe;

use crate::models::{Disk, Metrics, NetworkInterface, Process, ServerInfo};
use crate::rate::{Rate, RateTracker, RateUnit};
use chrono::{DateTime, Utc};
use std::time::Instant;

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Memory totals in bytes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MemoryReading {
    pub total_bytes: u64,
    pub used_bytes: u64,
}

impl MemoryReading {
    pub fn used_percent(&self) -> f64 {
        if self.total_bytes == 0 {
            0.0
        } else {
            (self.used_bytes as f64 / self.total_bytes as f64) * 100.0
        }
    }
}

/// Cumulative byte counters for one device or interface.
/// `bytes_in` is read/received, `bytes_out` is written/sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IoCounters {
    pub name: String,
    pub bytes_in: u64,
    pub bytes_out: u64,
}

/// One process as enumerated by the probe. `None` means the value could not be read.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessReading {
    pub pid: u32,
    pub name: String,
    pub cpu: Option<f64>,
    pub memory: Option<f64>,
    pub user: String,
    pub status: String,
}

/// Raw OS reads. Each call is one point-in-time read; failures are per category.
pub trait HostProbe: Send {
    fn cpu_percent(&mut self) -> Option<f64>;
    fn memory(&mut self) -> Option<MemoryReading>;
    fn disk_io(&mut self) -> anyhow::Result<Vec<IoCounters>>;
    fn network_io(&mut self) -> anyhow::Result<Vec<IoCounters>>;
    fn partitions(&mut self) -> anyhow::Result<Vec<Disk>>;
    /// Processes in enumeration order.
    fn processes(&mut self) -> anyhow::Result<Vec<ProcessReading>>;
    fn cpu_cores(&self) -> u32;
    fn uptime_secs(&self) -> u64;
}

/// Everything gathered in one tick.
#[derive(Debug, Clone)]
pub struct Collection {
    pub metrics: Metrics,
    pub info: ServerInfo,
    pub disks: Vec<Disk>,
    pub processes: Vec<Process>,
    pub network: Vec<NetworkInterface>,
}

pub struct Sampler<P> {
    probe: P,
    process_limit: usize,
    disk_devices: RateTracker,
    interfaces: RateTracker,
}

impl<P: HostProbe> Sampler<P> {
    pub fn new(probe: P, process_limit: usize) -> Self {
        Self {
            probe,
            process_limit,
            disk_devices: RateTracker::new(RateUnit::MebibytesPerSec),
            interfaces: RateTracker::new(RateUnit::MebibytesPerSec),
        }
    }

    pub fn collect(&mut self, server_id: &str) -> anyhow::Result<Collection> {
        self.collect_at(server_id, Instant::now(), Utc::now())
    }

    /// One collection tick. `now` drives rate math, `timestamp` is stamped on the snapshot.
    pub fn collect_at(
        &mut self,
        server_id: &str,
        now: Instant,
        timestamp: DateTime<Utc>,
    ) -> anyhow::Result<Collection> {
        let cpu = self.probe.cpu_percent();
        let memory = self.probe.memory();
        if cpu.is_none() && memory.is_none() {
            anyhow::bail!("neither CPU nor memory could be read");
        }
        if cpu.is_none() {
            tracing::warn!(operation = "cpu_percent", "CPU usage unavailable, reporting 0");
        }
        if memory.is_none() {
            tracing::warn!(operation = "memory", "memory usage unavailable, reporting 0");
        }

        let mut metrics = Metrics::zeroed(server_id, timestamp);
        metrics.cpu = cpu.unwrap_or(0.0).clamp(0.0, 100.0);
        metrics.memory = memory.map(|m| m.used_percent()).unwrap_or(0.0);

        let disk_rate = self.disk_rate(now);
        metrics.disk_read = disk_rate.rate_in;
        metrics.disk_write = disk_rate.rate_out;

        let (total_rate, network) = self.network_rates(now);
        metrics.network_in = total_rate.rate_in;
        metrics.network_out = total_rate.rate_out;

        let info = ServerInfo {
            server_id: server_id.to_string(),
            cpu_cores: self.probe.cpu_cores(),
            total_memory: memory.map(|m| (m.total_bytes / BYTES_PER_MB) as i64).unwrap_or(0),
            used_memory: memory.map(|m| (m.used_bytes / BYTES_PER_MB) as i64).unwrap_or(0),
            uptime: self.probe.uptime_secs() as i64,
        };

        let disks = self.probe.partitions().unwrap_or_else(|e| {
            tracing::warn!(error = %e, operation = "partitions", "partition list unavailable");
            Vec::new()
        });

        let processes = match self.probe.processes() {
            Ok(readings) => top_by_cpu(readings, self.process_limit),
            Err(e) => {
                tracing::warn!(error = %e, operation = "processes", "process list unavailable");
                Vec::new()
            }
        };

        Ok(Collection {
            metrics,
            info,
            disks,
            processes,
            network,
        })
    }

    /// Sum of per-device rates. Devices are tracked individually so a device
    /// appearing mid-run starts from its own baseline instead of inflating the total.
    /// A device missing from a successful read loses its baseline.
    fn disk_rate(&mut self, now: Instant) -> Rate {
        let devices = match self.probe.disk_io() {
            Ok(d) => d,
            Err(e) => {
                tracing::warn!(error = %e, operation = "disk_io", "disk I/O counters unavailable");
                return Rate::ZERO;
            }
        };
        let present: Vec<&str> = devices.iter().map(|d| d.name.as_str()).collect();
        self.disk_devices.forget_missing(&present);
        devices.iter().fold(Rate::ZERO, |acc, dev| {
            let r = self
                .disk_devices
                .observe(&dev.name, dev.bytes_in, dev.bytes_out, now);
            add(acc, r)
        })
    }

    /// Per-interface rows plus their rate sum. Loopback is left out of both.
    fn network_rates(&mut self, now: Instant) -> (Rate, Vec<NetworkInterface>) {
        let counters = match self.probe.network_io() {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(error = %e, operation = "network_io", "network counters unavailable");
                return (Rate::ZERO, Vec::new());
            }
        };
        let external: Vec<&IoCounters> =
            counters.iter().filter(|c| !is_loopback(&c.name)).collect();
        let present: Vec<&str> = external.iter().map(|c| c.name.as_str()).collect();
        self.interfaces.forget_missing(&present);

        let mut total = Rate::ZERO;
        let interfaces = external
            .into_iter()
            .map(|c| {
                let r = self.interfaces.observe(&c.name, c.bytes_in, c.bytes_out, now);
                total = add(total, r);
                NetworkInterface {
                    name: c.name.clone(),
                    type_: interface_type(&c.name).to_string(),
                    upload_speed: r.rate_out,
                    download_speed: r.rate_in,
                    total_upload: c.bytes_out / BYTES_PER_MB,
                    total_download: c.bytes_in / BYTES_PER_MB,
                    status: "up".to_string(),
                }
            })
            .collect();
        (total, interfaces)
    }

    /// Disk devices with a stored baseline.
    pub fn tracked_devices(&self) -> usize {
        self.disk_devices.len()
    }

    /// Network interfaces with a stored baseline.
    pub fn tracked_interfaces(&self) -> usize {
        self.interfaces.len()
    }

    pub fn probe(&self) -> &P {
        &self.probe
    }
}

fn add(a: Rate, b: Rate) -> Rate {
    Rate {
        rate_in: a.rate_in + b.rate_in,
        rate_out: a.rate_out + b.rate_out,
    }
}

/// Loopback interfaces never count toward network rates.
pub fn is_loopback(name: &str) -> bool {
    let numbered_lo = name
        .strip_prefix("lo")
        .is_some_and(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()));
    name == "lo" || numbered_lo || name.to_ascii_lowercase().starts_with("loopback")
}

fn interface_type(name: &str) -> &'static str {
    if name.starts_with("wl") || name.starts_with("wifi") {
        "wireless"
    } else if ["docker", "br-", "veth", "virbr", "tun", "tap", "wg"]
        .iter()
        .any(|p| name.starts_with(p))
    {
        "virtual"
    } else {
        "ethernet"
    }
}

/// Highest-CPU processes first, at most `limit`. Unreadable processes are skipped;
/// equal CPU keeps enumeration order.
pub fn top_by_cpu(readings: Vec<ProcessReading>, limit: usize) -> Vec<Process> {
    if limit == 0 {
        return Vec::new();
    }
    let mut ranked: Vec<(usize, Process)> = readings
        .into_iter()
        .filter_map(|r| {
            let cpu = r.cpu.filter(|v| v.is_finite())?;
            let memory = r.memory.filter(|v| v.is_finite())?;
            Some(Process {
                pid: r.pid,
                name: r.name,
                cpu,
                memory,
                user: r.user,
                status: r.status,
            })
        })
        .enumerate()
        .collect();

    let by_rank = |a: &(usize, Process), b: &(usize, Process)| {
        b.1.cpu.total_cmp(&a.1.cpu).then(a.0.cmp(&b.0))
    };
    if ranked.len() > limit {
        ranked.select_nth_unstable_by(limit - 1, by_rank);
        ranked.truncate(limit);
    }
    ranked.sort_unstable_by(by_rank);
    ranked.into_iter().map(|(_, p)| p).collect()
}
