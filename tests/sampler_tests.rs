// Sampler tests driven by a scripted probe: rates, partial failures, loopback exclusion

use chrono::Utc;
use hostwatch::models::Disk;
use hostwatch::sampler::{HostProbe, IoCounters, MemoryReading, ProcessReading, Sampler};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

const MIB: u64 = 1024 * 1024;

/// One scripted tick. `None` for a counter list means that read fails.
#[derive(Clone)]
struct Tick {
    cpu: Option<f64>,
    memory: Option<MemoryReading>,
    disk: Option<Vec<IoCounters>>,
    net: Option<Vec<IoCounters>>,
    processes: Option<Vec<ProcessReading>>,
}

impl Default for Tick {
    fn default() -> Self {
        Self {
            cpu: Some(25.0),
            memory: Some(MemoryReading {
                total_bytes: 8 * 1024 * MIB,
                used_bytes: 2 * 1024 * MIB,
            }),
            disk: Some(vec![]),
            net: Some(vec![]),
            processes: Some(vec![]),
        }
    }
}

#[derive(Default)]
struct FakeProbe {
    ticks: VecDeque<Tick>,
    current: Tick,
}

impl FakeProbe {
    fn scripted(ticks: Vec<Tick>) -> Self {
        Self {
            ticks: ticks.into(),
            current: Tick::default(),
        }
    }
}

fn counters(name: &str, bytes_in: u64, bytes_out: u64) -> IoCounters {
    IoCounters {
        name: name.into(),
        bytes_in,
        bytes_out,
    }
}

impl HostProbe for FakeProbe {
    // cpu is read first each tick, so it advances the script
    fn cpu_percent(&mut self) -> Option<f64> {
        self.current = self.ticks.pop_front().unwrap_or_default();
        self.current.cpu
    }
    fn memory(&mut self) -> Option<MemoryReading> {
        self.current.memory
    }
    fn disk_io(&mut self) -> anyhow::Result<Vec<IoCounters>> {
        self.current
            .disk
            .clone()
            .ok_or_else(|| anyhow::anyhow!("diskstats unreadable"))
    }
    fn network_io(&mut self) -> anyhow::Result<Vec<IoCounters>> {
        self.current
            .net
            .clone()
            .ok_or_else(|| anyhow::anyhow!("net counters unreadable"))
    }
    fn partitions(&mut self) -> anyhow::Result<Vec<Disk>> {
        Ok(vec![])
    }
    fn processes(&mut self) -> anyhow::Result<Vec<ProcessReading>> {
        self.current
            .processes
            .clone()
            .ok_or_else(|| anyhow::anyhow!("process table unreadable"))
    }
    fn cpu_cores(&self) -> u32 {
        4
    }
    fn uptime_secs(&self) -> u64 {
        600
    }
}

fn secs(base: Instant, s: u64) -> Instant {
    base + Duration::from_secs(s)
}

#[test]
fn first_tick_has_zero_rates_then_rates_follow_counters() {
    let probe = FakeProbe::scripted(vec![
        Tick {
            disk: Some(vec![counters("sda", 0, 0)]),
            net: Some(vec![counters("eth0", 0, 0)]),
            ..Tick::default()
        },
        Tick {
            disk: Some(vec![counters("sda", 10 * MIB, 20 * MIB)]),
            net: Some(vec![counters("eth0", 30 * MIB, 10 * MIB)]),
            ..Tick::default()
        },
    ]);
    let mut sampler = Sampler::new(probe, 20);
    let base = Instant::now();

    let first = sampler.collect_at("srv-1", base, Utc::now()).unwrap();
    assert_eq!(first.metrics.disk_read, 0.0);
    assert_eq!(first.metrics.network_in, 0.0);
    assert_eq!(first.metrics.cpu, 25.0);
    assert_eq!(first.metrics.memory, 25.0);
    assert_eq!(first.info.cpu_cores, 4);
    assert_eq!(first.info.total_memory, 8192);
    assert_eq!(first.info.used_memory, 2048);

    let second = sampler.collect_at("srv-1", secs(base, 10), Utc::now()).unwrap();
    assert!((second.metrics.disk_read - 1.0).abs() < 1e-9);
    assert!((second.metrics.disk_write - 2.0).abs() < 1e-9);
    assert!((second.metrics.network_in - 3.0).abs() < 1e-9);
    assert!((second.metrics.network_out - 1.0).abs() < 1e-9);

    let eth0 = &second.network[0];
    assert_eq!(eth0.name, "eth0");
    assert!((eth0.download_speed - 3.0).abs() < 1e-9);
    assert!((eth0.upload_speed - 1.0).abs() < 1e-9);
    assert_eq!(eth0.total_download, 30);
    assert_eq!(eth0.total_upload, 10);
}

#[test]
fn loopback_traffic_is_excluded() {
    let probe = FakeProbe::scripted(vec![
        Tick {
            net: Some(vec![counters("lo", 0, 0), counters("eth0", 0, 0)]),
            ..Tick::default()
        },
        Tick {
            net: Some(vec![
                counters("lo", 500 * MIB, 500 * MIB),
                counters("eth0", 2 * MIB, 4 * MIB),
            ]),
            ..Tick::default()
        },
    ]);
    let mut sampler = Sampler::new(probe, 20);
    let base = Instant::now();
    sampler.collect_at("srv-1", base, Utc::now()).unwrap();
    let c = sampler.collect_at("srv-1", secs(base, 2), Utc::now()).unwrap();

    assert!((c.metrics.network_in - 1.0).abs() < 1e-9);
    assert!((c.metrics.network_out - 2.0).abs() < 1e-9);
    assert_eq!(c.network.len(), 1);
    assert_eq!(c.network[0].name, "eth0");
}

#[test]
fn missing_cpu_and_memory_is_a_hard_error() {
    let probe = FakeProbe::scripted(vec![Tick {
        cpu: None,
        memory: None,
        ..Tick::default()
    }]);
    let mut sampler = Sampler::new(probe, 20);
    assert!(sampler.collect("srv-1").is_err());
}

#[test]
fn partial_failure_reports_zero_for_missing_category() {
    let probe = FakeProbe::scripted(vec![Tick {
        cpu: None,
        disk: None,
        processes: None,
        ..Tick::default()
    }]);
    let mut sampler = Sampler::new(probe, 20);
    let c = sampler.collect("srv-1").unwrap();
    assert_eq!(c.metrics.cpu, 0.0);
    assert_eq!(c.metrics.memory, 25.0);
    assert_eq!(c.metrics.disk_read, 0.0);
    assert!(c.processes.is_empty());
    assert_eq!(c.metrics.server_id, "srv-1");
}

#[test]
fn failed_counter_read_keeps_previous_baseline() {
    let probe = FakeProbe::scripted(vec![
        Tick {
            disk: Some(vec![counters("sda", 0, 0)]),
            ..Tick::default()
        },
        Tick {
            disk: None,
            ..Tick::default()
        },
        Tick {
            disk: Some(vec![counters("sda", 20 * MIB, 0)]),
            ..Tick::default()
        },
    ]);
    let mut sampler = Sampler::new(probe, 20);
    let base = Instant::now();
    sampler.collect_at("srv-1", base, Utc::now()).unwrap();
    let failed = sampler.collect_at("srv-1", secs(base, 5), Utc::now()).unwrap();
    assert_eq!(failed.metrics.disk_read, 0.0);

    // Rate spans both intervals because the failed read never replaced the baseline
    let c = sampler.collect_at("srv-1", secs(base, 10), Utc::now()).unwrap();
    assert!((c.metrics.disk_read - 2.0).abs() < 1e-9);
}

#[test]
fn hot_plugged_disk_does_not_spike_total() {
    let probe = FakeProbe::scripted(vec![
        Tick {
            disk: Some(vec![counters("sda", 0, 0)]),
            ..Tick::default()
        },
        Tick {
            disk: Some(vec![
                counters("sda", 10 * MIB, 0),
                counters("sdb", 900 * MIB, 900 * MIB),
            ]),
            ..Tick::default()
        },
    ]);
    let mut sampler = Sampler::new(probe, 20);
    let base = Instant::now();
    sampler.collect_at("srv-1", base, Utc::now()).unwrap();
    let c = sampler.collect_at("srv-1", secs(base, 10), Utc::now()).unwrap();
    assert!((c.metrics.disk_read - 1.0).abs() < 1e-9);
    assert_eq!(c.metrics.disk_write, 0.0);
}

#[test]
fn hot_plugged_interface_does_not_spike_network_total() {
    let probe = FakeProbe::scripted(vec![
        Tick {
            net: Some(vec![counters("eth0", 0, 0)]),
            ..Tick::default()
        },
        Tick {
            net: Some(vec![
                counters("eth0", 10 * MIB, 5 * MIB),
                counters("wlan0", 4_000 * MIB, 4_000 * MIB),
            ]),
            ..Tick::default()
        },
    ]);
    let mut sampler = Sampler::new(probe, 20);
    let base = Instant::now();
    sampler.collect_at("srv-1", base, Utc::now()).unwrap();
    let c = sampler.collect_at("srv-1", secs(base, 10), Utc::now()).unwrap();
    assert!((c.metrics.network_in - 1.0).abs() < 1e-9);
    assert!((c.metrics.network_out - 0.5).abs() < 1e-9);
    let wlan = c.network.iter().find(|n| n.name == "wlan0").unwrap();
    assert_eq!(wlan.download_speed, 0.0);
}

#[test]
fn vanished_interfaces_and_devices_are_forgotten() {
    let probe = FakeProbe::scripted(vec![
        Tick {
            disk: Some(vec![counters("sda", 0, 0), counters("sdb", 0, 0)]),
            net: Some(vec![counters("eth0", 0, 0), counters("veth1a2b", 0, 0)]),
            ..Tick::default()
        },
        // Failed reads leave the trackers alone
        Tick {
            disk: None,
            net: None,
            ..Tick::default()
        },
        Tick {
            disk: Some(vec![counters("sda", MIB, 0)]),
            net: Some(vec![counters("eth0", MIB, MIB)]),
            ..Tick::default()
        },
    ]);
    let mut sampler = Sampler::new(probe, 20);
    let base = Instant::now();
    sampler.collect_at("srv-1", base, Utc::now()).unwrap();
    assert_eq!(sampler.tracked_devices(), 2);
    assert_eq!(sampler.tracked_interfaces(), 2);

    sampler.collect_at("srv-1", secs(base, 5), Utc::now()).unwrap();
    assert_eq!(sampler.tracked_devices(), 2);
    assert_eq!(sampler.tracked_interfaces(), 2);

    sampler.collect_at("srv-1", secs(base, 10), Utc::now()).unwrap();
    assert_eq!(sampler.tracked_devices(), 1);
    assert_eq!(sampler.tracked_interfaces(), 1);
}

#[test]
fn processes_are_capped_and_sorted_by_cpu() {
    let readings: Vec<ProcessReading> = (1..=30)
        .map(|pid| ProcessReading {
            pid,
            name: format!("p{pid}"),
            cpu: Some(pid as f64),
            memory: Some(1.0),
            user: "root".into(),
            status: "Sleep".into(),
        })
        .collect();
    let probe = FakeProbe::scripted(vec![Tick {
        processes: Some(readings),
        ..Tick::default()
    }]);
    let mut sampler = Sampler::new(probe, 5);
    let c = sampler.collect("srv-1").unwrap();
    let pids: Vec<u32> = c.processes.iter().map(|p| p.pid).collect();
    assert_eq!(pids, vec![30, 29, 28, 27, 26]);
}
