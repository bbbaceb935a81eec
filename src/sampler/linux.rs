// Linux-specific counter reads: /proc/diskstats, /sys/block.

use super::IoCounters;

const SECTOR_BYTES: u64 = 512;

/// Cumulative read/write bytes per whole block device.
pub(super) fn read_disk_io_counters() -> anyhow::Result<Vec<IoCounters>> {
    #[cfg(target_os = "linux")]
    {
        let content = std::fs::read_to_string("/proc/diskstats")?;
        let sys_block = std::path::Path::new("/sys/block");
        let have_sysfs = sys_block.is_dir();
        Ok(parse_diskstats(&content, |name| {
            !have_sysfs || sys_block.join(name).exists()
        }))
    }
    #[cfg(not(target_os = "linux"))]
    {
        anyhow::bail!("disk I/O counters are only read on Linux")
    }
}

/// Parse /proc/diskstats. Sector counts are fields 6 (read) and 10 (written);
/// loop and ram devices are skipped, as are names rejected by `is_device`.
pub(super) fn parse_diskstats(content: &str, is_device: impl Fn(&str) -> bool) -> Vec<IoCounters> {
    content
        .lines()
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 10 {
                return None;
            }
            let name = fields[2];
            if name.starts_with("loop") || name.starts_with("ram") || !is_device(name) {
                return None;
            }
            let sectors_read: u64 = fields[5].parse().ok()?;
            let sectors_written: u64 = fields[9].parse().ok()?;
            Some(IoCounters {
                name: name.to_string(),
                bytes_in: sectors_read.saturating_mul(SECTOR_BYTES),
                bytes_out: sectors_written.saturating_mul(SECTOR_BYTES),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
   7       0 loop0 57 0 2226 25 0 0 0 0 0 44 25 0 0 0 0 0 0
   8       0 sda 120 10 2048 50 30 5 4096 70 0 100 120 0 0 0 0 0 0
   8       1 sda1 100 10 1024 40 20 5 2048 60 0 90 100 0 0 0 0 0 0
 259       0 nvme0n1 9 0 8 1 1 0 16 0 0 1 1
garbage line
";

    #[test]
    fn parses_whole_devices_in_bytes() {
        let out = parse_diskstats(SAMPLE, |name| name == "sda" || name == "nvme0n1");
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].name, "sda");
        assert_eq!(out[0].bytes_in, 2048 * 512);
        assert_eq!(out[0].bytes_out, 4096 * 512);
        assert_eq!(out[1].name, "nvme0n1");
        assert_eq!(out[1].bytes_in, 8 * 512);
        assert_eq!(out[1].bytes_out, 16 * 512);
    }

    #[test]
    fn skips_loop_devices_even_when_accepted() {
        let out = parse_diskstats(SAMPLE, |_| true);
        assert!(out.iter().all(|c| c.name != "loop0"));
        assert_eq!(out.len(), 3);
    }
}
