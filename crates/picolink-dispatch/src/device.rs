use std::path::PathBuf;
use std::time::Instant;

use tracing::{debug, trace};

/// Platform facilities the dispatcher reports on.
pub trait Device {
    /// Monotonic milliseconds since boot.
    fn uptime_ms(&self) -> u64;

    /// Bytes of heap currently free.
    fn heap_free(&self) -> u64;

    /// Run a heap reclamation pass before reporting memory.
    fn collect(&mut self);
}

/// Device facilities of a hosted (operating-system) build.
#[derive(Debug, Clone)]
pub struct HostDevice {
    booted: Instant,
    meminfo: PathBuf,
}

impl HostDevice {
    pub fn new() -> Self {
        Self {
            booted: Instant::now(),
            meminfo: PathBuf::from("/proc/meminfo"),
        }
    }

    /// Read available memory from an alternative meminfo-format file.
    pub fn with_meminfo(mut self, path: impl Into<PathBuf>) -> Self {
        self.meminfo = path.into();
        self
    }
}

impl Default for HostDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl Device for HostDevice {
    fn uptime_ms(&self) -> u64 {
        u64::try_from(self.booted.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    fn heap_free(&self) -> u64 {
        match std::fs::read_to_string(&self.meminfo) {
            Ok(text) => mem_available(&text).unwrap_or(0),
            Err(err) => {
                debug!(path = ?self.meminfo, error = %err, "meminfo unavailable");
                0
            }
        }
    }

    fn collect(&mut self) {
        // Nothing to reclaim: allocations are freed as they are dropped.
        trace!("heap reclamation requested");
    }
}

/// Parse `MemAvailable:  <n> kB` into bytes.
fn mem_available(meminfo: &str) -> Option<u64> {
    meminfo.lines().find_map(|line| {
        let rest = line.strip_prefix("MemAvailable:")?;
        let mut parts = rest.split_whitespace();
        let value: u64 = parts.next()?.parse().ok()?;
        match parts.next() {
            Some("kB") => value.checked_mul(1024),
            None => Some(value),
            Some(_) => None,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mem_available() {
        let text = "MemTotal:       16314236 kB\nMemFree:         1234 kB\nMemAvailable:    2048 kB\n";
        assert_eq!(mem_available(text), Some(2048 * 1024));
    }

    #[test]
    fn missing_field_is_none() {
        assert_eq!(mem_available("MemTotal: 1 kB\n"), None);
        assert_eq!(mem_available("MemAvailable: lots\n"), None);
    }

    #[test]
    fn unreadable_meminfo_reports_zero() {
        let device = HostDevice::new().with_meminfo("/definitely/not/meminfo");
        assert_eq!(device.heap_free(), 0);
    }

    #[test]
    fn meminfo_file_is_read() {
        let path = std::env::temp_dir().join(format!("picolink-meminfo-{}", std::process::id()));
        std::fs::write(&path, "MemAvailable:      4 kB\n").unwrap();
        let device = HostDevice::new().with_meminfo(&path);
        assert_eq!(device.heap_free(), 4096);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn uptime_is_monotonic() {
        let device = HostDevice::new();
        let first = device.uptime_ms();
        std::thread::sleep(std::time::Duration::from_millis(2));
        assert!(device.uptime_ms() >= first);
    }
}
