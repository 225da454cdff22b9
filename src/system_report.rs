//! Performance snapshot and system information.

use serde::Serialize;
use std::net::{IpAddr, ToSocketAddrs};
use std::path::{Path, PathBuf};
use sysinfo::{Disks, System};

const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Converts a byte count to GiB.
pub fn to_gib(bytes: u64) -> f64 {
    bytes as f64 / GIB
}

/// `part` as a percentage of `whole`, zero when `whole` is zero.
pub fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 * 100.0 / whole as f64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MemoryUsage {
    pub total: u64,
    pub available: u64,
}

impl MemoryUsage {
    pub fn used_percent(&self) -> f64 {
        percent(self.total.saturating_sub(self.available), self.total)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiskUsage {
    pub mount_point: PathBuf,
    pub total: u64,
    pub free: u64,
}

impl DiskUsage {
    pub fn used_percent(&self) -> f64 {
        percent(self.total.saturating_sub(self.free), self.total)
    }
}

/// Picks the disk holding the filesystem root: the one mounted at `root`, else
/// the largest.
pub fn select_root_disk(disks: &[DiskUsage], root: &Path) -> Option<DiskUsage> {
    disks
        .iter()
        .find(|disk| disk.mount_point == root)
        .or_else(|| disks.iter().max_by_key(|disk| disk.total))
        .cloned()
}

/// CPU, memory and root disk usage at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceSnapshot {
    pub cpu_percent: f32,
    pub memory: MemoryUsage,
    pub disk: Option<DiskUsage>,
}

impl PerformanceSnapshot {
    /// Samples the running system.
    ///
    /// Blocks for [`sysinfo::MINIMUM_CPU_UPDATE_INTERVAL`] so that CPU usage is
    /// measured over an interval rather than read as zero.
    pub fn capture() -> Self {
        let mut system = System::new_all();
        std::thread::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);
        system.refresh_cpu_usage();

        let disks: Vec<DiskUsage> = Disks::new_with_refreshed_list()
            .list()
            .iter()
            .map(|disk| DiskUsage {
                mount_point: disk.mount_point().to_path_buf(),
                total: disk.total_space(),
                free: disk.available_space(),
            })
            .collect();

        Self {
            cpu_percent: system.global_cpu_usage(),
            memory: MemoryUsage {
                total: system.total_memory(),
                available: system.available_memory(),
            },
            disk: select_root_disk(&disks, &filesystem_root()),
        }
    }
}

fn filesystem_root() -> PathBuf {
    if cfg!(windows) {
        PathBuf::from(r"C:\")
    } else {
        PathBuf::from("/")
    }
}

/// Static facts about the machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SystemInfo {
    pub os_name: String,
    pub os_release: String,
    pub machine: String,
    pub processor: String,
    pub hostname: String,
    /// The hostname's address, or why it could not be resolved.
    pub ip_address: Result<IpAddr, String>,
}

impl SystemInfo {
    pub fn collect() -> Self {
        let mut system = System::new();
        system.refresh_cpu_all();

        let hostname = System::host_name().unwrap_or_else(|| "unknown".to_string());
        let ip_address = resolve_host(&hostname);

        Self {
            os_name: System::name().unwrap_or_else(|| std::env::consts::OS.to_string()),
            os_release: System::kernel_version().unwrap_or_else(|| "unknown".to_string()),
            machine: std::env::consts::ARCH.to_string(),
            processor: system
                .cpus()
                .first()
                .map(|cpu| cpu.brand().trim().to_string())
                .filter(|brand| !brand.is_empty())
                .unwrap_or_else(|| "unknown".to_string()),
            hostname,
            ip_address,
        }
    }
}

/// Resolves `hostname`, preferring an IPv4 address.
pub fn resolve_host(hostname: &str) -> Result<IpAddr, String> {
    let addresses: Vec<IpAddr> = (hostname, 0)
        .to_socket_addrs()
        .map_err(|e| e.to_string())?
        .map(|addr| addr.ip())
        .collect();

    addresses
        .iter()
        .find(|ip| ip.is_ipv4())
        .or_else(|| addresses.first())
        .copied()
        .ok_or_else(|| format!("no address found for {}", hostname))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent() {
        assert_eq!(percent(1, 4), 25.0);
        assert_eq!(percent(5, 0), 0.0);
    }

    #[test]
    fn test_to_gib() {
        assert_eq!(to_gib(3 * 1024 * 1024 * 1024), 3.0);
        assert_eq!(to_gib(512 * 1024 * 1024), 0.5);
    }

    #[test]
    fn test_memory_used_percent() {
        let memory = MemoryUsage {
            total: 16,
            available: 4,
        };
        assert_eq!(memory.used_percent(), 75.0);
    }

    #[test]
    fn test_select_root_disk_prefers_root_mount() {
        let disks = vec![
            DiskUsage {
                mount_point: PathBuf::from("/data"),
                total: 1000,
                free: 10,
            },
            DiskUsage {
                mount_point: PathBuf::from("/"),
                total: 100,
                free: 50,
            },
        ];

        let root = select_root_disk(&disks, Path::new("/")).unwrap();
        assert_eq!(root.mount_point, PathBuf::from("/"));
        assert_eq!(root.used_percent(), 50.0);
    }

    #[test]
    fn test_select_root_disk_falls_back_to_largest() {
        let disks = vec![
            DiskUsage {
                mount_point: PathBuf::from("/boot"),
                total: 10,
                free: 5,
            },
            DiskUsage {
                mount_point: PathBuf::from("/home"),
                total: 500,
                free: 100,
            },
        ];

        let root = select_root_disk(&disks, Path::new("/")).unwrap();
        assert_eq!(root.mount_point, PathBuf::from("/home"));
        assert!(select_root_disk(&[], Path::new("/")).is_none());
    }

    #[test]
    fn test_resolve_localhost() {
        let ip = resolve_host("localhost").unwrap();
        assert!(ip.is_loopback());
    }
}
