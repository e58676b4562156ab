//! Memory tuning derived from installed RAM

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Kilobytes per GiB
pub const KB_PER_GB: u64 = 1_048_576;

pub const MAX_SWAPPINESS: u32 = 150;
pub const MIN_VFS_CACHE_PRESSURE: u32 = 32;
pub const MAX_VFS_CACHE_PRESSURE: u32 = 125;

/// Static sysctl tweaks written alongside the derived values
const STATIC_TWEAKS: &[&str] = &[
    "vm.page-cluster = 0",
    "vm.dirty_ratio = 10",
    "vm.dirty_background_ratio = 5",
    "net.core.default_qdisc = cake",
    "net.ipv4.tcp_congestion_control = bbr2",
    "net.ipv4.tcp_fastopen = 3",
    "kernel.nmi_watchdog = 0",
];

/// Kernel memory tunables derived for this host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TuningValues {
    /// Whole GiB of installed RAM (floor)
    pub ram_gb: u64,
    pub swappiness: u32,
    pub vfs_cache_pressure: u32,
}

impl TuningValues {
    /// The full list of sysctl settings the drop-in file carries
    pub fn sysctl_tweaks(&self) -> Vec<String> {
        let mut tweaks = vec![
            format!("vm.swappiness = {}", self.swappiness),
            format!("vm.vfs_cache_pressure = {}", self.vfs_cache_pressure),
        ];
        tweaks.extend(STATIC_TWEAKS.iter().map(|t| (*t).to_string()));
        tweaks
    }
}

/// Derive tuning values from installed RAM in kilobytes.
///
/// Smaller machines swap more eagerly. `swappiness` is
/// `min(floor(200 / ram_gb) * 2, 150)` and `vfs_cache_pressure` is
/// `swappiness * 1.25`, rounded half up and clamped to `[32, 125]`.
///
/// Fails with [`Error::RamTooLow`] below 1 GiB.
pub fn compute(ram_kb: u64) -> Result<TuningValues> {
    let ram_gb = ram_kb / KB_PER_GB;
    if ram_gb == 0 {
        return Err(Error::RamTooLow { ram_kb });
    }

    let swappiness = ((200 / ram_gb) * 2).min(u64::from(MAX_SWAPPINESS)) as u32;

    // swappiness * 5 / 4, rounded half up, in integers
    let scaled = (swappiness * 5 + 2) / 4;
    let vfs_cache_pressure = scaled.clamp(MIN_VFS_CACHE_PRESSURE, MAX_VFS_CACHE_PRESSURE);

    Ok(TuningValues {
        ram_gb,
        swappiness,
        vfs_cache_pressure,
    })
}
