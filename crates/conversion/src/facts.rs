//! Host facts and the probe that gathers them
//!
//! [`HostFacts`] is built once at startup through a [`HostProbe`] and then
//! passed by reference to the tuning calculator and the capability gate.
//! The parsers in this module are pure so probe output can be tested
//! without a live host.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Marker printed by the glibc dynamic loader when the v3 tier is usable
pub const V3_MARKER: &str = "x86-64-v3 (supported, searched)";

/// CPU microarchitecture tier used to pick optimized repositories
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstructionSetTier {
    #[default]
    Baseline,
    V3,
}

impl std::fmt::Display for InstructionSetTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Baseline => f.write_str("baseline"),
            Self::V3 => f.write_str("x86-64-v3"),
        }
    }
}

/// Kind of swap already active on the host
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwapKind {
    #[default]
    None,
    Zram,
    Physical,
}

impl std::fmt::Display for SwapKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => f.write_str("none"),
            Self::Zram => f.write_str("zram"),
            Self::Physical => f.write_str("physical"),
        }
    }
}

/// Immutable snapshot of the host, taken once per run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostFacts {
    /// Installed RAM in kilobytes
    pub ram_kb: u64,
    pub instruction_set_tier: InstructionSetTier,
    pub existing_swap: SwapKind,
    pub zswap_enabled: bool,
    /// Account the conversion targets
    pub username: String,
    pub home_dir: PathBuf,
    /// Desktop menu config file, when one was found in the user's home
    pub menu_config: Option<PathBuf>,
}

impl HostFacts {
    /// Gather facts through a probe
    ///
    /// RAM and user detection are required. Instruction tier, swap and
    /// zswap detection fall back to the conservative answer when the probe
    /// fails, so a missing loader or `swapon` never selects v3 packages.
    pub fn gather<P: HostProbe + ?Sized>(probe: &P) -> Result<Self> {
        let ram_kb = probe.measure_ram()?;
        let (username, home_dir) = probe.detect_user()?;

        let instruction_set_tier = probe.detect_instruction_tier().unwrap_or_else(|e| {
            log::warn!("Instruction tier detection failed, assuming baseline: {e}");
            InstructionSetTier::Baseline
        });

        let existing_swap = probe.detect_swap_state().unwrap_or_else(|e| {
            log::warn!("Swap detection failed, assuming none: {e}");
            SwapKind::None
        });

        let zswap_enabled = probe.detect_zswap_state().unwrap_or_else(|e| {
            log::warn!("Zswap detection failed, assuming disabled: {e}");
            false
        });

        let menu_config = probe.locate_menu_config(&home_dir);

        let facts = Self {
            ram_kb,
            instruction_set_tier,
            existing_swap,
            zswap_enabled,
            username,
            home_dir,
            menu_config,
        };
        facts.log_warnings();
        Ok(facts)
    }

    /// Check if the host supports the v3 instruction tier
    pub fn supports_v3(&self) -> bool {
        self.instruction_set_tier == InstructionSetTier::V3
    }

    /// Report swap and zswap state. These never change the plan.
    fn log_warnings(&self) {
        match self.existing_swap {
            SwapKind::Zram => log::info!("This system already has zram"),
            SwapKind::Physical => log::info!("This system already has physical swap"),
            SwapKind::None => log::info!("System has no swap"),
        }

        if self.zswap_enabled {
            log::warn!("Zswap is enabled, please disable zswap if you want to use zram");
        } else {
            log::info!("Zswap is disabled");
        }

        if self.supports_v3() {
            log::info!("{V3_MARKER}");
        }
    }
}

/// Source of raw host measurements
pub trait HostProbe {
    /// Installed RAM in kilobytes
    fn measure_ram(&self) -> Result<u64>;

    /// CPU instruction-set tier
    fn detect_instruction_tier(&self) -> Result<InstructionSetTier>;

    /// Kind of swap currently active
    fn detect_swap_state(&self) -> Result<SwapKind>;

    /// Whether zswap is enabled in the running kernel
    fn detect_zswap_state(&self) -> Result<bool>;

    /// Target username and home directory
    fn detect_user(&self) -> Result<(String, PathBuf)>;

    /// Desktop menu config file inside `home`, if any
    fn locate_menu_config(&self, home: &Path) -> Option<PathBuf>;
}

/// Extract `MemTotal` in kilobytes from `/proc/meminfo` content
pub fn parse_meminfo(content: &str) -> Result<u64> {
    let line = content
        .lines()
        .find(|l| l.starts_with("MemTotal:"))
        .ok_or_else(|| Error::InvalidMemInfo("no MemTotal line".to_string()))?;

    let digits: String = line.chars().filter(char::is_ascii_digit).collect();
    let ram_kb: u64 = digits
        .parse()
        .map_err(|_| Error::InvalidMemInfo(format!("no number in '{}'", line.trim())))?;

    if ram_kb == 0 {
        return Err(Error::InvalidMemInfo("MemTotal is zero".to_string()));
    }
    Ok(ram_kb)
}

/// Read the instruction tier from the dynamic loader's `--help` output
pub fn parse_instruction_tier(loader_help: &str) -> InstructionSetTier {
    if loader_help.contains(V3_MARKER) {
        InstructionSetTier::V3
    } else {
        InstructionSetTier::Baseline
    }
}

/// Classify `swapon -s` output
///
/// The first column of each non-header line is the swap device. A zram
/// device anywhere wins over physical swap.
pub fn parse_swap_summary(swapon: &str) -> SwapKind {
    let devices: Vec<&str> = swapon
        .lines()
        .filter(|l| !l.trim().is_empty() && !l.starts_with("Filename"))
        .filter_map(|l| l.split_whitespace().next())
        .collect();

    if devices.iter().any(|d| d.contains("zram")) {
        SwapKind::Zram
    } else if devices.is_empty() {
        SwapKind::None
    } else {
        SwapKind::Physical
    }
}

/// Read `/sys/module/zswap/parameters/enabled`
pub fn parse_zswap_state(content: &str) -> bool {
    matches!(content.trim(), "Y" | "y" | "1")
}
