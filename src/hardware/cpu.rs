//! CPU detection module
//!
//! Detects CPU topology and cache geometry using:
//! - Cross-platform: sysinfo crate (online logical processors)
//! - Linux: /proc/cpuinfo, /sys/devices/system/cpu/cpuN/cache
//!
//! Every value is best-effort. A source that cannot be read leaves its
//! field at zero (or `Unknown`) and never affects the other fields.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use sysinfo::System;
use tracing::{debug, trace};

pub const DEFAULT_CPUINFO_PATH: &str = "/proc/cpuinfo";
pub const DEFAULT_CPU_SYSFS_ROOT: &str = "/sys/devices/system/cpu";

/// Logical processor whose cache descriptors stand in for the whole machine
const REPRESENTATIVE_CPU: u32 = 0;

/// Processor counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quantities {
    /// Online logical processors
    pub logical: usize,
    /// Number of "processor" records in the cpuinfo table.
    ///
    /// This is a tally of records, so with SMT enabled it equals the
    /// logical count rather than the number of cores.
    pub physical: usize,
    /// Distinct physical package (socket) ids
    pub packages: usize,
}

/// Cache kind as reported by the kernel
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheType {
    Unified,
    Instruction,
    Data,
    Trace,
    #[default]
    Unknown,
}

impl CacheType {
    const LABELS: [(&'static str, CacheType); 4] = [
        ("unified", CacheType::Unified),
        ("instruction", CacheType::Instruction),
        ("data", CacheType::Data),
        ("trace", CacheType::Trace),
    ];

    /// Classify a cache `type` descriptor ("Unified", "Data", ...).
    ///
    /// Only the first word is considered, case-insensitively, and it only has
    /// to start with one of the canonical labels.
    pub fn from_label(label: &str) -> Self {
        let Some(token) = label.split_whitespace().next() else {
            return CacheType::Unknown;
        };
        let token = token.to_ascii_lowercase();

        Self::LABELS
            .iter()
            .find(|(name, _)| token.starts_with(name))
            .map(|(_, kind)| *kind)
            .unwrap_or(CacheType::Unknown)
    }
}

impl std::fmt::Display for CacheType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheType::Unified => write!(f, "Unified"),
            CacheType::Instruction => write!(f, "Instruction"),
            CacheType::Data => write!(f, "Data"),
            CacheType::Trace => write!(f, "Trace"),
            CacheType::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Geometry of one cache level
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheInfo {
    /// Total size in bytes
    pub size: u64,
    /// Coherency line size in bytes
    pub line_size: u64,
    /// Ways of associativity (0 = unknown)
    pub associativity: u32,
    /// Cache kind
    #[serde(rename = "type")]
    pub cache_type: CacheType,
}

/// Locations of the CPU data sources
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CpuSources {
    /// Per-processor descriptor table (normally /proc/cpuinfo)
    pub cpuinfo: PathBuf,
    /// Root of the per-CPU sysfs tree (normally /sys/devices/system/cpu)
    pub sysfs_root: PathBuf,
}

impl Default for CpuSources {
    fn default() -> Self {
        Self {
            cpuinfo: PathBuf::from(DEFAULT_CPUINFO_PATH),
            sysfs_root: PathBuf::from(DEFAULT_CPU_SYSFS_ROOT),
        }
    }
}

impl CpuSources {
    pub fn new(cpuinfo: impl Into<PathBuf>, sysfs_root: impl Into<PathBuf>) -> Self {
        Self {
            cpuinfo: cpuinfo.into(),
            sysfs_root: sysfs_root.into(),
        }
    }

    /// Descriptor directory for `level` on the representative processor
    pub fn cache_dir(&self, level: u32) -> PathBuf {
        self.sysfs_root
            .join(format!("cpu{}", REPRESENTATIVE_CPU))
            .join("cache")
            .join(format!("index{}", level))
    }

    /// Count logical processors, cpuinfo records and packages
    pub fn quantities(&self) -> Quantities {
        let mut quantities = Quantities {
            logical: online_logical_count(),
            ..Default::default()
        };

        let Some(content) = read_source(&self.cpuinfo) else {
            return quantities;
        };

        let (physical, packages) = tally_cpuinfo(&content);
        quantities.physical = physical;
        quantities.packages = packages;
        quantities
    }

    /// Read the geometry of cache `level` (the sysfs `indexN` number)
    pub fn cache(&self, level: u32) -> CacheInfo {
        let dir = self.cache_dir(level);
        let mut info = CacheInfo::default();

        if let Some(text) = read_source(&dir.join("size")) {
            info.size = parse_cache_size(&text);
        }

        if let Some(text) = read_source(&dir.join("coherency_line_size")) {
            info.line_size = leading_int(&text).unwrap_or(0);
        }

        if let Some(text) = read_source(&dir.join("associativity")) {
            info.associativity = leading_int(&text).unwrap_or(0);
        }

        if let Some(text) = read_source(&dir.join("type")) {
            info.cache_type = CacheType::from_label(&text);
        }

        trace!(level, ?info, "cache descriptor read");
        info
    }
}

/// Online logical processors as reported by the OS.
///
/// Falls back to the parallelism available to this process, then 0.
pub fn online_logical_count() -> usize {
    let mut sys = System::new();
    sys.refresh_cpu_all();

    let count = sys.cpus().len();
    if count > 0 {
        return count;
    }

    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(0)
}

fn read_source(path: &Path) -> Option<String> {
    match fs::read_to_string(path) {
        Ok(content) => Some(content),
        Err(err) => {
            debug!(path = %path.display(), error = %err, "data source unavailable");
            None
        }
    }
}

/// Tally "processor" records and distinct "physical id" values
fn tally_cpuinfo(content: &str) -> (usize, usize) {
    let mut processors = 0;
    let mut package_ids: Vec<u32> = Vec::new();

    for line in content.lines() {
        if line.starts_with("physical id") {
            package_ids.push(first_digit_run(line));
        } else if line.starts_with("processor") {
            processors += 1;
        }
    }

    package_ids.sort_unstable();
    package_ids.dedup();

    (processors, package_ids.len())
}

/// First run of ASCII digits anywhere in `line`; 0 if absent or out of range
fn first_digit_run(line: &str) -> u32 {
    line.split(|c: char| !c.is_ascii_digit())
        .find(|run| !run.is_empty())
        .and_then(|run| run.parse().ok())
        .unwrap_or(0)
}

/// Split `text` (after leading whitespace) into its leading digits and the rest
fn split_leading_digits(text: &str) -> (&str, &str) {
    let trimmed = text.trim_start();
    let end = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    trimmed.split_at(end)
}

fn leading_int<T: FromStr>(text: &str) -> Option<T> {
    split_leading_digits(text).0.parse().ok()
}

/// Parse a sysfs cache size such as "32K", "8M" or "32768".
///
/// Each suffix tier multiplies by 1024 on top of the tiers below it, so
/// "1G" is 1024^3. The suffix is case-sensitive; anything else is unscaled.
fn parse_cache_size(text: &str) -> u64 {
    let (digits, rest) = split_leading_digits(text);
    let Ok(value) = digits.parse::<u64>() else {
        return 0;
    };

    let tiers = match rest.trim_start().chars().next() {
        Some('G') => 3,
        Some('M') => 2,
        Some('K') => 1,
        _ => 0,
    };

    (0..tiers).fold(value, |size, _| size.saturating_mul(1024))
}
