//! Platform probes
//!
//! `NativeProbe` is the variant compiled for the current target.

use super::cpu::{online_logical_count, CacheInfo, CpuSources, Quantities};
use super::display::{self, DisplayInfo};
use super::gpu::{GpuDeviceProperties, GpuOptions};
use crate::config::Config;

/// Source of static hardware properties.
///
/// None of these can fail; missing data shows up as zero/unknown fields.
pub trait SystemProbe {
    /// Logical, record and package counts
    fn quantities(&self) -> Quantities;
    /// Geometry of one cache level
    fn cache(&self, level: u32) -> CacheInfo;
    /// Compute devices, platform-major
    fn device_properties(&self) -> Vec<GpuDeviceProperties>;
    /// Attached displays
    fn displays(&self) -> Vec<DisplayInfo>;
}

#[cfg(target_os = "linux")]
pub type NativeProbe = LinuxProbe;

#[cfg(not(target_os = "linux"))]
pub type NativeProbe = FallbackProbe;

/// procfs/sysfs backed probe
#[cfg(target_os = "linux")]
#[derive(Debug, Clone, Default)]
pub struct LinuxProbe {
    cpu: CpuSources,
    gpu: GpuOptions,
}

#[cfg(target_os = "linux")]
impl LinuxProbe {
    pub fn new(cpu: CpuSources, gpu: GpuOptions) -> Self {
        Self { cpu, gpu }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.cpu_sources(), config.gpu_options())
    }
}

#[cfg(target_os = "linux")]
impl SystemProbe for LinuxProbe {
    fn quantities(&self) -> Quantities {
        self.cpu.quantities()
    }

    fn cache(&self, level: u32) -> CacheInfo {
        self.cpu.cache(level)
    }

    fn device_properties(&self) -> Vec<GpuDeviceProperties> {
        self.gpu.device_properties()
    }

    fn displays(&self) -> Vec<DisplayInfo> {
        display::displays()
    }
}

/// Probe for targets without a CPU descriptor backend: only the logical
/// processor count is known.
#[derive(Debug, Clone, Default)]
pub struct FallbackProbe {
    gpu: GpuOptions,
}

impl FallbackProbe {
    pub fn new(gpu: GpuOptions) -> Self {
        Self { gpu }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.gpu_options())
    }
}

impl SystemProbe for FallbackProbe {
    fn quantities(&self) -> Quantities {
        Quantities {
            logical: online_logical_count(),
            ..Default::default()
        }
    }

    fn cache(&self, _level: u32) -> CacheInfo {
        CacheInfo::default()
    }

    fn device_properties(&self) -> Vec<GpuDeviceProperties> {
        self.gpu.device_properties()
    }

    fn displays(&self) -> Vec<DisplayInfo> {
        display::displays()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn no_gpu() -> GpuOptions {
        GpuOptions {
            enabled: false,
            library: None,
        }
    }

    #[test]
    fn test_fallback_probe_reports_logical_only() {
        let probe = FallbackProbe::new(no_gpu());
        let quantities = probe.quantities();

        assert_eq!(quantities.physical, 0);
        assert_eq!(quantities.packages, 0);
        assert_eq!(probe.cache(2), CacheInfo::default());
        assert!(probe.device_properties().is_empty());
        assert!(probe.displays().is_empty());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_linux_probe_uses_configured_sources() {
        let temp_dir = TempDir::new().unwrap();
        let cpuinfo = temp_dir.path().join("cpuinfo");
        fs::write(&cpuinfo, "processor : 0\nphysical id : 0\nprocessor : 1\nphysical id : 0\n")
            .unwrap();
        let index = temp_dir.path().join("cpu0/cache/index2");
        fs::create_dir_all(&index).unwrap();
        fs::write(index.join("size"), "1024K\n").unwrap();

        let mut config = Config::default();
        config.sources.cpuinfo_path = cpuinfo;
        config.sources.cpu_sysfs_root = temp_dir.path().to_path_buf();
        config.gpu.enabled = false;

        let probe = LinuxProbe::from_config(&config);
        let quantities = probe.quantities();
        assert_eq!((quantities.physical, quantities.packages), (2, 1));
        assert_eq!(probe.cache(2).size, 1024 * 1024);
        assert!(probe.device_properties().is_empty());
        assert!(probe.displays().is_empty());
    }
}
