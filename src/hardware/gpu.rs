//! GPU detection module
//!
//! Enumerates compute devices through a vendor-neutral compute API:
//! - `opencl` feature: the system OpenCL ICD loader (see `opencl.rs`)
//! - otherwise: no compute API, so no devices
//!
//! Enumeration is bounded to `MAX_PLATFORMS` platforms with at most
//! `MAX_DEVICES_PER_PLATFORM` GPU devices each. Anything beyond that is
//! dropped silently.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Platforms considered per enumeration
pub const MAX_PLATFORMS: usize = 64;
/// GPU devices considered per platform
pub const MAX_DEVICES_PER_PLATFORM: usize = 64;
/// Capacity of a device name, including the terminating NUL
pub const NAME_CAPACITY: usize = 256;

/// GPU vendor
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GpuVendor {
    Intel,
    Amd,
    Nvidia,
    #[default]
    Unknown,
}

impl GpuVendor {
    /// Classify a compute API vendor string (exact match only)
    pub fn from_vendor_name(name: &str) -> Self {
        match name {
            "Intel(R) Corporation" => GpuVendor::Intel,
            "Advanced Micro Devices, Inc." => GpuVendor::Amd,
            "NVIDIA Corporation" => GpuVendor::Nvidia,
            _ => GpuVendor::Unknown,
        }
    }
}

impl std::fmt::Display for GpuVendor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GpuVendor::Nvidia => write!(f, "NVIDIA"),
            GpuVendor::Amd => write!(f, "AMD"),
            GpuVendor::Intel => write!(f, "Intel"),
            GpuVendor::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Properties of one compute device
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GpuDeviceProperties {
    /// Vendor
    pub vendor: GpuVendor,
    /// Device name, at most `NAME_CAPACITY - 1` bytes
    pub name: String,
    /// Global memory size in bytes
    pub memory_size: u64,
    /// Global memory cache size in bytes
    pub cache_size: u64,
}

/// The slice of a compute API the enumerator needs.
///
/// Implementations return at most `capacity` handles and report failures as
/// empty lists or `None`.
pub trait ComputeApi {
    type Platform;
    type Device;

    fn platforms(&self, capacity: usize) -> Vec<Self::Platform>;
    fn gpu_devices(&self, platform: &Self::Platform, capacity: usize) -> Vec<Self::Device>;

    fn vendor_name(&self, device: &Self::Device) -> Option<String>;
    fn device_name(&self, device: &Self::Device) -> Option<String>;
    fn global_memory_size(&self, device: &Self::Device) -> Option<u64>;
    fn global_memory_cache_size(&self, device: &Self::Device) -> Option<u64>;
}

/// A compute API with no platforms, used when no backend is compiled in
#[derive(Debug, Clone, Copy, Default)]
pub struct NoComputeApi;

impl ComputeApi for NoComputeApi {
    type Platform = ();
    type Device = ();

    fn platforms(&self, _capacity: usize) -> Vec<()> {
        Vec::new()
    }

    fn gpu_devices(&self, _platform: &(), _capacity: usize) -> Vec<()> {
        Vec::new()
    }

    fn vendor_name(&self, _device: &()) -> Option<String> {
        None
    }

    fn device_name(&self, _device: &()) -> Option<String> {
        None
    }

    fn global_memory_size(&self, _device: &()) -> Option<u64> {
        None
    }

    fn global_memory_cache_size(&self, _device: &()) -> Option<u64> {
        None
    }
}

/// Enumerate GPU devices in platform-major, device-minor order
pub fn enumerate_devices<A: ComputeApi>(api: &A) -> Vec<GpuDeviceProperties> {
    let platforms = api.platforms(MAX_PLATFORMS);
    if platforms.len() > MAX_PLATFORMS {
        debug!(found = platforms.len(), "truncating compute platforms");
    }

    let mut devices = Vec::new();
    for platform in platforms.iter().take(MAX_PLATFORMS) {
        let ids = api.gpu_devices(platform, MAX_DEVICES_PER_PLATFORM);
        if ids.len() > MAX_DEVICES_PER_PLATFORM {
            debug!(found = ids.len(), "truncating GPU devices on platform");
        }

        for device in ids.iter().take(MAX_DEVICES_PER_PLATFORM) {
            let vendor = api
                .vendor_name(device)
                .map(|name| GpuVendor::from_vendor_name(&name))
                .unwrap_or_default();

            devices.push(GpuDeviceProperties {
                vendor,
                name: api.device_name(device).map(bounded_name).unwrap_or_default(),
                memory_size: api.global_memory_size(device).unwrap_or(0),
                cache_size: api.global_memory_cache_size(device).unwrap_or(0),
            });
        }
    }

    devices
}

/// Truncate `name` to fit a NUL-terminated `NAME_CAPACITY` buffer
fn bounded_name(mut name: String) -> String {
    let limit = NAME_CAPACITY - 1;
    if name.len() > limit {
        let mut end = limit;
        while !name.is_char_boundary(end) {
            end -= 1;
        }
        name.truncate(end);
    }
    name
}

/// GPU enumeration settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GpuOptions {
    /// Skip enumeration entirely when false
    pub enabled: bool,
    /// Explicit compute library to load instead of the platform default
    pub library: Option<PathBuf>,
}

impl Default for GpuOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            library: None,
        }
    }
}

impl GpuOptions {
    /// Enumerate devices through the compiled-in compute backend
    pub fn device_properties(&self) -> Vec<GpuDeviceProperties> {
        if !self.enabled {
            return Vec::new();
        }

        native_devices(self.library.as_deref())
    }
}

#[cfg(feature = "opencl")]
fn native_devices(library: Option<&Path>) -> Vec<GpuDeviceProperties> {
    match super::opencl::OpenClLibrary::load(library) {
        Ok(api) => enumerate_devices(&api),
        Err(err) => {
            debug!(error = %err, "OpenCL unavailable, reporting no GPUs");
            Vec::new()
        }
    }
}

#[cfg(not(feature = "opencl"))]
fn native_devices(_library: Option<&Path>) -> Vec<GpuDeviceProperties> {
    enumerate_devices(&NoComputeApi)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Synthetic API that reports more platforms and devices than asked for
    struct SyntheticApi {
        platforms: usize,
        devices_per_platform: usize,
    }

    impl ComputeApi for SyntheticApi {
        type Platform = usize;
        type Device = (usize, usize);

        fn platforms(&self, _capacity: usize) -> Vec<usize> {
            (0..self.platforms).collect()
        }

        fn gpu_devices(&self, platform: &usize, _capacity: usize) -> Vec<(usize, usize)> {
            (0..self.devices_per_platform)
                .map(|device| (*platform, device))
                .collect()
        }

        fn vendor_name(&self, device: &(usize, usize)) -> Option<String> {
            match device.1 % 3 {
                0 => Some("NVIDIA Corporation".to_string()),
                1 => Some("Advanced Micro Devices, Inc.".to_string()),
                _ => None,
            }
        }

        fn device_name(&self, device: &(usize, usize)) -> Option<String> {
            Some(format!("gpu-{}-{}", device.0, device.1))
        }

        fn global_memory_size(&self, device: &(usize, usize)) -> Option<u64> {
            Some(((device.0 + 1) * 1024) as u64)
        }

        fn global_memory_cache_size(&self, _device: &(usize, usize)) -> Option<u64> {
            None
        }
    }

    #[test]
    fn test_vendor_classification() {
        assert_eq!(
            GpuVendor::from_vendor_name("NVIDIA Corporation"),
            GpuVendor::Nvidia
        );
        assert_eq!(
            GpuVendor::from_vendor_name("Intel(R) Corporation"),
            GpuVendor::Intel
        );
        assert_eq!(
            GpuVendor::from_vendor_name("Advanced Micro Devices, Inc."),
            GpuVendor::Amd
        );
        assert_eq!(GpuVendor::from_vendor_name("nvidia corporation"), GpuVendor::Unknown);
        assert_eq!(GpuVendor::from_vendor_name("Mesa"), GpuVendor::Unknown);
    }

    #[test]
    fn test_enumeration_order_and_defaults() {
        let api = SyntheticApi {
            platforms: 2,
            devices_per_platform: 3,
        };
        let devices = enumerate_devices(&api);

        assert_eq!(devices.len(), 6);
        assert_eq!(devices[0].name, "gpu-0-0");
        assert_eq!(devices[3].name, "gpu-1-0");
        assert_eq!(devices[0].vendor, GpuVendor::Nvidia);
        assert_eq!(devices[1].vendor, GpuVendor::Amd);
        assert_eq!(devices[2].vendor, GpuVendor::Unknown);
        assert_eq!(devices[4].memory_size, 2048);
        assert!(devices.iter().all(|d| d.cache_size == 0));
    }

    #[test]
    fn test_enumeration_is_capped() {
        let api = SyntheticApi {
            platforms: 70,
            devices_per_platform: 80,
        };
        let devices = enumerate_devices(&api);

        assert_eq!(devices.len(), MAX_PLATFORMS * MAX_DEVICES_PER_PLATFORM);
        assert_eq!(devices.last().unwrap().name, "gpu-63-63");
    }

    #[test]
    fn test_no_compute_api_yields_nothing() {
        assert!(enumerate_devices(&NoComputeApi).is_empty());
    }

    #[test]
    fn test_disabled_options_skip_enumeration() {
        let options = GpuOptions {
            enabled: false,
            library: None,
        };
        assert!(options.device_properties().is_empty());
    }

    #[test]
    fn test_bounded_name_truncates_on_char_boundary() {
        assert_eq!(bounded_name("Radeon".to_string()), "Radeon");

        let long = "x".repeat(400);
        assert_eq!(bounded_name(long).len(), NAME_CAPACITY - 1);

        // 254 ASCII bytes then a 3-byte char straddling the limit
        let straddling = format!("{}€", "a".repeat(254));
        let bounded = bounded_name(straddling);
        assert_eq!(bounded.len(), 254);
        assert!(bounded.chars().all(|c| c == 'a'));
    }
}
