//! hwprobe - static hardware introspection
//!
//! Reads platform data sources and normalizes them into plain value
//! snapshots:
//! - CPU logical/record/package counts and per-level cache geometry
//! - GPU compute devices (vendor, name, memory, cache)
//! - Attached displays
//!
//! Nothing is cached and nothing fails: unavailable data leaves the affected
//! fields at zero or `Unknown`.

pub mod config;
pub mod error;
pub mod hardware;

pub use hardware::cpu::{CacheInfo, CacheType, Quantities};
pub use hardware::display::DisplayInfo;
pub use hardware::gpu::{GpuDeviceProperties, GpuVendor};
pub use hardware::{NativeProbe, SystemInfo, SystemProbe};

/// Processor counts from the native probe
pub fn quantities() -> Quantities {
    NativeProbe::default().quantities()
}

/// Geometry of cache `level` from the native probe
pub fn cache(level: u32) -> CacheInfo {
    NativeProbe::default().cache(level)
}

/// Compute devices from the native probe
pub fn device_properties() -> Vec<GpuDeviceProperties> {
    NativeProbe::default().device_properties()
}

/// Attached displays from the native probe
pub fn displays() -> Vec<DisplayInfo> {
    NativeProbe::default().displays()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_free_functions_are_idempotent() {
        assert_eq!(cache(0), cache(0));
        assert_eq!(displays(), displays());

        let first = quantities();
        let second = quantities();
        assert_eq!(first.physical, second.physical);
        assert_eq!(first.packages, second.packages);
    }

    #[test]
    fn test_displays_always_empty() {
        assert!(displays().is_empty());
    }
}
