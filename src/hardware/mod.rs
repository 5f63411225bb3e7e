//! Hardware detection module
//!
//! Detects CPU topology and caches (procfs/sysfs), compute devices (OpenCL)
//! and displays. Each probe returns a fresh value snapshot.

pub mod cpu;
pub mod display;
pub mod gpu;
#[cfg(feature = "opencl")]
mod opencl;
mod probe;
mod system;

#[cfg(target_os = "linux")]
pub use probe::LinuxProbe;
pub use probe::{FallbackProbe, NativeProbe, SystemProbe};
pub use system::{format_bytes, LevelCache, SystemInfo};
