//! System information aggregator

use serde::{Deserialize, Serialize};

use super::cpu::{CacheInfo, Quantities};
use super::display::DisplayInfo;
use super::gpu::GpuDeviceProperties;
use super::probe::SystemProbe;

/// Cache geometry tagged with its level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelCache {
    /// sysfs index number
    pub level: u32,
    #[serde(flatten)]
    pub cache: CacheInfo,
}

/// Complete system information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemInfo {
    /// Processor counts
    pub quantities: Quantities,
    /// Requested cache levels
    pub caches: Vec<LevelCache>,
    /// Compute devices
    pub gpus: Vec<GpuDeviceProperties>,
    /// Attached displays
    pub displays: Vec<DisplayInfo>,
}

impl SystemInfo {
    /// Detect all system information with `probe`
    pub fn detect<P: SystemProbe>(probe: &P, cache_levels: &[u32]) -> Self {
        let caches = cache_levels
            .iter()
            .map(|&level| LevelCache {
                level,
                cache: probe.cache(level),
            })
            .collect();

        SystemInfo {
            quantities: probe.quantities(),
            caches,
            gpus: probe.device_properties(),
            displays: probe.displays(),
        }
    }

    /// Display system info as formatted string
    pub fn display(&self) -> String {
        const WIDTH: usize = 62;
        let mut output = String::new();

        output.push_str(&format!("╔{}╗\n", "═".repeat(WIDTH)));
        output.push_str(&format!("║{:^WIDTH$}║\n", "SYSTEM INFORMATION"));
        output.push_str(&format!("╠{}╣\n", "═".repeat(WIDTH)));

        let format_line = |label: &str, content: &str| -> String {
            let content_width = WIDTH.saturating_sub(1);
            let label_len = label.chars().count();
            let available = content_width.saturating_sub(label_len);
            let content: String = content.chars().take(available).collect();
            format!("║ {}{:<available$}║\n", label, content)
        };

        // CPU Section
        output.push_str(&format_line(
            "CPU: ",
            &format!(
                "{} logical / {} processor records / {} package(s)",
                self.quantities.logical, self.quantities.physical, self.quantities.packages
            ),
        ));
        for level in &self.caches {
            output.push_str(&format_line(
                "      ",
                &format!(
                    "index{}: {} | {} | {} B lines | {}",
                    level.level,
                    format_bytes(level.cache.size),
                    level.cache.cache_type,
                    level.cache.line_size,
                    format_ways(level.cache.associativity)
                ),
            ));
        }

        output.push_str(&format!("╠{}╣\n", "═".repeat(WIDTH)));

        // GPU Section
        if self.gpus.is_empty() {
            output.push_str(&format_line("GPU: ", "No compute devices found"));
        }
        for (index, gpu) in self.gpus.iter().enumerate() {
            let label = if index == 0 { "GPU: " } else { "     " };
            output.push_str(&format_line(label, &format!("{} ({})", gpu.name, gpu.vendor)));
            output.push_str(&format_line(
                "      ",
                &format!(
                    "Memory: {} | Cache: {}",
                    format_bytes(gpu.memory_size),
                    format_bytes(gpu.cache_size)
                ),
            ));
        }

        output.push_str(&format!("╠{}╣\n", "═".repeat(WIDTH)));

        // Display Section
        if self.displays.is_empty() {
            output.push_str(&format_line("DSP: ", "No displays found"));
        }
        for (index, display) in self.displays.iter().enumerate() {
            let label = if index == 0 { "DSP: " } else { "     " };
            output.push_str(&format_line(
                label,
                &format!(
                    "{}x{} @ {:.0} Hz | {} dpi | {} bpp",
                    display.width, display.height, display.refresh_rate, display.dpi, display.bpp
                ),
            ));
        }

        output.push_str(&format!("╚{}╝", "═".repeat(WIDTH)));

        output
    }
}

fn format_ways(associativity: u32) -> String {
    if associativity == 0 {
        "? ways".to_string()
    } else {
        format!("{}-way", associativity)
    }
}

/// Human-readable byte count using binary units
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KiB", "MiB", "GiB", "TiB"];

    if bytes < 1024 {
        return format!("{} B", bytes);
    }

    let mut value = bytes as f64;
    let mut unit = "B";
    for candidate in UNITS {
        if value < 1024.0 {
            break;
        }
        value /= 1024.0;
        unit = candidate;
    }

    if value.fract() == 0.0 {
        format!("{:.0} {}", value, unit)
    } else {
        format!("{:.1} {}", value, unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::cpu::CacheType;
    use crate::hardware::gpu::GpuVendor;

    struct FixedProbe;

    impl SystemProbe for FixedProbe {
        fn quantities(&self) -> Quantities {
            Quantities {
                logical: 16,
                physical: 16,
                packages: 1,
            }
        }

        fn cache(&self, level: u32) -> CacheInfo {
            CacheInfo {
                size: 32 * 1024 << level,
                line_size: 64,
                associativity: 8,
                cache_type: if level == 0 {
                    CacheType::Data
                } else {
                    CacheType::Unified
                },
            }
        }

        fn device_properties(&self) -> Vec<GpuDeviceProperties> {
            vec![GpuDeviceProperties {
                vendor: GpuVendor::Amd,
                name: "gfx1100".to_string(),
                memory_size: 24 * 1024 * 1024 * 1024,
                cache_size: 256 * 1024,
            }]
        }

        fn displays(&self) -> Vec<DisplayInfo> {
            Vec::new()
        }
    }

    #[test]
    fn test_detect_collects_requested_levels_in_order() {
        let info = SystemInfo::detect(&FixedProbe, &[2, 0]);

        assert_eq!(info.caches.len(), 2);
        assert_eq!(info.caches[0].level, 2);
        assert_eq!(info.caches[0].cache.size, 128 * 1024);
        assert_eq!(info.caches[1].cache.cache_type, CacheType::Data);
        assert_eq!(info.gpus.len(), 1);
        assert!(info.displays.is_empty());
    }

    #[test]
    fn test_detect_is_repeatable() {
        assert_eq!(
            SystemInfo::detect(&FixedProbe, &[0, 1]),
            SystemInfo::detect(&FixedProbe, &[0, 1])
        );
    }

    #[test]
    fn test_display_renders_sections() {
        let rendered = SystemInfo::detect(&FixedProbe, &[0]).display();

        assert!(rendered.contains("SYSTEM INFORMATION"));
        assert!(rendered.contains("16 logical / 16 processor records / 1 package(s)"));
        assert!(rendered.contains("index0: 32 KiB | Data | 64 B lines | 8-way"));
        assert!(rendered.contains("gfx1100 (AMD)"));
        assert!(rendered.contains("Memory: 24 GiB | Cache: 256 KiB"));
        assert!(rendered.contains("No displays found"));
    }

    #[test]
    fn test_json_flattens_cache_levels() {
        let info = SystemInfo::detect(&FixedProbe, &[1]);
        let json = serde_json::to_value(&info).unwrap();

        assert_eq!(json["caches"][0]["level"], 1);
        assert_eq!(json["caches"][0]["type"], "unified");
        assert_eq!(json["gpus"][0]["vendor"], "amd");
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(48 * 1024), "48 KiB");
        assert_eq!(format_bytes(1536 * 1024), "1.5 MiB");
        assert_eq!(format_bytes(8 * 1024 * 1024 * 1024), "8 GiB");
    }
}
