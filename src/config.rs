//! Configuration management for hwprobe
//!
//! Config file location:
//! - Linux: ~/.config/hwprobe/config.toml
//! - macOS: ~/Library/Application Support/org.hwprobe.hwprobe/config.toml
//! - Windows: %APPDATA%/hwprobe/hwprobe/config/config.toml
//!
//! You can override the config location by setting `HWPROBE_CONFIG_PATH`.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::hardware::cpu::{CpuSources, DEFAULT_CPUINFO_PATH, DEFAULT_CPU_SYSFS_ROOT};
use crate::hardware::gpu::GpuOptions;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// CPU data source locations
    #[serde(default)]
    pub sources: SourcesConfig,

    /// GPU enumeration settings
    #[serde(default)]
    pub gpu: GpuConfig,

    /// Report defaults for the command-line front end
    #[serde(default)]
    pub report: ReportConfig,
}

impl Config {
    /// Load configuration from file or create default
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from `config_path`, defaulting if it does not exist
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            let content = fs::read_to_string(config_path)
                .with_context(|| format!("Failed to read config from {}", config_path.display()))?;

            let config: Config = toml::from_str(&content).with_context(|| {
                format!("Failed to parse config from {}", config_path.display())
            })?;

            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Save configuration to `config_path`, creating parent directories
    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        fs::write(config_path, toml)
            .with_context(|| format!("Failed to write config to {}", config_path.display()))?;

        Ok(())
    }

    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        if let Ok(path) = std::env::var("HWPROBE_CONFIG_PATH") {
            let trimmed = path.trim();
            if !trimmed.is_empty() {
                return Ok(PathBuf::from(trimmed));
            }
        }

        let proj_dirs = ProjectDirs::from("org", "hwprobe", "hwprobe")
            .context("Could not determine project directories")?;

        Ok(proj_dirs.config_dir().join("config.toml"))
    }

    /// Create default config file if it doesn't exist
    pub fn init() -> Result<Self> {
        let config = Self::load()?;

        let config_path = Self::config_path()?;
        if !config_path.exists() {
            config.save()?;
        }

        Ok(config)
    }

    /// CPU data sources described by this config
    pub fn cpu_sources(&self) -> CpuSources {
        CpuSources::new(&self.sources.cpuinfo_path, &self.sources.cpu_sysfs_root)
    }

    /// GPU enumeration options described by this config
    pub fn gpu_options(&self) -> GpuOptions {
        GpuOptions {
            enabled: self.gpu.enabled,
            library: self.gpu.opencl_library.clone(),
        }
    }
}

/// CPU data source locations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    /// Per-processor descriptor table
    #[serde(default = "default_cpuinfo_path")]
    pub cpuinfo_path: PathBuf,

    /// Root of the per-CPU sysfs tree
    #[serde(default = "default_cpu_sysfs_root")]
    pub cpu_sysfs_root: PathBuf,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            cpuinfo_path: default_cpuinfo_path(),
            cpu_sysfs_root: default_cpu_sysfs_root(),
        }
    }
}

fn default_cpuinfo_path() -> PathBuf {
    PathBuf::from(DEFAULT_CPUINFO_PATH)
}

fn default_cpu_sysfs_root() -> PathBuf {
    PathBuf::from(DEFAULT_CPU_SYSFS_ROOT)
}

/// GPU configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GpuConfig {
    /// Enumerate compute devices at all
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Explicit OpenCL ICD loader path (platform default when unset)
    pub opencl_library: Option<PathBuf>,
}

impl Default for GpuConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            opencl_library: None,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Output format for reports
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Report configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Cache levels (sysfs index numbers) included in a full report
    #[serde(default = "default_cache_levels")]
    pub cache_levels: Vec<u32>,

    /// Default output format
    #[serde(default)]
    pub format: OutputFormat,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            cache_levels: default_cache_levels(),
            format: OutputFormat::default(),
        }
    }
}

fn default_cache_levels() -> Vec<u32> {
    vec![0, 1, 2, 3]
}

/// Get configuration file path for display purposes
pub fn get_config_path() -> Result<String> {
    let path = Config::config_path()?;
    Ok(path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.sources.cpuinfo_path, PathBuf::from("/proc/cpuinfo"));
        assert_eq!(
            config.sources.cpu_sysfs_root,
            PathBuf::from("/sys/devices/system/cpu")
        );
        assert!(config.gpu.enabled);
        assert!(config.gpu.opencl_library.is_none());
        assert_eq!(config.report.cache_levels, vec![0, 1, 2, 3]);
        assert_eq!(config.report.format, OutputFormat::Text);
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml = toml::to_string(&config).unwrap();

        assert!(toml.contains("[sources]"));
        assert!(toml.contains("cpuinfo_path"));
        assert!(toml.contains("[gpu]"));
        assert!(toml.contains("cache_levels"));
        assert!(toml.contains("format = \"text\""));
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [gpu]
            enabled = false

            [report]
            format = "json"
            "#,
        )
        .unwrap();

        assert!(!config.gpu.enabled);
        assert_eq!(config.report.format, OutputFormat::Json);
        assert_eq!(config.report.cache_levels, vec![0, 1, 2, 3]);
        assert_eq!(config.sources.cpuinfo_path, PathBuf::from("/proc/cpuinfo"));
        assert!(!config.gpu_options().enabled);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.sources.cpuinfo_path = temp_dir.path().join("cpuinfo");
        config.gpu.opencl_library = Some(PathBuf::from("/opt/cl/libOpenCL.so"));
        config.report.cache_levels = vec![2, 3];
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.sources.cpuinfo_path, temp_dir.path().join("cpuinfo"));
        assert_eq!(loaded.report.cache_levels, vec![2, 3]);
        assert_eq!(
            loaded.gpu_options().library,
            Some(PathBuf::from("/opt/cl/libOpenCL.so"))
        );
        assert_eq!(loaded.cpu_sources().cpuinfo, temp_dir.path().join("cpuinfo"));
    }

    #[test]
    fn test_missing_file_loads_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::load_from(&temp_dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.report.cache_levels, default_cache_levels());
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "[report\ncache_levels = ").unwrap();

        assert!(Config::load_from(&path).is_err());
    }
}
