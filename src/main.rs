//! hwprobe - print static hardware properties
//!
//! Thin front end over the `hwprobe` library: every subcommand runs one
//! probe and prints the snapshot as a text table or JSON.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use hwprobe::config::{self, Config, OutputFormat};
use hwprobe::hardware::{format_bytes, LevelCache, NativeProbe, SystemInfo, SystemProbe};

/// hwprobe - query CPU topology, caches, GPUs and displays
#[derive(Parser)]
#[command(name = "hwprobe")]
#[command(version)]
#[command(about = "Query static hardware properties")]
struct Cli {
    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    /// Log probe diagnostics to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect and display everything (default)
    Detect,

    /// Logical processor, processor record and package counts
    Quantities,

    /// Cache geometry for one or more levels
    Cache {
        /// sysfs cache index (repeatable); defaults to the configured levels
        #[arg(short, long)]
        level: Vec<u32>,
    },

    /// Compute devices
    Gpus,

    /// Attached displays
    Displays,

    /// Show or initialize the configuration file
    Config {
        /// Write the default config if none exists
        #[arg(long)]
        init: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = Config::load()?;
    let format = if cli.json {
        OutputFormat::Json
    } else {
        config.report.format
    };
    let probe = NativeProbe::from_config(&config);

    match cli.command {
        Some(Commands::Detect) | None => {
            let info = SystemInfo::detect(&probe, &config.report.cache_levels);
            match format {
                OutputFormat::Json => print_json(&info)?,
                OutputFormat::Text => println!("{}", info.display()),
            }
        }
        Some(Commands::Quantities) => {
            let quantities = probe.quantities();
            match format {
                OutputFormat::Json => print_json(&quantities)?,
                OutputFormat::Text => {
                    println!("{}", "CPU quantities".bright_cyan().bold());
                    println!("  Logical processors: {}", quantities.logical);
                    println!("  Processor records:  {}", quantities.physical);
                    println!("  Packages:           {}", quantities.packages);
                }
            }
        }
        Some(Commands::Cache { level }) => {
            let levels = if level.is_empty() {
                config.report.cache_levels.clone()
            } else {
                level
            };
            let caches: Vec<LevelCache> = levels
                .into_iter()
                .map(|level| LevelCache {
                    level,
                    cache: probe.cache(level),
                })
                .collect();

            match format {
                OutputFormat::Json => print_json(&caches)?,
                OutputFormat::Text => {
                    for entry in &caches {
                        println!("{}", format!("Cache index{}", entry.level).bright_cyan().bold());
                        println!("  Size:          {}", format_bytes(entry.cache.size));
                        println!("  Line size:     {} B", entry.cache.line_size);
                        println!("  Associativity: {}", entry.cache.associativity);
                        println!("  Type:          {}", entry.cache.cache_type);
                    }
                }
            }
        }
        Some(Commands::Gpus) => {
            let gpus = probe.device_properties();
            match format {
                OutputFormat::Json => print_json(&gpus)?,
                OutputFormat::Text => {
                    if gpus.is_empty() {
                        println!("{}", "No compute devices found".yellow());
                    }
                    for gpu in &gpus {
                        println!("{} ({})", gpu.name.bright_cyan().bold(), gpu.vendor);
                        println!("  Memory: {}", format_bytes(gpu.memory_size));
                        println!("  Cache:  {}", format_bytes(gpu.cache_size));
                    }
                }
            }
        }
        Some(Commands::Displays) => {
            let displays = probe.displays();
            match format {
                OutputFormat::Json => print_json(&displays)?,
                OutputFormat::Text => {
                    if displays.is_empty() {
                        println!("{}", "No displays found".yellow());
                    }
                    for display in &displays {
                        println!(
                            "{}x{} @ {:.0} Hz, {} dpi, {} bpp",
                            display.width,
                            display.height,
                            display.refresh_rate,
                            display.dpi,
                            display.bpp
                        );
                    }
                }
            }
        }
        Some(Commands::Config { init }) => {
            if init {
                Config::init()?;
            }
            println!("{}", config::get_config_path()?);
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", json);
    Ok(())
}
