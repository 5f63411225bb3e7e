//! Internal error type
//!
//! Probes never surface these to callers; they are logged and the affected
//! fields fall back to their zero/unknown defaults.

use thiserror::Error;

/// Errors raised by fallible steps behind the probes
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("Failed to load compute library: {0}")]
    LibraryLoad(String),

    #[error("Missing compute API symbol: {0}")]
    MissingSymbol(String),

    #[error("Compute API call {call} failed with status {status}")]
    ComputeApi { call: &'static str, status: i32 },
}

pub type Result<T> = std::result::Result<T, ProbeError>;
