//! Display enumeration
//!
//! No windowing backend is compiled in, so enumeration is always empty.

use serde::{Deserialize, Serialize};

/// One attached display
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DisplayInfo {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Dots per inch
    pub dpi: u32,
    /// Bits per pixel
    pub bpp: u32,
    /// Refresh rate in Hz
    pub refresh_rate: f64,
}

/// Enumerate attached displays
pub fn displays() -> Vec<DisplayInfo> {
    Vec::new()
}
