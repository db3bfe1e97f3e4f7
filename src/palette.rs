//! False-color thermal palette
//!
//! Maps a luminance sample to an RGB triple via piecewise-linear
//! interpolation across five bands (blue → cyan → green → yellow → red →
//! orange). Pure and stateless; the blend engine reads it through a
//! 256-entry lookup table built once.

use std::sync::OnceLock;

/// Band edges on the normalized 0..1 luminance range.
const BAND_CYAN: f32 = 0.30;
const BAND_GREEN: f32 = 0.35;
const BAND_YELLOW: f32 = 0.50;
const BAND_RED: f32 = 0.75;

/// Map a luminance value (0..=255) to a false-color RGB triple.
///
/// Interpolated channels truncate toward zero, matching the display
/// convention of the rest of the pipeline.
pub fn color_for(luminance: u8) -> (u8, u8, u8) {
    let n = f32::from(luminance) / 255.0;

    if n < BAND_CYAN {
        // Blue to cyan: green ramps up
        let t = n / BAND_CYAN;
        (0, (t * 255.0) as u8, 255)
    } else if n < BAND_GREEN {
        // Cyan to green: blue ramps out over a short band
        let t = (n - BAND_CYAN) / (BAND_GREEN - BAND_CYAN);
        (0, 255, (255.0 * (1.0 - t)) as u8)
    } else if n < BAND_YELLOW {
        // Green to yellow: red ramps in
        let t = (n - BAND_GREEN) / (BAND_YELLOW - BAND_GREEN);
        ((t * 255.0) as u8, 255, 0)
    } else if n < BAND_RED {
        // Yellow to red: green ramps out
        let t = (n - BAND_YELLOW) / (BAND_RED - BAND_YELLOW);
        (255, (255.0 * (1.0 - t)) as u8, 0)
    } else {
        // Red to orange: green ramps up to 165
        let t = (n - BAND_RED) / (1.0 - BAND_RED);
        (255, (t * 165.0) as u8, 0)
    }
}

/// Full 256-entry palette, built on first use.
pub fn lut() -> &'static [(u8, u8, u8); 256] {
    static LUT: OnceLock<[(u8, u8, u8); 256]> = OnceLock::new();
    LUT.get_or_init(|| {
        let mut table = [(0u8, 0u8, 0u8); 256];
        for (l, entry) in table.iter_mut().enumerate() {
            *entry = color_for(l as u8);
        }
        table
    })
}
