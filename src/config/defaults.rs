//! System-wide default constants.
//!
//! Centralises the scan sequence's magic numbers. Grouped by subsystem for
//! easy discovery; every value here can be overridden via `scan_config.toml`.

// ============================================================================
// Output
// ============================================================================

/// Output buffer width (pixels). 9:16 portrait, as the kiosk display runs.
pub const OUTPUT_WIDTH: u32 = 720;

/// Output buffer height (pixels).
pub const OUTPUT_HEIGHT: u32 = 1280;

/// Preferred capture width requested from the camera.
pub const CAPTURE_WIDTH: u32 = 1280;

/// Preferred capture height requested from the camera.
pub const CAPTURE_HEIGHT: u32 = 720;

// ============================================================================
// Phase timings
// ============================================================================

/// Countdown dwell before the sweep starts (seconds).
pub const COUNTDOWN_SECS: f64 = 3.5;

/// Downward / upward scan-line sweep duration (seconds).
pub const SCAN_SECS: f64 = 3.0;

/// Thermal ramp duration within a hold phase (seconds).
pub const THERMAL_RAMP_SECS: f64 = 3.0;

/// First hold dwell, after the downward sweep (seconds).
pub const HOLD_DOWN_SECS: f64 = 3.0;

/// Second hold dwell, after the upward sweep (seconds).
///
/// Longer than the ramp: 1 s reveal delay + 2 s readout animation + 2 s
/// steady display.
pub const HOLD_UP_SECS: f64 = 5.0;

/// Result screen dwell before auto-reset (seconds).
pub const RESULT_DWELL_SECS: f64 = 5.0;

/// Thermal fade-out window at the start of the result phase (seconds).
pub const RESULT_FADE_SECS: f64 = 1.0;

// ============================================================================
// Outcome
// ============================================================================

/// Probability of the favorable ("cool") verdict.
pub const FAVORABLE_PROBABILITY: f64 = 0.9;

/// Displayed temperature range for a favorable verdict, [lo, hi).
pub const FAVORABLE_RANGE: (f64, f64) = (80.0, 90.0);

/// Displayed temperature range for an unfavorable verdict, [lo, hi).
pub const UNFAVORABLE_RANGE: (f64, f64) = (90.0, 100.0);

/// Delay before the temperature readout is revealed (seconds).
pub const REVEAL_DELAY_SECS: f64 = 1.0;

/// Window over which the readout animates up to its target (seconds).
pub const REVEAL_WINDOW_SECS: f64 = 2.0;

/// Starting value of the animated readout.
pub const REVEAL_START_VALUE: f64 = 10.0;

// ============================================================================
// Perception
// ============================================================================

/// Minimum detection confidence for a presence trigger.
pub const MIN_DETECTION_CONFIDENCE: f32 = 0.3;
