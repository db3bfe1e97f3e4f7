//! Shared data structures for the thermal scan pipeline
//!
//! This module defines the core types flowing through the scan session:
//! - RawFrame (camera output) and FrameBuffer (composited RGB pixels)
//! - Phase (the scan sequence state machine variants)
//! - Outcome (the sampled scan verdict)
//! - Detection (perception model output, consumed as a presence signal)
//! - FrameReport (per-frame tuple handed to the render collaborator)

use serde::{Deserialize, Serialize};

// ============================================================================
// Frames
// ============================================================================

/// A raw frame as delivered by a camera source.
///
/// Pixels are tightly packed RGB, row-major, `width * height * 3` bytes.
/// The timestamp is the capture time in milliseconds; the session driver
/// uses it to detect repeated (stale) frames.
#[derive(Debug, Clone)]
pub struct RawFrame {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
    pub timestamp_ms: u64,
}

impl RawFrame {
    /// Check that the pixel vector matches the declared dimensions.
    pub fn is_well_formed(&self) -> bool {
        self.pixels.len() == (self.width as usize) * (self.height as usize) * 3
    }
}

/// A fixed-size mutable RGB pixel buffer, produced fresh every frame by the
/// compositor and owned exclusively by the session driver for the duration
/// of one frame's processing. Never retained across frames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl FrameBuffer {
    /// Allocate a black buffer of the given dimensions.
    pub fn black(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0u8; (width as usize) * (height as usize) * 3],
        }
    }

    /// Wrap an existing RGB byte vector. Returns `None` when the length
    /// does not match `width * height * 3`.
    pub fn from_rgb(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        if data.len() == (width as usize) * (height as usize) * 3 {
            Some(Self { width, height, data })
        } else {
            None
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Bytes per row (`width * 3`).
    pub fn row_bytes(&self) -> usize {
        self.width as usize * 3
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Read the RGB triple at (x, y). Out-of-bounds reads return black;
    /// the compositor guarantees in-bounds access on the hot path.
    pub fn pixel(&self, x: u32, y: u32) -> (u8, u8, u8) {
        if x >= self.width || y >= self.height {
            return (0, 0, 0);
        }
        let i = (y as usize * self.width as usize + x as usize) * 3;
        (self.data[i], self.data[i + 1], self.data[i + 2])
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, rgb: (u8, u8, u8)) {
        if x >= self.width || y >= self.height {
            return;
        }
        let i = (y as usize * self.width as usize + x as usize) * 3;
        self.data[i] = rgb.0;
        self.data[i + 1] = rgb.1;
        self.data[i + 2] = rgb.2;
    }
}

// ============================================================================
// Scan Phases
// ============================================================================

/// Scan sequence phase. Exactly one is active at a time, owned by the
/// phase controller.
///
/// Transitions are timer-driven except `Idle -> Countdown`, which fires on
/// a perception trigger. `Result` is terminal for a session; after its dwell
/// the controller returns to `Idle` and the driver re-acquires the camera.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, Hash)]
pub enum Phase {
    #[default]
    Idle,
    Countdown,
    ScanDown,
    ThermalHoldDown,
    ScanUp,
    ThermalHoldUp,
    Result,
}

impl Phase {
    /// Short code for logging.
    pub fn short_code(&self) -> &'static str {
        match self {
            Phase::Idle => "IDLE",
            Phase::Countdown => "COUNT",
            Phase::ScanDown => "SCAN-DN",
            Phase::ThermalHoldDown => "HOLD-DN",
            Phase::ScanUp => "SCAN-UP",
            Phase::ThermalHoldUp => "HOLD-UP",
            Phase::Result => "RESULT",
        }
    }

    /// Whether the thermal blend is applied during this phase.
    ///
    /// `ScanUp` holds the overlay at full intensity between the two ramps;
    /// `Result` fades it out over its first second.
    pub fn is_thermal(&self) -> bool {
        matches!(
            self,
            Phase::ThermalHoldDown | Phase::ScanUp | Phase::ThermalHoldUp | Phase::Result
        )
    }

    /// Direction of the scan-line sweep, for the render collaborator.
    pub fn sweep_direction(&self) -> Option<SweepDirection> {
        match self {
            Phase::ScanDown => Some(SweepDirection::Down),
            Phase::ScanUp => Some(SweepDirection::Up),
            _ => None,
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Idle => write!(f, "Idle"),
            Phase::Countdown => write!(f, "Countdown"),
            Phase::ScanDown => write!(f, "Scan Down"),
            Phase::ThermalHoldDown => write!(f, "Thermal Hold (Down)"),
            Phase::ScanUp => write!(f, "Scan Up"),
            Phase::ThermalHoldUp => write!(f, "Thermal Hold (Up)"),
            Phase::Result => write!(f, "Result"),
        }
    }
}

/// Scan-line sweep direction (overlay chrome, rendered by the collaborator).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SweepDirection {
    Down,
    Up,
}

// ============================================================================
// Outcome
// ============================================================================

/// The sampled scan verdict. Created once on entering `ThermalHoldUp`,
/// immutable thereafter, cleared when the session resets to `Idle`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Outcome {
    /// True for the "cool" verdict, false for the "hot" one.
    pub favorable: bool,
    /// Simulated temperature shown to the subject. Uniform in the
    /// configured favorable/unfavorable range; not a physical measurement.
    pub display_value: f64,
    /// Result banner text for the render collaborator.
    pub message: String,
}

// ============================================================================
// Perception
// ============================================================================

/// A single subject detection from the perception model.
///
/// Consumed by the gate purely as a presence signal; landmarks are carried
/// through for the render collaborator but never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub confidence: f32,
    /// Normalized (x, y) landmark positions, if the model provides them.
    pub landmarks: Vec<(f32, f32)>,
}

// ============================================================================
// Per-frame report
// ============================================================================

/// Session availability state surfaced to the render collaborator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum SessionStatus {
    #[default]
    Running,
    /// Camera failed to open or was lost; the frame loop is not running.
    CameraUnavailable,
    /// Perception model failed to load; the session can never leave `Idle`
    /// on its own. Surfaced visibly rather than hanging silently.
    PerceptionUnavailable,
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionStatus::Running => write!(f, "Running"),
            SessionStatus::CameraUnavailable => write!(f, "Camera Unavailable"),
            SessionStatus::PerceptionUnavailable => write!(f, "Perception Unavailable"),
        }
    }
}

/// Everything the render collaborator needs for one frame, besides the
/// finished pixel buffer: current phase, blend progress, countdown digit,
/// sweep direction, outcome and the animated temperature readout.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FrameReport {
    pub phase: Phase,
    pub progress: f32,
    pub countdown: Option<u32>,
    pub sweep: Option<SweepDirection>,
    pub outcome: Option<Outcome>,
    /// Animated temperature readout, present only once revealed.
    pub displayed_temperature: Option<f64>,
    pub status: SessionStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_buffer_pixel_roundtrip() {
        let mut buf = FrameBuffer::black(4, 3);
        buf.set_pixel(2, 1, (10, 20, 30));
        assert_eq!(buf.pixel(2, 1), (10, 20, 30));
        assert_eq!(buf.pixel(0, 0), (0, 0, 0));
        // Out-of-bounds is a no-op, not a panic
        buf.set_pixel(99, 99, (1, 2, 3));
        assert_eq!(buf.pixel(99, 99), (0, 0, 0));
    }

    #[test]
    fn frame_buffer_from_rgb_validates_length() {
        assert!(FrameBuffer::from_rgb(2, 2, vec![0u8; 12]).is_some());
        assert!(FrameBuffer::from_rgb(2, 2, vec![0u8; 11]).is_none());
    }

    #[test]
    fn thermal_phases() {
        assert!(!Phase::Idle.is_thermal());
        assert!(!Phase::Countdown.is_thermal());
        assert!(!Phase::ScanDown.is_thermal());
        assert!(Phase::ThermalHoldDown.is_thermal());
        assert!(Phase::ScanUp.is_thermal());
        assert!(Phase::ThermalHoldUp.is_thermal());
        assert!(Phase::Result.is_thermal());
    }

    #[test]
    fn sweep_directions() {
        assert_eq!(Phase::ScanDown.sweep_direction(), Some(SweepDirection::Down));
        assert_eq!(Phase::ScanUp.sweep_direction(), Some(SweepDirection::Up));
        assert_eq!(Phase::Idle.sweep_direction(), None);
    }
}
