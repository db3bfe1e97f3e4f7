//! Camera acquisition
//!
//! The camera is the one stateful external resource in the pipeline. It is
//! consumed through the `CameraSource` trait; `open`/`close` are strictly
//! paired by the session driver (open at session start and on re-entry to
//! `Idle`, close at `Result` entry and at teardown) and `close` is
//! idempotent.
//!
//! `SyntheticCamera` is the reference implementation used by the simulation
//! binary and the integration tests: it renders a moving warm blob over a
//! cool gradient, at a configurable frame cadence.

use async_trait::async_trait;
use thiserror::Error;

use crate::types::RawFrame;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Error, Debug)]
pub enum CameraError {
    #[error("No camera device available")]
    NoDevice,

    #[error("Camera permission denied")]
    PermissionDenied,

    #[error("Camera disconnected: {0}")]
    Disconnected(String),

    #[error("Frame acquisition failed: {0}")]
    Frame(String),
}

// ============================================================================
// Trait
// ============================================================================

/// Which way the camera faces. The scan experience uses the front camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CameraFacing {
    #[default]
    Front,
    Rear,
}

/// Capture parameters requested at `open`. The device may deliver a
/// different resolution; the compositor handles the mismatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureRequest {
    pub width: u32,
    pub height: u32,
    pub facing: CameraFacing,
}

/// A stream of raw frames from an acquisition device.
#[async_trait]
pub trait CameraSource: Send {
    /// Acquire the device. Fails with `NoDevice` or `PermissionDenied`
    /// when the environment cannot supply a stream.
    async fn open(&mut self, request: CaptureRequest) -> Result<(), CameraError>;

    /// Pull the next frame. May return a frame with an unchanged timestamp
    /// when no new data has arrived; the driver skips those.
    async fn next_frame(&mut self) -> Result<RawFrame, CameraError>;

    /// Release the device. Idempotent — safe to call when already closed.
    async fn close(&mut self);

    fn is_open(&self) -> bool;
}

// ============================================================================
// Synthetic Camera
// ============================================================================

/// Deterministic synthetic camera for simulation and tests.
///
/// Produces a vertical luminance gradient with a bright elliptical blob
/// orbiting the center, so the thermal remap has visible structure. Frame
/// timestamps advance by the configured interval; when `frame_interval_ms`
/// is zero the same timestamp repeats (useful for stale-frame tests).
pub struct SyntheticCamera {
    width: u32,
    height: u32,
    frame_interval_ms: u64,
    frame_index: u64,
    open: bool,
}

impl SyntheticCamera {
    pub fn new(frame_interval_ms: u64) -> Self {
        Self {
            width: 0,
            height: 0,
            frame_interval_ms,
            frame_index: 0,
            open: false,
        }
    }

    fn render(&self, index: u64) -> RawFrame {
        let (w, h) = (self.width as usize, self.height as usize);
        let mut pixels = vec![0u8; w * h * 3];

        // Blob center orbits slowly with the frame index
        let angle = index as f32 * 0.05;
        let cx = w as f32 * (0.5 + 0.2 * angle.cos());
        let cy = h as f32 * (0.5 + 0.2 * angle.sin());
        let radius = (w.min(h) as f32) * 0.18;

        for y in 0..h {
            let base = (y * 255 / h.max(1)) as f32;
            for x in 0..w {
                let dx = x as f32 - cx;
                let dy = y as f32 - cy;
                let d = (dx * dx + dy * dy).sqrt();
                let glow = if d < radius {
                    (1.0 - d / radius) * 160.0
                } else {
                    0.0
                };
                let v = (base + glow).min(255.0) as u8;
                let i = (y * w + x) * 3;
                pixels[i] = v;
                pixels[i + 1] = v;
                pixels[i + 2] = v.saturating_add(20);
            }
        }

        RawFrame {
            width: self.width,
            height: self.height,
            pixels,
            timestamp_ms: index * self.frame_interval_ms,
        }
    }
}

#[async_trait]
impl CameraSource for SyntheticCamera {
    async fn open(&mut self, request: CaptureRequest) -> Result<(), CameraError> {
        self.width = request.width;
        self.height = request.height;
        self.open = true;
        tracing::info!(
            width = request.width,
            height = request.height,
            facing = ?request.facing,
            "Synthetic camera opened"
        );
        Ok(())
    }

    async fn next_frame(&mut self) -> Result<RawFrame, CameraError> {
        if !self.open {
            return Err(CameraError::Disconnected("camera is closed".to_string()));
        }
        let frame = self.render(self.frame_index);
        self.frame_index += 1;
        Ok(frame)
    }

    async fn close(&mut self) {
        if self.open {
            tracing::info!("Synthetic camera closed");
        }
        self.open = false;
    }

    fn is_open(&self) -> bool {
        self.open
    }
}

/// A camera that always fails to open, for degraded-state tests.
pub struct UnavailableCamera {
    error_kind: fn() -> CameraError,
}

impl UnavailableCamera {
    pub fn no_device() -> Self {
        Self { error_kind: || CameraError::NoDevice }
    }

    pub fn permission_denied() -> Self {
        Self { error_kind: || CameraError::PermissionDenied }
    }
}

#[async_trait]
impl CameraSource for UnavailableCamera {
    async fn open(&mut self, _request: CaptureRequest) -> Result<(), CameraError> {
        Err((self.error_kind)())
    }

    async fn next_frame(&mut self) -> Result<RawFrame, CameraError> {
        Err(CameraError::Disconnected("camera never opened".to_string()))
    }

    async fn close(&mut self) {}

    fn is_open(&self) -> bool {
        false
    }
}
