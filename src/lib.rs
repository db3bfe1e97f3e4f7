//! Thermascan: interactive thermal scan experience
//!
//! Phase-timed frame-processing pipeline for a kiosk "thermal scan":
//! watch a live feed, wait for a subject, run a scripted countdown /
//! scan-line / false-color sequence and present a randomized verdict.
//!
//! ## Architecture
//!
//! - **Phase Controller**: wall-clock finite-state machine, single source
//!   of truth for what should be rendered now
//! - **Frame Compositor**: cover-crop + mirror into the fixed output buffer
//! - **Thermal Blend Engine**: parallel per-pixel false-color remap
//! - **Perception Gate**: presence detection, idle-phase only
//! - **Scan Session Driver**: per-frame loop, camera lifecycle, timers

pub mod config;
pub mod types;
pub mod clock;
pub mod palette;
pub mod compositor;
pub mod blend;
pub mod controller;
pub mod perception;
pub mod camera;
pub mod session;

// Re-export configuration
pub use config::{OutcomeConfig, OutputConfig, PerceptionConfig, PhaseTimings, ScanConfig};

// Re-export commonly used types
pub use types::{
    Detection, FrameBuffer, FrameReport, Outcome, Phase, RawFrame, SessionStatus, SweepDirection,
};

// Re-export pipeline components
pub use clock::{Clock, ManualClock, SystemClock};
pub use compositor::FrameCompositor;
pub use controller::{PhaseController, Transition};
pub use perception::{PerceptionError, PerceptionGate, PresenceModel, ScriptedPresenceModel};
pub use camera::{CameraError, CameraFacing, CameraSource, CaptureRequest, SyntheticCamera};
pub use session::{RenderSink, ScanSession, SessionError, SessionStats};
