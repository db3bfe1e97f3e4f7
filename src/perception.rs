//! Perception gate
//!
//! Wraps the external perception model behind a boolean presence signal.
//! Invoked by the session driver only while the phase is `Idle` — this is
//! an explicit policy so an active scan can never be re-triggered, not an
//! optimization.
//!
//! A model that fails to load permanently disables the gate: it reports
//! "never present" and the session surfaces a visible degraded state
//! instead of hanging silently in `Idle`.

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::types::{Detection, FrameBuffer};

// ============================================================================
// Error Types
// ============================================================================

#[derive(Error, Debug)]
pub enum PerceptionError {
    #[error("Failed to load perception model: {0}")]
    LoadFailed(String),

    #[error("Inference failed: {0}")]
    Inference(String),
}

// ============================================================================
// Model trait
// ============================================================================

/// The external perception model: given a frame, returns zero or more
/// detected subjects. A non-empty list signals presence.
#[async_trait]
pub trait PresenceModel: Send {
    async fn infer(
        &mut self,
        frame: &FrameBuffer,
        timestamp_ms: u64,
    ) -> Result<Vec<Detection>, PerceptionError>;
}

// ============================================================================
// Gate
// ============================================================================

enum GateState {
    Active(Box<dyn PresenceModel>),
    /// Model load failed; the gate reports "not present" forever.
    Disabled(String),
}

/// Phase-gated wrapper around the perception model.
pub struct PerceptionGate {
    state: GateState,
    min_confidence: f32,
    invocations: u64,
}

impl PerceptionGate {
    /// Wrap a successfully loaded model.
    pub fn new(model: Box<dyn PresenceModel>, min_confidence: f32) -> Self {
        Self {
            state: GateState::Active(model),
            min_confidence,
            invocations: 0,
        }
    }

    /// Build a permanently disabled gate from a load failure.
    pub fn disabled(err: &PerceptionError) -> Self {
        error!(error = %err, "Perception model unavailable — gate disabled");
        Self {
            state: GateState::Disabled(err.to_string()),
            min_confidence: 0.0,
            invocations: 0,
        }
    }

    /// Construct from a load attempt, degrading on failure.
    pub fn from_load(
        loaded: Result<Box<dyn PresenceModel>, PerceptionError>,
        min_confidence: f32,
    ) -> Self {
        match loaded {
            Ok(model) => Self::new(model, min_confidence),
            Err(e) => Self::disabled(&e),
        }
    }

    /// Whether the underlying model failed to load.
    pub fn is_degraded(&self) -> bool {
        matches!(self.state, GateState::Disabled(_))
    }

    /// Number of inference calls made. Exposed for observability and the
    /// degraded-path assertions in tests.
    pub fn invocations(&self) -> u64 {
        self.invocations
    }

    /// Run presence detection on one frame.
    ///
    /// Returns true when at least one detection meets the confidence
    /// threshold. Inference errors on individual frames are recoverable:
    /// logged and treated as "not present". A disabled gate returns false
    /// without touching the model.
    pub async fn check_presence(&mut self, frame: &FrameBuffer, timestamp_ms: u64) -> bool {
        let model = match &mut self.state {
            GateState::Active(model) => model,
            GateState::Disabled(reason) => {
                debug!(reason = %reason, "Perception gate disabled — reporting not present");
                return false;
            }
        };

        self.invocations += 1;
        match model.infer(frame, timestamp_ms).await {
            Ok(detections) => {
                let present = detections
                    .iter()
                    .any(|d| d.confidence >= self.min_confidence);
                if present {
                    debug!(
                        detections = detections.len(),
                        timestamp_ms,
                        "Subject presence detected"
                    );
                }
                present
            }
            Err(e) => {
                warn!(error = %e, timestamp_ms, "Inference failed — treating as not present");
                false
            }
        }
    }
}

// ============================================================================
// Scripted model (simulation / tests)
// ============================================================================

/// Presence model that reports a subject after a fixed number of frames,
/// used by the simulation binary and integration tests.
pub struct ScriptedPresenceModel {
    frames_until_present: u64,
    seen: u64,
    confidence: f32,
}

impl ScriptedPresenceModel {
    pub fn present_after(frames: u64) -> Self {
        Self { frames_until_present: frames, seen: 0, confidence: 0.95 }
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence;
        self
    }
}

#[async_trait]
impl PresenceModel for ScriptedPresenceModel {
    async fn infer(
        &mut self,
        _frame: &FrameBuffer,
        _timestamp_ms: u64,
    ) -> Result<Vec<Detection>, PerceptionError> {
        self.seen += 1;
        if self.seen > self.frames_until_present {
            Ok(vec![Detection {
                confidence: self.confidence,
                landmarks: vec![(0.5, 0.4), (0.45, 0.55), (0.55, 0.55)],
            }])
        } else {
            Ok(Vec::new())
        }
    }
}
