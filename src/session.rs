//! Scan session driver
//!
//! Orchestrates the per-frame loop: pull a frame, composite it, gate
//! perception while idle, ask the controller for `(phase, progress)`, blend
//! when the phase calls for it, and hand the finished buffer to the render
//! sink. Also owns the camera lifecycle (open at session start and on
//! re-entry to `Idle`, close at `Result` entry and at teardown) and the
//! scheduling of phase-exit timers.
//!
//! Phase timers run as their own tokio tasks tagged with the controller
//! generation, so dropped or stalled frames never stall a transition, and a
//! timer that fires after its phase was superseded is discarded by the
//! generation check. The frame loop and timer callbacks serialize through
//! the controller mutex; the lock is never held across an await.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::blend;
use crate::camera::{CameraError, CameraFacing, CameraSource, CaptureRequest};
use crate::clock::Clock;
use crate::compositor::FrameCompositor;
use crate::config::ScanConfig;
use crate::controller::PhaseController;
use crate::perception::PerceptionGate;
use crate::types::{FrameBuffer, FrameReport, Phase, SessionStatus};

/// Pause between loop iterations while the camera is closed (`Result`
/// dwell) or a frame was stale.
const IDLE_TICK: Duration = Duration::from_millis(25);

// ============================================================================
// Errors
// ============================================================================

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Camera acquisition failed: {0}")]
    Acquisition(#[from] CameraError),
}

// ============================================================================
// Render sink
// ============================================================================

/// The render-target collaborator: receives the finished buffer plus the
/// per-frame report. Rendering chrome (borders, banners, countdown glyphs,
/// the scan line itself) is entirely the sink's concern.
pub trait RenderSink: Send {
    fn present(&mut self, frame: &FrameBuffer, report: &FrameReport);
}

/// Sink that counts presentations and remembers the last report. Used by
/// tests and as a stand-in when no display is attached.
#[derive(Debug, Default)]
pub struct CountingSink {
    pub presented: u64,
    pub last_report: Option<FrameReport>,
}

impl RenderSink for CountingSink {
    fn present(&mut self, _frame: &FrameBuffer, report: &FrameReport) {
        self.presented += 1;
        self.last_report = Some(report.clone());
    }
}

// ============================================================================
// Session
// ============================================================================

/// Aggregate counters for one driver run.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionStats {
    pub frames_processed: u64,
    pub frames_stale: u64,
    pub scans_completed: u64,
}

impl std::fmt::Display for SessionStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Session: {} frames ({} stale skipped), {} scans completed",
            self.frames_processed, self.frames_stale, self.scans_completed
        )
    }
}

/// The per-frame loop and resource owner.
pub struct ScanSession<C: CameraSource, S: RenderSink> {
    camera: C,
    gate: PerceptionGate,
    compositor: FrameCompositor,
    controller: Arc<Mutex<PhaseController<StdRng>>>,
    clock: Arc<dyn Clock>,
    sink: S,
    config: ScanConfig,
    cancel: CancellationToken,
    status: SessionStatus,
    stats: SessionStats,
    last_frame_ts: Option<u64>,
    /// Generation of the most recently scheduled phase timer.
    scheduled_generation: u64,
}

impl<C: CameraSource, S: RenderSink> ScanSession<C, S> {
    pub fn new(
        camera: C,
        gate: PerceptionGate,
        config: ScanConfig,
        clock: Arc<dyn Clock>,
        sink: S,
        seed: u64,
        cancel: CancellationToken,
    ) -> Self {
        let controller = PhaseController::new(
            config.timings.clone(),
            config.outcome.clone(),
            StdRng::seed_from_u64(seed),
            clock.now(),
        );
        let compositor = FrameCompositor::new(config.output.width, config.output.height);
        Self {
            camera,
            gate,
            compositor,
            controller: Arc::new(Mutex::new(controller)),
            clock,
            sink,
            config,
            cancel,
            status: SessionStatus::Running,
            stats: SessionStats::default(),
            last_frame_ts: None,
            scheduled_generation: 0,
        }
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    /// How many times the perception gate ran inference.
    pub fn gate_invocations(&self) -> u64 {
        self.gate.invocations()
    }

    fn capture_request(&self) -> CaptureRequest {
        CaptureRequest {
            width: self.config.output.capture_width,
            height: self.config.output.capture_height,
            facing: CameraFacing::Front,
        }
    }

    fn lock_controller(&self) -> std::sync::MutexGuard<'_, PhaseController<StdRng>> {
        // A poisoned controller mutex means a panic already escaped a lock
        // holder; recover the state rather than cascade.
        self.controller.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Run the session until cancelled.
    ///
    /// A camera that fails to open puts the session into
    /// `CameraUnavailable`, notifies the sink once with a black frame, and
    /// returns — the frame loop never spins against a missing source and
    /// the perception gate is never called.
    pub async fn run(&mut self) -> Result<(), SessionError> {
        if let Err(e) = self.camera.open(self.capture_request()).await {
            error!(error = %e, "Camera unavailable — session cannot start");
            self.status = SessionStatus::CameraUnavailable;
            self.present_degraded();
            return Err(SessionError::Acquisition(e));
        }

        if self.gate.is_degraded() {
            // The scan can never trigger; keep the preview running but make
            // the degradation visible instead of hanging in Idle.
            warn!("Perception unavailable — session will not trigger scans");
            self.status = SessionStatus::PerceptionUnavailable;
        }

        info!("Scan session started");

        loop {
            if self.cancel.is_cancelled() {
                break;
            }

            // Wall-clock transitions first, so camera lifecycle reacts even
            // when no frame arrives this iteration. Transitions may also be
            // applied by a timer task between iterations, so the camera is
            // reconciled against the current phase rather than against the
            // transition list.
            let now = self.clock.now();
            self.lock_controller().advance(now);
            self.reconcile_camera().await?;
            self.schedule_phase_timer();

            if !self.camera.is_open() {
                // Result dwell: the camera is released, wait for the timer
                // to bring the controller back to Idle.
                tokio::time::sleep(IDLE_TICK).await;
                continue;
            }

            let raw = match self.camera.next_frame().await {
                Ok(frame) => frame,
                Err(e) => {
                    error!(error = %e, "Camera lost mid-session");
                    self.status = SessionStatus::CameraUnavailable;
                    self.present_degraded();
                    return Err(SessionError::Acquisition(e));
                }
            };

            // A repeated timestamp carries no new data: skip silently.
            if self.last_frame_ts == Some(raw.timestamp_ms) {
                self.stats.frames_stale += 1;
                tokio::time::sleep(IDLE_TICK).await;
                continue;
            }
            self.last_frame_ts = Some(raw.timestamp_ms);

            let mut buffer = self.compositor.compose(&raw, self.config.output.mirror);

            // Perception runs only while idle, by policy.
            let idle = self.lock_controller().phase() == Phase::Idle;
            if idle && self.gate.check_presence(&buffer, raw.timestamp_ms).await {
                let now = self.clock.now();
                if self.lock_controller().trigger_presence(now).is_some() {
                    self.schedule_phase_timer();
                }
            }

            let now = self.clock.now();
            let (progress, thermal, report) = {
                let controller = self.lock_controller();
                (
                    controller.progress(now),
                    controller.phase().is_thermal(),
                    controller.snapshot(now, self.status),
                )
            };

            if thermal && progress > 0.0 {
                blend::apply(&mut buffer, progress);
            }

            self.sink.present(&buffer, &report);
            self.stats.frames_processed += 1;

            // Yield so timer tasks get a chance to run even when the camera
            // delivers frames back-to-back.
            tokio::task::yield_now().await;
        }

        info!(stats = %self.stats, "Scan session stopped");
        self.camera.close().await;
        Ok(())
    }

    /// Camera lifecycle: released at `Result` entry, re-acquired on the
    /// return to `Idle`. Phrased as reconciliation against the current
    /// phase so it holds no matter whether the frame loop or a timer task
    /// applied the transition. Both directions are idempotent.
    async fn reconcile_camera(&mut self) -> Result<(), SessionError> {
        let phase = self.lock_controller().phase();
        match phase {
            Phase::Result if self.camera.is_open() => {
                debug!("Result entered — releasing camera");
                self.camera.close().await;
                self.stats.scans_completed += 1;
            }
            Phase::Idle if !self.camera.is_open() => {
                debug!("Returned to Idle — re-acquiring camera");
                self.last_frame_ts = None;
                if let Err(e) = self.camera.open(self.capture_request()).await {
                    error!(error = %e, "Camera re-acquisition failed");
                    self.status = SessionStatus::CameraUnavailable;
                    self.present_degraded();
                    return Err(SessionError::Acquisition(e));
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Schedule a one-shot exit timer for the current phase, tagged with
    /// the controller generation. Idle has no timer; re-entry with the same
    /// generation is a no-op. The task is cancelled with the session; a
    /// stale generation is discarded inside `on_timer`.
    fn schedule_phase_timer(&mut self) {
        let (generation, remaining) = {
            let controller = self.lock_controller();
            let Some(duration) = controller.current_phase_duration() else {
                return;
            };
            (controller.generation(), duration)
        };
        if generation == self.scheduled_generation {
            return;
        }
        self.scheduled_generation = generation;

        let controller = Arc::clone(&self.controller);
        let clock = Arc::clone(&self.clock);
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                () = cancel.cancelled() => {}
                () = tokio::time::sleep(remaining) => {
                    let now = clock.now();
                    let mut guard = controller.lock().unwrap_or_else(|e| e.into_inner());
                    let applied = guard.on_timer(generation, now);
                    if !applied.is_empty() {
                        debug!(generation, transitions = applied.len(), "Phase timer fired");
                    }
                }
            }
        });
    }

    /// Tell the sink about a degraded state, once, with a black buffer.
    fn present_degraded(&mut self) {
        let now = self.clock.now();
        let report = self.lock_controller().snapshot(now, self.status);
        let black = FrameBuffer::black(self.config.output.width, self.config.output.height);
        self.sink.present(&black, &report);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::{SyntheticCamera, UnavailableCamera};
    use crate::clock::SystemClock;
    use crate::config::{PhaseTimings, ScanConfig};
    use crate::perception::{PerceptionError, PerceptionGate, ScriptedPresenceModel};

    /// Millisecond-scale timings so a full scripted sequence fits in a
    /// fast test.
    fn fast_config() -> ScanConfig {
        let mut config = ScanConfig::default();
        config.output.width = 36;
        config.output.height = 64;
        config.output.capture_width = 64;
        config.output.capture_height = 48;
        config.timings = PhaseTimings {
            countdown_secs: 0.05,
            scan_secs: 0.04,
            thermal_ramp_secs: 0.04,
            hold_down_secs: 0.04,
            hold_up_secs: 0.08,
            result_dwell_secs: 0.06,
            result_fade_secs: 0.02,
        };
        config.outcome.reveal_delay_secs = 0.02;
        config.outcome.reveal_window_secs = 0.03;
        config
    }

    #[tokio::test]
    async fn full_scan_cycle_completes_and_returns_to_idle() {
        let camera = SyntheticCamera::new(5);
        let gate = PerceptionGate::new(Box::new(ScriptedPresenceModel::present_after(2)), 0.3);
        let cancel = CancellationToken::new();
        let mut session = ScanSession::new(
            camera,
            gate,
            fast_config(),
            Arc::new(SystemClock),
            CountingSink::default(),
            7,
            cancel.clone(),
        );

        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(600)).await;
            canceller.cancel();
        });

        session.run().await.unwrap();

        assert_eq!(session.status(), SessionStatus::Running);
        assert!(session.stats().scans_completed >= 1, "{}", session.stats());
        assert!(session.stats().frames_processed > 0);
    }

    #[tokio::test]
    async fn failed_camera_never_reaches_the_gate_or_frame_loop() {
        let camera = UnavailableCamera::no_device();
        let gate = PerceptionGate::new(Box::new(ScriptedPresenceModel::present_after(0)), 0.3);
        let cancel = CancellationToken::new();
        let mut session = ScanSession::new(
            camera,
            gate,
            fast_config(),
            Arc::new(SystemClock),
            CountingSink::default(),
            7,
            cancel,
        );

        let err = session.run().await.unwrap_err();
        assert!(matches!(err, SessionError::Acquisition(CameraError::NoDevice)));
        assert_eq!(session.status(), SessionStatus::CameraUnavailable);
        assert_eq!(session.gate_invocations(), 0);
        assert_eq!(session.stats().frames_processed, 0);
    }

    #[tokio::test]
    async fn degraded_perception_is_surfaced_not_silent() {
        let camera = SyntheticCamera::new(5);
        let gate = PerceptionGate::disabled(&PerceptionError::LoadFailed("no asset".to_string()));
        let cancel = CancellationToken::new();
        let mut session = ScanSession::new(
            camera,
            gate,
            fast_config(),
            Arc::new(SystemClock),
            CountingSink::default(),
            7,
            cancel.clone(),
        );

        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            canceller.cancel();
        });

        session.run().await.unwrap();
        assert_eq!(session.status(), SessionStatus::PerceptionUnavailable);
        // Preview frames still flow, but no scan ever starts
        assert!(session.stats().frames_processed > 0);
        assert_eq!(session.stats().scans_completed, 0);
        assert_eq!(session.gate_invocations(), 0);
    }

    #[tokio::test]
    async fn stale_frames_are_skipped_silently() {
        // Interval 0 repeats the same timestamp forever: after the first
        // frame, everything is stale.
        let camera = SyntheticCamera::new(0);
        let gate = PerceptionGate::new(Box::new(ScriptedPresenceModel::present_after(999)), 0.3);
        let cancel = CancellationToken::new();
        let mut session = ScanSession::new(
            camera,
            gate,
            fast_config(),
            Arc::new(SystemClock),
            CountingSink::default(),
            7,
            cancel.clone(),
        );

        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(150)).await;
            canceller.cancel();
        });

        session.run().await.unwrap();
        assert_eq!(session.stats().frames_processed, 1);
        assert!(session.stats().frames_stale >= 1);
    }
}
