//! Scan phase controller
//!
//! The finite-state machine that owns the single source of truth for "what
//! should be rendered now" and the blend engine's progress value. Phases
//! advance on wall-clock timers plus one perception-driven transition
//! (`Idle -> Countdown`).
//!
//! Every derived value — progress, countdown digit, temperature readout —
//! is computed purely from `(phase, phase_started, now)`, never from a
//! running accumulator. The visual state is therefore reconstructible from
//! those three values alone: no drift, and the whole sequence is testable
//! with an injected clock.
//!
//! Timer callbacks carry the generation current when they were scheduled;
//! a callback whose generation no longer matches is discarded, so a timer
//! can never fire a transition for a phase that has been superseded.

use std::time::{Duration, Instant};

use rand::Rng;
use tracing::{debug, info};

use crate::config::{OutcomeConfig, PhaseTimings};
use crate::types::{FrameReport, Outcome, Phase, SessionStatus};

/// A single applied phase transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: Phase,
    pub to: Phase,
    /// Generation after the transition; timers for the new phase carry it.
    pub generation: u64,
}

/// Ease-out quartic, used by the temperature readout animation.
fn ease_out_quart(x: f64) -> f64 {
    1.0 - (1.0 - x).powi(4)
}

/// The scan sequence state machine.
///
/// Owns `Phase`, the phase clock and the `Outcome` exclusively; no other
/// component mutates them.
pub struct PhaseController<R: Rng> {
    phase: Phase,
    phase_started: Instant,
    generation: u64,
    outcome: Option<Outcome>,
    timings: PhaseTimings,
    outcome_cfg: OutcomeConfig,
    rng: R,
}

impl<R: Rng> PhaseController<R> {
    /// Create a controller in `Idle` with its phase clock at `now`.
    pub fn new(timings: PhaseTimings, outcome_cfg: OutcomeConfig, rng: R, now: Instant) -> Self {
        Self {
            phase: Phase::Idle,
            phase_started: now,
            generation: 0,
            outcome: None,
            timings,
            outcome_cfg,
            rng,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Generation token for timer-race detection. Bumped on every
    /// transition (including forced resets).
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn outcome(&self) -> Option<&Outcome> {
        self.outcome.as_ref()
    }

    /// Fixed duration of a timer-driven phase; `None` for `Idle`.
    pub fn phase_duration(&self, phase: Phase) -> Option<Duration> {
        match phase {
            Phase::Idle => None,
            Phase::Countdown => Some(self.timings.countdown()),
            Phase::ScanDown | Phase::ScanUp => Some(self.timings.scan()),
            Phase::ThermalHoldDown => Some(self.timings.hold_down()),
            Phase::ThermalHoldUp => Some(self.timings.hold_up()),
            Phase::Result => Some(self.timings.result_dwell()),
        }
    }

    /// Duration of the current phase, for scheduling its exit timer.
    pub fn current_phase_duration(&self) -> Option<Duration> {
        self.phase_duration(self.phase)
    }

    fn next_phase(phase: Phase) -> Phase {
        match phase {
            Phase::Idle => Phase::Countdown,
            Phase::Countdown => Phase::ScanDown,
            Phase::ScanDown => Phase::ThermalHoldDown,
            Phase::ThermalHoldDown => Phase::ScanUp,
            Phase::ScanUp => Phase::ThermalHoldUp,
            Phase::ThermalHoldUp => Phase::Result,
            Phase::Result => Phase::Idle,
        }
    }

    /// Forward a perception trigger. Acts only in `Idle`; in every other
    /// phase it is ignored by policy (no re-trigger during an active scan).
    pub fn trigger_presence(&mut self, now: Instant) -> Option<Transition> {
        if self.phase != Phase::Idle {
            debug!(phase = %self.phase, "Presence trigger ignored outside Idle");
            return None;
        }
        Some(self.enter(Phase::Countdown, now))
    }

    /// Apply all timer transitions due at `now`.
    ///
    /// Each expired phase hands its exact end instant to the next phase's
    /// clock, so a late call (dropped frames, coarse timer) never skews the
    /// cumulative schedule.
    pub fn advance(&mut self, now: Instant) -> Vec<Transition> {
        let mut transitions = Vec::new();
        while let Some(duration) = self.phase_duration(self.phase) {
            if now.duration_since(self.phase_started) < duration {
                break;
            }
            let boundary = self.phase_started + duration;
            let to = Self::next_phase(self.phase);
            transitions.push(self.enter(to, boundary));
        }
        transitions
    }

    /// Timer-callback entry point. The callback's generation must match the
    /// controller's current generation; a stale one is discarded unapplied.
    pub fn on_timer(&mut self, generation: u64, now: Instant) -> Vec<Transition> {
        if generation != self.generation {
            debug!(
                stale = generation,
                current = self.generation,
                phase = %self.phase,
                "Stale phase timer discarded"
            );
            return Vec::new();
        }
        self.advance(now)
    }

    /// Forced return to `Idle` (teardown, operator reset). Bumps the
    /// generation so every in-flight timer for the abandoned phase is
    /// invalidated.
    pub fn reset(&mut self, now: Instant) -> Transition {
        info!(from = %self.phase, "Forced reset to Idle");
        self.enter(Phase::Idle, now)
    }

    fn enter(&mut self, to: Phase, at: Instant) -> Transition {
        let from = self.phase;
        self.phase = to;
        self.phase_started = at;
        self.generation += 1;

        match to {
            // Outcome is sampled exactly once, on entering the phase that
            // precedes Result.
            Phase::ThermalHoldUp => self.sample_outcome(),
            Phase::Idle => self.outcome = None,
            _ => {}
        }

        info!(
            from = %from,
            to = %to,
            generation = self.generation,
            "Phase transition"
        );

        Transition { from, to, generation: self.generation }
    }

    fn sample_outcome(&mut self) {
        let favorable = self.rng.gen::<f64>() < self.outcome_cfg.favorable_probability;
        let (lo, hi) = if favorable {
            self.outcome_cfg.favorable_range
        } else {
            self.outcome_cfg.unfavorable_range
        };
        let display_value = self.rng.gen_range(lo..hi);
        let message = if favorable {
            self.outcome_cfg.favorable_message.clone()
        } else {
            self.outcome_cfg.unfavorable_message.clone()
        };
        info!(favorable, display_value, "Outcome sampled");
        self.outcome = Some(Outcome { favorable, display_value, message });
    }

    /// Blend progress for the current phase, clamped to [0, 1] and
    /// monotonic non-decreasing within a phase (non-increasing in `Result`,
    /// where the overlay fades back out).
    pub fn progress(&self, now: Instant) -> f32 {
        let elapsed = now.duration_since(self.phase_started);
        match self.phase {
            Phase::Idle | Phase::Countdown | Phase::ScanDown => 0.0,
            Phase::ThermalHoldDown | Phase::ThermalHoldUp => {
                let ramp = self.timings.thermal_ramp();
                if ramp.is_zero() {
                    1.0
                } else {
                    (elapsed.as_secs_f32() / ramp.as_secs_f32()).clamp(0.0, 1.0)
                }
            }
            // Held at full intensity between the two ramps
            Phase::ScanUp => 1.0,
            Phase::Result => {
                let fade = self.timings.result_fade();
                if fade.is_zero() {
                    0.0
                } else {
                    (1.0 - elapsed.as_secs_f32() / fade.as_secs_f32()).clamp(0.0, 1.0)
                }
            }
        }
    }

    /// Whole seconds remaining in the countdown, for the render chrome.
    pub fn countdown_remaining(&self, now: Instant) -> Option<u32> {
        if self.phase != Phase::Countdown {
            return None;
        }
        let total = self.timings.countdown();
        let elapsed = now.duration_since(self.phase_started);
        let remaining = total.saturating_sub(elapsed).as_secs_f64();
        Some(remaining.ceil() as u32)
    }

    /// The animated temperature readout.
    ///
    /// Hidden for the first `reveal_delay` of the final hold, then eased
    /// from the start value up to the sampled target over `reveal_window`,
    /// then held; stays at the target through `Result`. Derived purely from
    /// the phase clock, so cancelling it is just leaving the phase.
    pub fn displayed_temperature(&self, now: Instant) -> Option<f64> {
        let outcome = self.outcome.as_ref()?;
        match self.phase {
            Phase::ThermalHoldUp => {
                let elapsed = now.duration_since(self.phase_started);
                let delay = self.outcome_cfg.reveal_delay();
                if elapsed < delay {
                    return None;
                }
                let window = self.outcome_cfg.reveal_window();
                let t = if window.is_zero() {
                    1.0
                } else {
                    ((elapsed - delay).as_secs_f64() / window.as_secs_f64()).min(1.0)
                };
                let start = self.outcome_cfg.reveal_start_value;
                let value = start + (outcome.display_value - start) * ease_out_quart(t);
                Some((value * 10.0).round() / 10.0)
            }
            Phase::Result => Some((outcome.display_value * 10.0).round() / 10.0),
            _ => None,
        }
    }

    /// Everything the render collaborator needs this frame.
    pub fn snapshot(&self, now: Instant, status: SessionStatus) -> FrameReport {
        FrameReport {
            phase: self.phase,
            progress: self.progress(now),
            countdown: self.countdown_remaining(now),
            sweep: self.phase.sweep_direction(),
            outcome: self.outcome.clone(),
            displayed_temperature: self.displayed_temperature(now),
            status,
        }
    }
}
