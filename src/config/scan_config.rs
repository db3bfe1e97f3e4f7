//! Scan configuration, loadable from TOML.
//!
//! All presentation constants — phase durations, outcome probability,
//! temperature ranges, output geometry — live here rather than as hardcoded
//! values, so an operator can retune the experience without a rebuild.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::defaults;

/// Top-level scan configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct ScanConfig {
    pub output: OutputConfig,
    pub timings: PhaseTimings,
    pub outcome: OutcomeConfig,
    pub perception: PerceptionConfig,
}

/// Output buffer geometry and capture preferences.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputConfig {
    pub width: u32,
    pub height: u32,
    pub capture_width: u32,
    pub capture_height: u32,
    /// Horizontal flip for a front-facing "selfie" view.
    pub mirror: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            width: defaults::OUTPUT_WIDTH,
            height: defaults::OUTPUT_HEIGHT,
            capture_width: defaults::CAPTURE_WIDTH,
            capture_height: defaults::CAPTURE_HEIGHT,
            mirror: true,
        }
    }
}

/// Phase durations (seconds in TOML, exposed as `Duration`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PhaseTimings {
    pub countdown_secs: f64,
    pub scan_secs: f64,
    pub thermal_ramp_secs: f64,
    pub hold_down_secs: f64,
    pub hold_up_secs: f64,
    pub result_dwell_secs: f64,
    pub result_fade_secs: f64,
}

impl Default for PhaseTimings {
    fn default() -> Self {
        Self {
            countdown_secs: defaults::COUNTDOWN_SECS,
            scan_secs: defaults::SCAN_SECS,
            thermal_ramp_secs: defaults::THERMAL_RAMP_SECS,
            hold_down_secs: defaults::HOLD_DOWN_SECS,
            hold_up_secs: defaults::HOLD_UP_SECS,
            result_dwell_secs: defaults::RESULT_DWELL_SECS,
            result_fade_secs: defaults::RESULT_FADE_SECS,
        }
    }
}

impl PhaseTimings {
    pub fn countdown(&self) -> Duration {
        Duration::from_secs_f64(self.countdown_secs)
    }

    pub fn scan(&self) -> Duration {
        Duration::from_secs_f64(self.scan_secs)
    }

    pub fn thermal_ramp(&self) -> Duration {
        Duration::from_secs_f64(self.thermal_ramp_secs)
    }

    pub fn hold_down(&self) -> Duration {
        Duration::from_secs_f64(self.hold_down_secs)
    }

    pub fn hold_up(&self) -> Duration {
        Duration::from_secs_f64(self.hold_up_secs)
    }

    pub fn result_dwell(&self) -> Duration {
        Duration::from_secs_f64(self.result_dwell_secs)
    }

    pub fn result_fade(&self) -> Duration {
        Duration::from_secs_f64(self.result_fade_secs)
    }

    /// Reject non-positive or non-finite durations.
    pub fn validate(&self) -> Result<(), String> {
        let fields = [
            ("countdown_secs", self.countdown_secs),
            ("scan_secs", self.scan_secs),
            ("thermal_ramp_secs", self.thermal_ramp_secs),
            ("hold_down_secs", self.hold_down_secs),
            ("hold_up_secs", self.hold_up_secs),
            ("result_dwell_secs", self.result_dwell_secs),
        ];
        for (name, value) in fields {
            if !value.is_finite() || value <= 0.0 {
                return Err(format!("timings.{name} must be a positive duration, got {value}"));
            }
        }
        if !self.result_fade_secs.is_finite() || self.result_fade_secs < 0.0 {
            return Err(format!(
                "timings.result_fade_secs must be non-negative, got {}",
                self.result_fade_secs
            ));
        }
        Ok(())
    }
}

/// Outcome sampling and readout animation parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutcomeConfig {
    /// Probability of the favorable verdict, in [0, 1].
    pub favorable_probability: f64,
    /// Displayed temperature range [lo, hi) for a favorable verdict.
    pub favorable_range: (f64, f64),
    /// Displayed temperature range [lo, hi) for an unfavorable verdict.
    pub unfavorable_range: (f64, f64),
    /// Delay before the readout is revealed (seconds into the final hold).
    pub reveal_delay_secs: f64,
    /// Readout animation window (seconds).
    pub reveal_window_secs: f64,
    /// Readout animation starting value.
    pub reveal_start_value: f64,
    /// Result banner for the favorable verdict.
    pub favorable_message: String,
    /// Result banner for the unfavorable verdict.
    pub unfavorable_message: String,
}

impl Default for OutcomeConfig {
    fn default() -> Self {
        Self {
            favorable_probability: defaults::FAVORABLE_PROBABILITY,
            favorable_range: defaults::FAVORABLE_RANGE,
            unfavorable_range: defaults::UNFAVORABLE_RANGE,
            reveal_delay_secs: defaults::REVEAL_DELAY_SECS,
            reveal_window_secs: defaults::REVEAL_WINDOW_SECS,
            reveal_start_value: defaults::REVEAL_START_VALUE,
            favorable_message: "Cool vibes detected. Come on in!".to_string(),
            unfavorable_message: "Whoa, you're on fire — cool down and try again!".to_string(),
        }
    }
}

impl OutcomeConfig {
    pub fn reveal_delay(&self) -> Duration {
        Duration::from_secs_f64(self.reveal_delay_secs)
    }

    pub fn reveal_window(&self) -> Duration {
        Duration::from_secs_f64(self.reveal_window_secs)
    }

    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.favorable_probability) {
            return Err(format!(
                "outcome.favorable_probability must be in [0, 1], got {}",
                self.favorable_probability
            ));
        }
        for (name, (lo, hi)) in [
            ("favorable_range", self.favorable_range),
            ("unfavorable_range", self.unfavorable_range),
        ] {
            if !(lo.is_finite() && hi.is_finite() && lo < hi) {
                return Err(format!("outcome.{name} must be a non-empty range, got [{lo}, {hi})"));
            }
        }
        Ok(())
    }
}

/// Perception gate tuning.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PerceptionConfig {
    /// Path to the perception model asset.
    pub model_path: String,
    /// Minimum detection confidence for a presence trigger.
    pub min_confidence: f32,
}

impl Default for PerceptionConfig {
    fn default() -> Self {
        Self {
            model_path: "face_landmarker.task".to_string(),
            min_confidence: defaults::MIN_DETECTION_CONFIDENCE,
        }
    }
}

impl ScanConfig {
    /// Load configuration, in order of precedence:
    ///
    /// 1. `THERMASCAN_CONFIG` environment variable (path to a TOML file)
    /// 2. `scan_config.toml` in the current working directory
    /// 3. Built-in defaults
    ///
    /// A file that exists but fails to parse or validate falls back to
    /// defaults with a logged error, never a crash.
    pub fn load() -> Self {
        let candidate = std::env::var("THERMASCAN_CONFIG")
            .map(std::path::PathBuf::from)
            .unwrap_or_else(|_| std::path::PathBuf::from("scan_config.toml"));

        if candidate.exists() {
            match Self::from_file(&candidate) {
                Ok(config) => {
                    tracing::info!(path = %candidate.display(), "Loaded scan configuration");
                    return config;
                }
                Err(e) => {
                    tracing::error!(
                        path = %candidate.display(),
                        error = %e,
                        "Failed to load scan configuration — using defaults"
                    );
                }
            }
        } else {
            tracing::info!("No scan_config.toml found — using built-in defaults");
        }

        Self::default()
    }

    /// Parse and validate a TOML config file.
    pub fn from_file(path: &Path) -> Result<Self, String> {
        let raw = std::fs::read_to_string(path).map_err(|e| format!("read error: {e}"))?;
        let config: Self = toml::from_str(&raw).map_err(|e| format!("parse error: {e}"))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.output.width == 0 || self.output.height == 0 {
            return Err("output dimensions must be non-zero".to_string());
        }
        self.timings.validate()?;
        self.outcome.validate()?;
        if !(0.0..=1.0).contains(&self.perception.min_confidence) {
            return Err(format!(
                "perception.min_confidence must be in [0, 1], got {}",
                self.perception.min_confidence
            ));
        }
        Ok(())
    }
}
