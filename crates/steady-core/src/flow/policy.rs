//! Regulation technique selection and the one-shot fallback rule.
//!
//! This is the only decision logic the core owns. Everything path- and
//! content-specific comes from the external planner; the numbers here are
//! policy data loaded from configuration, not hard-coded into the state
//! machine.

use serde::{Deserialize, Serialize};

/// A regulation technique offered during the regulate step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Technique {
    /// Slow paced breathing; the default for lower intensities.
    PacedBreathing,
    /// Physically grounding (senses, feet on floor); preferred when the
    /// pre-rating is high.
    BodyGrounding,
    /// Progressive muscle tension and release.
    MuscleRelease,
}

impl Technique {
    /// Next technique in the fixed fallback cycle.
    pub fn next_fallback(self) -> Technique {
        match self {
            Technique::PacedBreathing => Technique::BodyGrounding,
            Technique::BodyGrounding => Technique::MuscleRelease,
            Technique::MuscleRelease => Technique::PacedBreathing,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Technique::PacedBreathing => "Paced breathing",
            Technique::BodyGrounding => "Body grounding",
            Technique::MuscleRelease => "Muscle release",
        }
    }
}

/// Tunable thresholds driving technique selection and fallback.
///
/// Values ship as configuration (`[policy]` in config.toml); the defaults
/// mirror the product's current numbers and should not be changed without
/// product confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowPolicy {
    /// Pre-intensity at or above which the initial technique is a
    /// physically grounding one instead of breath-based.
    #[serde(default = "default_high_intensity_threshold")]
    pub high_intensity_threshold: u8,
    /// Minimum drop (pre - mid) that counts as improvement; anything less
    /// triggers the one-time technique fallback.
    #[serde(default = "default_min_improvement")]
    pub min_improvement: u8,
}

fn default_high_intensity_threshold() -> u8 {
    7
}
fn default_min_improvement() -> u8 {
    2
}

impl Default for FlowPolicy {
    fn default() -> Self {
        Self {
            high_intensity_threshold: default_high_intensity_threshold(),
            min_improvement: default_min_improvement(),
        }
    }
}

impl FlowPolicy {
    /// Initial technique as a function of the pre-rating.
    pub fn initial_technique(&self, intensity_pre: u8) -> Technique {
        if intensity_pre >= self.high_intensity_threshold {
            Technique::BodyGrounding
        } else {
            Technique::PacedBreathing
        }
    }

    /// Whether the regulate step should loop once with the next technique.
    ///
    /// Pure function of the two ratings and the latched flag. A mid-rating
    /// above pre counts as zero improvement.
    pub fn should_fallback(&self, pre: u8, mid: u8, fallback_used: bool) -> bool {
        !fallback_used && pre.saturating_sub(mid) < self.min_improvement
    }
}

/// Per-step timer durations, also shipped as configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerConfig {
    #[serde(default = "default_regulate_secs")]
    pub regulate_secs: u64,
    #[serde(default = "default_closure_secs")]
    pub closure_secs: u64,
    /// Inactivity window on the summary screen before the session
    /// auto-finishes with the timed-out flag set.
    #[serde(default = "default_summary_timeout_secs")]
    pub summary_timeout_secs: u64,
}

fn default_regulate_secs() -> u64 {
    75
}
fn default_closure_secs() -> u64 {
    30
}
fn default_summary_timeout_secs() -> u64 {
    120
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            regulate_secs: default_regulate_secs(),
            closure_secs: default_closure_secs(),
            summary_timeout_secs: default_summary_timeout_secs(),
        }
    }
}
