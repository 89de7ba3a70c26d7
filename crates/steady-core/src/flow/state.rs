//! The flow's step cursor and step-local data.
//!
//! All of the run's mutable values live in one [`StepData`] record and one
//! [`FlowStep`] tag, serialized wholesale into the draft. There are no
//! scattered per-screen flags.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::policy::Technique;

/// The current phase of a rescue session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum FlowStep {
    /// Cold start found a draft: offer resume or discard.
    ResumePrompt,
    /// Ready screen before the user commits.
    Prime,
    /// Pre-exercise intensity rating.
    IntensityPre,
    /// Timed regulation exercise.
    Regulate,
    /// Mid-rating after the exercise; fallback decision point.
    RegulateCheck,
    /// Free-form capture of the triggering thought.
    Capture,
    /// Waiting on the planner's branch decision.
    PlanLoading,
    /// Executing branch step `index` of the decided plan.
    BranchStep { index: usize },
    /// Safety state. All advancement suspended until explicit exit.
    Crisis,
    /// Timed closing exercise.
    Closure,
    /// Post-rating and confidence check.
    ClosureCheck,
    /// Summary screen with anchor selection.
    Summary,
    Done,
}

impl FlowStep {
    /// Steps from which a draft should offer resume on cold start.
    pub fn is_resumable(&self) -> bool {
        !matches!(
            self,
            FlowStep::ResumePrompt | FlowStep::Prime | FlowStep::Done
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, FlowStep::Done)
    }
}

/// Which rating a rated-intensity value belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntensityStage {
    Pre,
    Mid,
    Post,
}

/// Everything the run has captured so far.
///
/// Mutated additively as steps complete; the whole record is what the draft
/// persists and what resume restores verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepData {
    pub intensity_pre: Option<u8>,
    pub intensity_mid: Option<u8>,
    pub intensity_post: Option<u8>,
    /// 0-10 confidence from the closing check.
    pub confidence: Option<u8>,
    /// Captured triggering thought; empty when the user skipped.
    pub captured_text: String,
    pub technique: Option<Technique>,
    /// Latched true by the one-shot technique fallback.
    pub fallback_used: bool,
    /// Branch step index -> submitted answer.
    pub answers: BTreeMap<usize, String>,
    /// Anchor chosen on the summary screen.
    pub anchor: Option<String>,
    /// Closing validation line, taken from the plan at closure time.
    pub validation_line: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    /// True when the session ended via the summary inactivity timeout
    /// rather than an explicit finish.
    pub timed_out: bool,
}

impl StepData {
    /// Elapsed whole seconds since the session started.
    pub fn elapsed_secs(&self, now: DateTime<Utc>) -> u64 {
        self.started_at
            .map(|s| (now - s).num_seconds().max(0) as u64)
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_tag_serializes_with_index_payload() {
        let step = FlowStep::BranchStep { index: 2 };
        let json = serde_json::to_value(step).unwrap();
        assert_eq!(json["step"], "branch_step");
        assert_eq!(json["index"], 2);
        let back: FlowStep = serde_json::from_value(json).unwrap();
        assert_eq!(back, step);
    }

    #[test]
    fn resumable_steps() {
        assert!(!FlowStep::Prime.is_resumable());
        assert!(!FlowStep::Done.is_resumable());
        assert!(!FlowStep::ResumePrompt.is_resumable());
        assert!(FlowStep::Regulate.is_resumable());
        assert!(FlowStep::BranchStep { index: 0 }.is_resumable());
        assert!(FlowStep::Crisis.is_resumable());
    }

    #[test]
    fn elapsed_is_zero_before_start() {
        let data = StepData::default();
        assert_eq!(data.elapsed_secs(Utc::now()), 0);
    }
}
