//! Session events.
//!
//! Every step transition produces a [`SessionEvent`]. Events are immutable
//! once created, buffered in the event log and drained into progress
//! patches; the backend store tolerates at-least-once delivery.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::flow::plan::PathTag;
use crate::flow::policy::Technique;
use crate::flow::state::{FlowStep, IntensityStage};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SessionEvent {
    SessionStarted {
        entry_point: String,
        quick: bool,
        at: DateTime<Utc>,
    },
    IntensityRated {
        stage: IntensityStage,
        value: u8,
        at: DateTime<Utc>,
    },
    RegulationStarted {
        technique: Technique,
        duration_secs: u64,
        at: DateTime<Utc>,
    },
    RegulationFinished {
        technique: Technique,
        skipped: bool,
        at: DateTime<Utc>,
    },
    /// The one-shot technique swap after insufficient improvement.
    FallbackTriggered {
        from: Technique,
        to: Technique,
        at: DateTime<Utc>,
    },
    /// Thought captured (or explicitly skipped). Only the length is
    /// recorded here; the text itself travels in the progress snapshot.
    ThoughtCaptured {
        chars: usize,
        skipped: bool,
        at: DateTime<Utc>,
    },
    PlanRequested {
        at: DateTime<Utc>,
    },
    PlanDecided {
        path: PathTag,
        step_count: usize,
        /// True when the planner was unreachable and the offline default
        /// plan was substituted.
        offline_fallback: bool,
        at: DateTime<Utc>,
    },
    BranchStepAnswered {
        index: usize,
        skipped: bool,
        at: DateTime<Utc>,
    },
    CrisisEntered {
        at: DateTime<Utc>,
    },
    CrisisExited {
        at: DateTime<Utc>,
    },
    ClosureFinished {
        skipped: bool,
        at: DateTime<Utc>,
    },
    AnchorChosen {
        anchor: String,
        at: DateTime<Utc>,
    },
    SessionEnded {
        timed_out: bool,
        duration_secs: u64,
        at: DateTime<Utc>,
    },
    /// The flow was left without finishing; the draft stays for resume.
    SessionSuspended {
        step: FlowStep,
        at: DateTime<Utc>,
    },
    DraftResumed {
        step: FlowStep,
        at: DateTime<Utc>,
    },
    DraftDiscarded {
        at: DateTime<Utc>,
    },
}

impl SessionEvent {
    pub fn at(&self) -> DateTime<Utc> {
        match self {
            SessionEvent::SessionStarted { at, .. }
            | SessionEvent::IntensityRated { at, .. }
            | SessionEvent::RegulationStarted { at, .. }
            | SessionEvent::RegulationFinished { at, .. }
            | SessionEvent::FallbackTriggered { at, .. }
            | SessionEvent::ThoughtCaptured { at, .. }
            | SessionEvent::PlanRequested { at }
            | SessionEvent::PlanDecided { at, .. }
            | SessionEvent::BranchStepAnswered { at, .. }
            | SessionEvent::CrisisEntered { at }
            | SessionEvent::CrisisExited { at }
            | SessionEvent::ClosureFinished { at, .. }
            | SessionEvent::AnchorChosen { at, .. }
            | SessionEvent::SessionEnded { at, .. }
            | SessionEvent::SessionSuspended { at, .. }
            | SessionEvent::DraftResumed { at, .. }
            | SessionEvent::DraftDiscarded { at } => *at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_tag_by_type() {
        let ev = SessionEvent::PlanDecided {
            path: PathTag::Reframe,
            step_count: 4,
            offline_fallback: false,
            at: Utc::now(),
        };
        let json = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["type"], "PlanDecided");
        assert_eq!(json["path"], "reframe");
        let back: SessionEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, ev);
    }
}
