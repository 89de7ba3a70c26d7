//! Branch plans supplied by the external planner.
//!
//! The engine treats a plan as opaque content: only the path tag and step
//! count drive control flow. Step kinds are tagged variants so dispatch is
//! exhaustive -- there is no string comparison anywhere in the flow.

use serde::{Deserialize, Serialize};

/// The closed set of intervention paths the planner may choose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathTag {
    /// Cognitive reframing of the captured thought.
    Reframe,
    /// Defusion: observing the thought at a distance.
    Defuse,
    /// Soothing/grounding; also the safe default when the planner is
    /// unreachable.
    Ground,
    /// Safety concern detected. Terminal: suspends all flow advancement.
    Crisis,
}

/// One ordered sub-step of a branch plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BranchStepSpec {
    /// Informational text; acknowledged, no answer expected.
    Info { prompt: String },
    /// Free-text prompt.
    Prompt { prompt: String },
    /// Single choice among fixed options.
    Choice { prompt: String, options: Vec<String> },
    /// A short timed action (breathing hold, cold water, ...).
    TimedAction { prompt: String, seconds: u64 },
}

impl BranchStepSpec {
    pub fn prompt(&self) -> &str {
        match self {
            BranchStepSpec::Info { prompt }
            | BranchStepSpec::Prompt { prompt }
            | BranchStepSpec::Choice { prompt, .. }
            | BranchStepSpec::TimedAction { prompt, .. } => prompt,
        }
    }
}

/// The planner's decision: a path plus its ordered sub-steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchPlan {
    pub path: PathTag,
    /// Human-readable label for the chosen path.
    pub label: String,
    pub steps: Vec<BranchStepSpec>,
    /// Closing validation line shown during the closure step.
    pub closing_line: String,
    /// Optional planner reasoning, carried through for the session record.
    #[serde(default)]
    pub reasoning: Option<String>,
}

impl BranchPlan {
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    pub fn is_crisis(&self) -> bool {
        self.path == PathTag::Crisis
    }

    /// Minimal generic plan substituted when the planner is unreachable,
    /// so the flow can always proceed.
    pub fn offline_default() -> Self {
        Self {
            path: PathTag::Ground,
            label: "Steady yourself".into(),
            steps: vec![
                BranchStepSpec::Info {
                    prompt: "Whatever is going on, this moment will pass.".into(),
                },
                BranchStepSpec::Prompt {
                    prompt: "Name one thing you can see, hear, or feel right now.".into(),
                },
                BranchStepSpec::Choice {
                    prompt: "What would help most in the next hour?".into(),
                    options: vec![
                        "Rest".into(),
                        "Move my body".into(),
                        "Talk to someone".into(),
                    ],
                },
            ],
            closing_line: "You slowed down and took care of yourself.".into(),
            reasoning: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offline_default_is_a_safe_three_step_plan() {
        let plan = BranchPlan::offline_default();
        assert_eq!(plan.step_count(), 3);
        assert!(!plan.is_crisis());
        assert_eq!(plan.path, PathTag::Ground);
    }

    #[test]
    fn step_kinds_serialize_with_kind_tag() {
        let step = BranchStepSpec::TimedAction {
            prompt: "Hold cold water on your wrists".into(),
            seconds: 30,
        };
        let json = serde_json::to_value(&step).unwrap();
        assert_eq!(json["kind"], "timed_action");
        assert_eq!(json["seconds"], 30);

        let back: BranchStepSpec = serde_json::from_value(json).unwrap();
        assert_eq!(back, step);
    }

    #[test]
    fn crisis_tag_round_trips() {
        let json = serde_json::to_value(PathTag::Crisis).unwrap();
        assert_eq!(json, "crisis");
        let back: PathTag = serde_json::from_value(json).unwrap();
        assert!(BranchPlan {
            path: back,
            label: String::new(),
            steps: vec![],
            closing_line: String::new(),
            reasoning: None,
        }
        .is_crisis());
    }
}
