//! The flow engine: the state machine driving one rescue session.
//!
//! The engine owns the step cursor, all step-local data, the branch plan,
//! the per-slot countdowns and the outgoing event buffer. It has no
//! internal threads and performs no IO -- the caller invokes `tick()`
//! periodically and persists/syncs around it (see `flow::runner`).
//!
//! ## State transitions
//!
//! ```text
//! prime -> intensity_pre -> regulate -> regulate_check -> capture
//!       -> plan_loading -> branch_step[i] -> closure -> closure_check
//!       -> summary -> done
//! ```
//!
//! `regulate_check` may loop back to `regulate` once per session (technique
//! fallback). `plan_loading` (or a late crisis decision during a branch
//! step) can divert to `crisis`, which only an explicit exit leaves.
//!
//! Commands follow the timer engine convention: a command that does not
//! apply in the current step -- or carries an out-of-range rating -- returns
//! `None` and changes nothing.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::events::SessionEvent;
use crate::sync::EventLog;
use crate::timer::Countdown;

use super::plan::BranchPlan;
use super::policy::{FlowPolicy, TimerConfig};
use super::state::{FlowStep, IntensityStage, StepData};

const MAX_INTENSITY: u8 = 10;

/// Lightweight view of the engine for status displays.
#[derive(Debug, Clone, Serialize)]
pub struct FlowStatus {
    pub step: FlowStep,
    pub session_id: Option<String>,
    pub remaining_secs: u64,
    pub pending_events: usize,
    pub data: StepData,
    pub plan: Option<BranchPlan>,
}

/// State machine for one rescue session.
///
/// Serializable wholesale: the serialized engine *is* the draft, including
/// the unsynced event buffer and the session identifier once known.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowEngine {
    policy: FlowPolicy,
    timers: TimerConfig,
    step: FlowStep,
    data: StepData,
    #[serde(default)]
    plan: Option<BranchPlan>,
    /// Step recorded by the draft, offered back by the resume prompt.
    #[serde(default)]
    resume_from: Option<FlowStep>,
    #[serde(default)]
    session_id: Option<String>,
    #[serde(default)]
    entry_point: String,
    #[serde(default)]
    quick: bool,
    #[serde(default)]
    log: EventLog,
    #[serde(default)]
    regulate_timer: Countdown,
    #[serde(default)]
    closure_timer: Countdown,
    #[serde(default)]
    summary_timer: Countdown,
}

impl FlowEngine {
    pub fn new(policy: FlowPolicy, timers: TimerConfig) -> Self {
        Self {
            policy,
            timers,
            step: FlowStep::Prime,
            data: StepData::default(),
            plan: None,
            resume_from: None,
            session_id: None,
            entry_point: String::new(),
            quick: false,
            log: EventLog::new(),
            regulate_timer: Countdown::idle(),
            closure_timer: Countdown::idle(),
            summary_timer: Countdown::idle(),
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn step(&self) -> FlowStep {
        self.step
    }

    pub fn data(&self) -> &StepData {
        &self.data
    }

    pub fn plan(&self) -> Option<&BranchPlan> {
        self.plan.as_ref()
    }

    pub fn policy(&self) -> &FlowPolicy {
        &self.policy
    }

    pub fn timer_config(&self) -> &TimerConfig {
        &self.timers
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn entry_point(&self) -> &str {
        &self.entry_point
    }

    pub fn quick(&self) -> bool {
        self.quick
    }

    pub fn log(&self) -> &EventLog {
        &self.log
    }

    pub fn log_mut(&mut self) -> &mut EventLog {
        &mut self.log
    }

    /// Seconds left on the countdown owned by the current step.
    pub fn remaining_secs(&self) -> u64 {
        match self.step {
            FlowStep::Regulate => self.regulate_timer.remaining_secs(),
            FlowStep::Closure => self.closure_timer.remaining_secs(),
            FlowStep::Summary => self.summary_timer.remaining_secs(),
            _ => 0,
        }
    }

    pub fn status(&self) -> FlowStatus {
        FlowStatus {
            step: self.step,
            session_id: self.session_id.clone(),
            remaining_secs: self.remaining_secs(),
            pending_events: self.log.len(),
            data: self.data.clone(),
            plan: self.plan.clone(),
        }
    }

    /// Elapsed whole seconds since the session started.
    pub fn elapsed_secs(&self) -> u64 {
        self.data.elapsed_secs(Utc::now())
    }

    /// Record the identifier assigned by the gateway.
    ///
    /// Late responses may only fill the id in; they never overwrite one and
    /// never move the step.
    pub fn set_session_id(&mut self, id: String) {
        if self.session_id.is_none() {
            self.session_id = Some(id);
        }
    }

    // ── Resume / discard ─────────────────────────────────────────────

    /// Called after a draft load: park the recorded step behind the resume
    /// prompt. Drafts at `prime` or `done` start over instead.
    pub fn offer_resume(&mut self) {
        if self.step.is_resumable() {
            self.resume_from = Some(self.step);
            self.step = FlowStep::ResumePrompt;
        }
    }

    /// Re-enter the recorded step with all recorded values intact. Timed
    /// steps restart their countdown from the full configured duration.
    pub fn resume(&mut self) -> Option<SessionEvent> {
        if self.step != FlowStep::ResumePrompt {
            return None;
        }
        let step = self.resume_from.take()?;
        self.step = step;
        match step {
            FlowStep::Regulate => self.regulate_timer.start(self.timers.regulate_secs),
            FlowStep::Closure => self.closure_timer.start(self.timers.closure_secs),
            FlowStep::Summary => self.summary_timer.start(self.timers.summary_timeout_secs),
            _ => {}
        }
        self.emit(SessionEvent::DraftResumed {
            step,
            at: Utc::now(),
        })
    }

    /// Throw the recorded run away and start over at `prime`.
    ///
    /// Leaves no residue: identifiers, captured text, plan and buffered
    /// events are all gone. The returned event is for the caller's benefit
    /// only; there is no session left to sync it under.
    pub fn discard(&mut self) -> Option<SessionEvent> {
        if self.step != FlowStep::ResumePrompt {
            return None;
        }
        *self = Self::new(self.policy, self.timers);
        Some(SessionEvent::DraftDiscarded { at: Utc::now() })
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// User commits to starting: `prime -> intensity_pre`.
    pub fn confirm_prime(&mut self, entry_point: &str, quick: bool) -> Option<SessionEvent> {
        if self.step != FlowStep::Prime {
            return None;
        }
        self.entry_point = entry_point.to_string();
        self.quick = quick;
        self.data.started_at = Some(Utc::now());
        self.step = FlowStep::IntensityPre;
        self.emit(SessionEvent::SessionStarted {
            entry_point: entry_point.to_string(),
            quick,
            at: Utc::now(),
        })
    }

    /// Pre-rating: selects the initial technique and starts the regulation
    /// countdown.
    pub fn rate_pre(&mut self, value: u8) -> Option<SessionEvent> {
        if self.step != FlowStep::IntensityPre || value > MAX_INTENSITY {
            return None;
        }
        self.data.intensity_pre = Some(value);
        let _ = self.emit(SessionEvent::IntensityRated {
            stage: IntensityStage::Pre,
            value,
            at: Utc::now(),
        });
        let technique = self.policy.initial_technique(value);
        self.start_regulation(technique)
    }

    /// Drive the countdown owned by the current step. Call periodically.
    pub fn tick(&mut self) -> Option<SessionEvent> {
        match self.step {
            FlowStep::Regulate => {
                if self.regulate_timer.tick() {
                    return self.finish_regulation(false);
                }
                None
            }
            FlowStep::Closure => {
                if self.closure_timer.tick() {
                    return self.finish_closure(false);
                }
                None
            }
            FlowStep::Summary => {
                if self.summary_timer.tick() {
                    return self.end(true);
                }
                None
            }
            _ => None,
        }
    }

    /// Explicit skip out of the regulation exercise.
    pub fn skip_regulation(&mut self) -> Option<SessionEvent> {
        if self.step != FlowStep::Regulate {
            return None;
        }
        self.regulate_timer.stop();
        self.finish_regulation(true)
    }

    /// Mid-rating at the regulate check: either the one-shot fallback loop
    /// or straight on to capture.
    pub fn rate_mid(&mut self, value: u8) -> Option<SessionEvent> {
        if self.step != FlowStep::RegulateCheck || value > MAX_INTENSITY {
            return None;
        }
        self.data.intensity_mid = Some(value);
        let rated = self.emit(SessionEvent::IntensityRated {
            stage: IntensityStage::Mid,
            value,
            at: Utc::now(),
        });

        let pre = self.data.intensity_pre.unwrap_or(0);
        if self
            .policy
            .should_fallback(pre, value, self.data.fallback_used)
        {
            let from = self
                .data
                .technique
                .unwrap_or_else(|| self.policy.initial_technique(pre));
            let to = from.next_fallback();
            self.data.fallback_used = true;
            let _ = self.emit(SessionEvent::FallbackTriggered {
                from,
                to,
                at: Utc::now(),
            });
            return self.start_regulation(to);
        }

        self.step = FlowStep::Capture;
        rated
    }

    /// Submit (or skip, with `None`) the captured thought and move to the
    /// planner decision.
    pub fn submit_capture(&mut self, text: Option<&str>) -> Option<SessionEvent> {
        if self.step != FlowStep::Capture {
            return None;
        }
        let skipped = text.is_none();
        self.data.captured_text = text.unwrap_or_default().to_string();
        let _ = self.emit(SessionEvent::ThoughtCaptured {
            chars: self.data.captured_text.chars().count(),
            skipped,
            at: Utc::now(),
        });
        self.step = FlowStep::PlanLoading;
        self.emit(SessionEvent::PlanRequested { at: Utc::now() })
    }

    /// Apply the planner's decision (or the offline default when the call
    /// failed, with `offline_fallback = true`).
    ///
    /// Only accepted while waiting at `plan_loading`, with one exception:
    /// a crisis decision arriving late, while a branch step is already
    /// underway, still takes effect. A stale non-crisis plan is ignored.
    pub fn apply_plan(&mut self, plan: BranchPlan, offline_fallback: bool) -> Option<SessionEvent> {
        let at_loading = self.step == FlowStep::PlanLoading;
        let at_branch = matches!(self.step, FlowStep::BranchStep { .. });
        if !at_loading && !(at_branch && plan.is_crisis()) {
            return None;
        }

        let decided = self.emit(SessionEvent::PlanDecided {
            path: plan.path,
            step_count: plan.step_count(),
            offline_fallback,
            at: Utc::now(),
        });

        if plan.is_crisis() {
            self.plan = Some(plan);
            self.stop_all_timers();
            self.step = FlowStep::Crisis;
            return self.emit(SessionEvent::CrisisEntered { at: Utc::now() });
        }

        let empty = plan.step_count() == 0;
        self.plan = Some(plan);
        if empty {
            // Degenerate plan: nothing to step through.
            self.enter_closure();
        } else {
            self.step = FlowStep::BranchStep { index: 0 };
        }
        decided
    }

    /// Shorthand for "the planner was unreachable".
    pub fn plan_failed(&mut self) -> Option<SessionEvent> {
        self.apply_plan(BranchPlan::offline_default(), true)
    }

    /// Answer (or skip) the current branch step and advance; the last
    /// answer moves the flow to closure.
    pub fn answer_branch(&mut self, answer: Option<&str>) -> Option<SessionEvent> {
        let FlowStep::BranchStep { index } = self.step else {
            return None;
        };
        let step_count = self.plan.as_ref()?.step_count();

        if let Some(answer) = answer {
            self.data.answers.insert(index, answer.to_string());
        }
        let event = self.emit(SessionEvent::BranchStepAnswered {
            index,
            skipped: answer.is_none(),
            at: Utc::now(),
        });

        let next = index + 1;
        if next >= step_count {
            self.enter_closure();
        } else {
            self.step = FlowStep::BranchStep { index: next };
        }
        event
    }

    /// Explicit skip out of the closing exercise.
    pub fn skip_closure(&mut self) -> Option<SessionEvent> {
        if self.step != FlowStep::Closure {
            return None;
        }
        self.closure_timer.stop();
        self.finish_closure(true)
    }

    /// Post-rating and optional confidence at the closure check.
    pub fn rate_post(&mut self, value: u8, confidence: Option<u8>) -> Option<SessionEvent> {
        if self.step != FlowStep::ClosureCheck
            || value > MAX_INTENSITY
            || confidence.is_some_and(|c| c > MAX_INTENSITY)
        {
            return None;
        }
        self.data.intensity_post = Some(value);
        self.data.confidence = confidence;
        self.step = FlowStep::Summary;
        self.summary_timer.start(self.timers.summary_timeout_secs);
        self.emit(SessionEvent::IntensityRated {
            stage: IntensityStage::Post,
            value,
            at: Utc::now(),
        })
    }

    /// Pick an anchor on the summary screen. Restarts the inactivity
    /// window.
    pub fn choose_anchor(&mut self, anchor: &str) -> Option<SessionEvent> {
        if self.step != FlowStep::Summary {
            return None;
        }
        self.data.anchor = Some(anchor.to_string());
        self.summary_timer.start(self.timers.summary_timeout_secs);
        self.emit(SessionEvent::AnchorChosen {
            anchor: anchor.to_string(),
            at: Utc::now(),
        })
    }

    /// Explicit finish from the summary screen.
    pub fn finish(&mut self) -> Option<SessionEvent> {
        if self.step != FlowStep::Summary {
            return None;
        }
        self.end(false)
    }

    /// The only way out of the crisis state.
    pub fn exit_crisis(&mut self) -> Option<SessionEvent> {
        if self.step != FlowStep::Crisis {
            return None;
        }
        self.stop_all_timers();
        self.step = FlowStep::Done;
        self.emit(SessionEvent::CrisisExited { at: Utc::now() })
    }

    /// The flow is being left (navigation away, process exit). Stops every
    /// countdown so no timer can fire afterwards; the step is untouched and
    /// the draft remains resumable.
    pub fn suspend(&mut self) -> Option<SessionEvent> {
        self.stop_all_timers();
        if self.step.is_terminal() || self.step == FlowStep::Prime {
            return None;
        }
        self.emit(SessionEvent::SessionSuspended {
            step: self.step,
            at: Utc::now(),
        })
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn start_regulation(&mut self, technique: super::policy::Technique) -> Option<SessionEvent> {
        self.data.technique = Some(technique);
        self.step = FlowStep::Regulate;
        self.regulate_timer.start(self.timers.regulate_secs);
        self.emit(SessionEvent::RegulationStarted {
            technique,
            duration_secs: self.timers.regulate_secs,
            at: Utc::now(),
        })
    }

    fn finish_regulation(&mut self, skipped: bool) -> Option<SessionEvent> {
        let technique = self.data.technique?;
        self.step = FlowStep::RegulateCheck;
        self.emit(SessionEvent::RegulationFinished {
            technique,
            skipped,
            at: Utc::now(),
        })
    }

    fn enter_closure(&mut self) {
        if let Some(plan) = &self.plan {
            self.data.validation_line = Some(plan.closing_line.clone());
        }
        self.step = FlowStep::Closure;
        self.closure_timer.start(self.timers.closure_secs);
    }

    fn finish_closure(&mut self, skipped: bool) -> Option<SessionEvent> {
        self.step = FlowStep::ClosureCheck;
        self.emit(SessionEvent::ClosureFinished {
            skipped,
            at: Utc::now(),
        })
    }

    fn end(&mut self, timed_out: bool) -> Option<SessionEvent> {
        self.stop_all_timers();
        self.data.timed_out = timed_out;
        self.step = FlowStep::Done;
        self.emit(SessionEvent::SessionEnded {
            timed_out,
            duration_secs: self.elapsed_secs(),
            at: Utc::now(),
        })
    }

    fn stop_all_timers(&mut self) {
        self.regulate_timer.stop();
        self.closure_timer.stop();
        self.summary_timer.stop();
    }

    /// Append to the buffer and hand a copy back to the caller.
    fn emit(&mut self, event: SessionEvent) -> Option<SessionEvent> {
        self.log.append(event.clone());
        Some(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::plan::{BranchPlan, BranchStepSpec, PathTag};
    use crate::flow::policy::Technique;

    fn engine() -> FlowEngine {
        FlowEngine::new(FlowPolicy::default(), TimerConfig::default())
    }

    /// Zero-length countdowns so `tick()` fires without waiting.
    fn instant_engine() -> FlowEngine {
        FlowEngine::new(
            FlowPolicy::default(),
            TimerConfig {
                regulate_secs: 0,
                closure_secs: 0,
                summary_timeout_secs: 0,
            },
        )
    }

    fn plan(path: PathTag, steps: usize) -> BranchPlan {
        BranchPlan {
            path,
            label: "test".into(),
            steps: (0..steps)
                .map(|i| BranchStepSpec::Prompt {
                    prompt: format!("q{i}"),
                })
                .collect(),
            closing_line: "done".into(),
            reasoning: None,
        }
    }

    /// Drive a fresh engine up to the capture step.
    fn to_capture(e: &mut FlowEngine) {
        e.confirm_prime("cli", false).unwrap();
        e.rate_pre(8).unwrap();
        e.skip_regulation().unwrap();
        e.rate_mid(4).unwrap(); // delta 4: no fallback
        assert_eq!(e.step(), FlowStep::Capture);
    }

    #[test]
    fn happy_path_reaches_done() {
        let mut e = engine();
        e.confirm_prime("cli", false).unwrap();
        assert_eq!(e.step(), FlowStep::IntensityPre);

        e.rate_pre(5).unwrap();
        assert_eq!(e.step(), FlowStep::Regulate);
        assert_eq!(e.data().technique, Some(Technique::PacedBreathing));

        e.skip_regulation().unwrap();
        e.rate_mid(2).unwrap();
        assert_eq!(e.step(), FlowStep::Capture);

        e.submit_capture(Some("I keep ruminating")).unwrap();
        assert_eq!(e.step(), FlowStep::PlanLoading);

        e.apply_plan(plan(PathTag::Reframe, 2), false).unwrap();
        assert_eq!(e.step(), FlowStep::BranchStep { index: 0 });

        e.answer_branch(Some("first")).unwrap();
        assert_eq!(e.step(), FlowStep::BranchStep { index: 1 });
        e.answer_branch(Some("second")).unwrap();
        assert_eq!(e.step(), FlowStep::Closure);
        assert_eq!(e.data().validation_line.as_deref(), Some("done"));

        e.skip_closure().unwrap();
        e.rate_post(2, Some(7)).unwrap();
        assert_eq!(e.step(), FlowStep::Summary);

        e.choose_anchor("breathe before email").unwrap();
        e.finish().unwrap();
        assert_eq!(e.step(), FlowStep::Done);
        assert!(!e.data().timed_out);
        assert_eq!(e.data().answers.len(), 2);
    }

    #[test]
    fn high_pre_rating_selects_grounding_technique() {
        let mut e = engine();
        e.confirm_prime("cli", false).unwrap();
        e.rate_pre(9).unwrap();
        assert_eq!(e.data().technique, Some(Technique::BodyGrounding));
    }

    #[test]
    fn fallback_loops_once_then_latches() {
        let mut e = engine();
        e.confirm_prime("cli", false).unwrap();
        e.rate_pre(8).unwrap();
        let first = e.data().technique.unwrap();

        e.skip_regulation().unwrap();
        // No improvement: loops back with the next technique.
        let ev = e.rate_mid(8).unwrap();
        assert!(matches!(ev, SessionEvent::RegulationStarted { .. }));
        assert_eq!(e.step(), FlowStep::Regulate);
        assert_eq!(e.data().technique, Some(first.next_fallback()));
        assert!(e.data().fallback_used);

        // Second low delta goes straight to capture.
        e.skip_regulation().unwrap();
        e.rate_mid(8).unwrap();
        assert_eq!(e.step(), FlowStep::Capture);
        assert!(e.data().fallback_used);
    }

    #[test]
    fn timer_zero_advances_regulation() {
        let mut e = instant_engine();
        e.confirm_prime("cli", false).unwrap();
        e.rate_pre(3).unwrap();
        assert_eq!(e.step(), FlowStep::Regulate);
        let ev = e.tick().unwrap();
        assert!(matches!(
            ev,
            SessionEvent::RegulationFinished { skipped: false, .. }
        ));
        assert_eq!(e.step(), FlowStep::RegulateCheck);
        // Countdown fired; further ticks are inert.
        assert!(e.tick().is_none());
    }

    #[test]
    fn summary_inactivity_times_out_the_session() {
        let mut e = instant_engine();
        to_capture(&mut e);
        e.submit_capture(None).unwrap();
        e.plan_failed().unwrap();
        for _ in 0..3 {
            e.answer_branch(None).unwrap();
        }
        e.tick().unwrap(); // closure countdown
        e.rate_post(4, None).unwrap();
        let ev = e.tick().unwrap(); // summary inactivity
        assert!(matches!(
            ev,
            SessionEvent::SessionEnded { timed_out: true, .. }
        ));
        assert_eq!(e.step(), FlowStep::Done);
        assert!(e.data().timed_out);
    }

    #[test]
    fn planner_failure_substitutes_offline_plan() {
        let mut e = engine();
        to_capture(&mut e);
        e.submit_capture(Some("spiralling")).unwrap();
        e.plan_failed().unwrap();
        assert_eq!(e.step(), FlowStep::BranchStep { index: 0 });
        assert_eq!(e.plan().unwrap().step_count(), 3);

        for _ in 0..3 {
            e.answer_branch(Some("ok")).unwrap();
        }
        assert_eq!(e.step(), FlowStep::Closure);
    }

    #[test]
    fn crisis_plan_suspends_all_advancement() {
        let mut e = engine();
        to_capture(&mut e);
        e.submit_capture(Some("unsafe")).unwrap();
        let ev = e.apply_plan(plan(PathTag::Crisis, 0), false).unwrap();
        assert!(matches!(ev, SessionEvent::CrisisEntered { .. }));
        assert_eq!(e.step(), FlowStep::Crisis);

        // Nothing moves the flow while in crisis.
        assert!(e.answer_branch(Some("x")).is_none());
        assert!(e.rate_mid(1).is_none());
        assert!(e.tick().is_none());
        assert!(e.finish().is_none());
        assert_eq!(e.step(), FlowStep::Crisis);

        e.exit_crisis().unwrap();
        assert_eq!(e.step(), FlowStep::Done);
    }

    #[test]
    fn late_crisis_decision_overrides_branch_progress() {
        let mut e = engine();
        to_capture(&mut e);
        e.submit_capture(Some("text")).unwrap();
        e.apply_plan(plan(PathTag::Defuse, 3), false).unwrap();
        e.answer_branch(Some("a")).unwrap();

        e.apply_plan(plan(PathTag::Crisis, 0), false).unwrap();
        assert_eq!(e.step(), FlowStep::Crisis);
    }

    #[test]
    fn stale_non_crisis_plan_is_ignored() {
        let mut e = engine();
        to_capture(&mut e);
        e.submit_capture(Some("text")).unwrap();
        e.apply_plan(plan(PathTag::Defuse, 2), false).unwrap();
        e.answer_branch(Some("a")).unwrap();

        // A second (late) decision must not reset the cursor or swap plans.
        assert!(e.apply_plan(plan(PathTag::Reframe, 5), false).is_none());
        assert_eq!(e.step(), FlowStep::BranchStep { index: 1 });
        assert_eq!(e.plan().unwrap().path, PathTag::Defuse);
    }

    #[test]
    fn out_of_range_ratings_are_rejected() {
        let mut e = engine();
        e.confirm_prime("cli", false).unwrap();
        assert!(e.rate_pre(11).is_none());
        assert_eq!(e.step(), FlowStep::IntensityPre);
        e.rate_pre(10).unwrap();
        assert_eq!(e.step(), FlowStep::Regulate);
    }

    #[test]
    fn session_id_only_fills_in_once() {
        let mut e = engine();
        e.set_session_id("s-1".into());
        e.set_session_id("s-2".into());
        assert_eq!(e.session_id(), Some("s-1"));
    }

    #[test]
    fn resume_restores_recorded_step_and_data() {
        let mut e = engine();
        to_capture(&mut e);
        e.submit_capture(Some("the thought")).unwrap();
        e.apply_plan(plan(PathTag::Reframe, 4), false).unwrap();
        e.answer_branch(Some("a0")).unwrap();
        e.answer_branch(Some("a1")).unwrap();
        assert_eq!(e.step(), FlowStep::BranchStep { index: 2 });

        // Round-trip through the draft representation.
        let json = serde_json::to_string(&e).unwrap();
        let mut restored: FlowEngine = serde_json::from_str(&json).unwrap();
        restored.offer_resume();
        assert_eq!(restored.step(), FlowStep::ResumePrompt);

        let ev = restored.resume().unwrap();
        assert!(matches!(
            ev,
            SessionEvent::DraftResumed {
                step: FlowStep::BranchStep { index: 2 },
                ..
            }
        ));
        assert_eq!(restored.step(), FlowStep::BranchStep { index: 2 });
        assert_eq!(restored.data().answers, e.data().answers);
        assert_eq!(restored.plan(), e.plan());
        assert_eq!(restored.data().captured_text, "the thought");
    }

    #[test]
    fn discard_leaves_no_residue() {
        let mut e = engine();
        e.set_session_id("s-9".into());
        to_capture(&mut e);
        e.submit_capture(Some("secret")).unwrap();
        e.offer_resume();

        e.discard().unwrap();
        assert_eq!(e.step(), FlowStep::Prime);
        assert!(e.session_id().is_none());
        assert!(e.data().captured_text.is_empty());
        assert!(e.plan().is_none());
        assert!(e.log().is_empty());
        assert_eq!(e.data(), &StepData::default());
    }

    #[test]
    fn suspend_stops_timers_and_keeps_step() {
        let mut e = engine();
        e.confirm_prime("cli", false).unwrap();
        e.rate_pre(5).unwrap();
        assert!(e.remaining_secs() > 0);

        e.suspend().unwrap();
        assert_eq!(e.step(), FlowStep::Regulate);
        assert_eq!(e.remaining_secs(), 0);
        // A stopped countdown cannot fire.
        assert!(e.tick().is_none());
    }

    #[test]
    fn empty_plan_goes_straight_to_closure() {
        let mut e = engine();
        to_capture(&mut e);
        e.submit_capture(None).unwrap();
        e.apply_plan(plan(PathTag::Ground, 0), false).unwrap();
        assert_eq!(e.step(), FlowStep::Closure);
    }

    #[test]
    fn every_transition_lands_in_the_event_buffer() {
        let mut e = engine();
        e.confirm_prime("cli", true).unwrap();
        e.rate_pre(6).unwrap();
        e.skip_regulation().unwrap();
        e.rate_mid(3).unwrap();
        // SessionStarted, IntensityRated(pre), RegulationStarted,
        // RegulationFinished, IntensityRated(mid).
        assert_eq!(e.log().len(), 5);
    }
}
