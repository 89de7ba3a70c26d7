//! Drives the flow engine against the draft store and session gateway.
//!
//! The runner owns the per-transition choreography the engine itself stays
//! free of: append happened inside the engine, then (1) write the draft,
//! (2) drain the event buffer into a best-effort progress patch. Transitions
//! are applied before any network attempt; a failed or stale gateway
//! response never rolls the step back. The only gateway failures a caller
//! ever sees are "could not create the session" (blocks leaving `prime`)
//! and "cannot end a session that was never created".

use crate::error::GatewayError;
use crate::events::SessionEvent;
use crate::storage::{Config, DraftStore};
use crate::sync::{
    CreateSessionRequest, PlanRequest, ProgressPatch, SessionGateway, SessionOutcome,
};

use super::engine::{FlowEngine, FlowStatus};
use super::state::FlowStep;

pub struct SessionRunner<G: SessionGateway> {
    engine: FlowEngine,
    gateway: G,
    drafts: DraftStore,
    client_id: String,
    /// Last connectivity failure, kept for status display. Cleared by the
    /// next successful sync.
    last_sync_error: Option<GatewayError>,
}

impl<G: SessionGateway> SessionRunner<G> {
    /// Cold start: read the draft store once; a resumable draft parks the
    /// flow behind the resume prompt, anything else starts fresh.
    pub fn cold_start(config: &Config, gateway: G, drafts: DraftStore, client_id: String) -> Self {
        let engine = match drafts.load() {
            Some(mut saved) => {
                saved.offer_resume();
                if saved.step() == FlowStep::ResumePrompt {
                    saved
                } else {
                    FlowEngine::new(config.policy, config.timers)
                }
            }
            None => FlowEngine::new(config.policy, config.timers),
        };
        Self {
            engine,
            gateway,
            drafts,
            client_id,
            last_sync_error: None,
        }
    }

    /// Attach to the run in progress without the resume prompt: the saved
    /// draft becomes the live engine verbatim. Countdowns keep running on
    /// the wall clock, so short-lived callers (one CLI invocation per
    /// command) step the same run across processes.
    pub fn attach(config: &Config, gateway: G, drafts: DraftStore, client_id: String) -> Self {
        let engine = drafts
            .load()
            .unwrap_or_else(|| FlowEngine::new(config.policy, config.timers));
        Self {
            engine,
            gateway,
            drafts,
            client_id,
            last_sync_error: None,
        }
    }

    pub fn engine(&self) -> &FlowEngine {
        &self.engine
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn status(&self) -> FlowStatus {
        self.engine.status()
    }

    pub fn last_sync_error(&self) -> Option<&GatewayError> {
        self.last_sync_error.as_ref()
    }

    // ── Lifecycle commands ───────────────────────────────────────────

    /// Commit to starting. Creates the remote session first; on failure the
    /// flow stays at `prime` and the error is retryable by calling again.
    pub fn begin(&mut self, entry_point: &str, quick: bool) -> Result<(), GatewayError> {
        if self.engine.step() != FlowStep::Prime {
            return Ok(());
        }
        if self.engine.session_id().is_none() {
            let id = self.gateway.create_session(&CreateSessionRequest {
                entry_point: entry_point.to_string(),
                quick,
                client_id: self.client_id.clone(),
            })?;
            self.engine.set_session_id(id);
        }
        let _ = self.engine.confirm_prime(entry_point, quick);
        self.checkpoint();
        Ok(())
    }

    pub fn resume(&mut self) -> Option<SessionEvent> {
        let ev = self.engine.resume();
        if ev.is_some() {
            self.checkpoint();
        }
        ev
    }

    /// Discard the recorded run: clears the draft and resets to `prime`.
    pub fn discard(&mut self) -> Option<SessionEvent> {
        let ev = self.engine.discard()?;
        let _ = self.drafts.clear();
        Some(ev)
    }

    // ── Step commands (thin checkpointing wrappers) ──────────────────

    pub fn rate_pre(&mut self, value: u8) -> Option<SessionEvent> {
        self.after(|e| e.rate_pre(value))
    }

    pub fn tick(&mut self) -> Option<SessionEvent> {
        self.after(|e| e.tick())
    }

    pub fn skip_regulation(&mut self) -> Option<SessionEvent> {
        self.after(|e| e.skip_regulation())
    }

    pub fn rate_mid(&mut self, value: u8) -> Option<SessionEvent> {
        self.after(|e| e.rate_mid(value))
    }

    /// Submit (or skip) the captured thought, then consult the planner.
    /// A planner failure substitutes the offline default plan; the flow
    /// proceeds either way.
    pub fn capture(&mut self, text: Option<&str>) -> Option<SessionEvent> {
        let ev = self.engine.submit_capture(text)?;
        let decided = match self.gateway.decide_plan(&PlanRequest::from_engine(&self.engine)) {
            Ok(plan) => self.engine.apply_plan(plan, false),
            Err(e) => {
                self.last_sync_error = Some(e);
                self.engine.plan_failed()
            }
        };
        self.checkpoint();
        decided.or(Some(ev))
    }

    pub fn answer_branch(&mut self, answer: Option<&str>) -> Option<SessionEvent> {
        self.after(|e| e.answer_branch(answer))
    }

    pub fn skip_closure(&mut self) -> Option<SessionEvent> {
        self.after(|e| e.skip_closure())
    }

    pub fn rate_post(&mut self, value: u8, confidence: Option<u8>) -> Option<SessionEvent> {
        self.after(|e| e.rate_post(value, confidence))
    }

    pub fn choose_anchor(&mut self, anchor: &str) -> Option<SessionEvent> {
        self.after(|e| e.choose_anchor(anchor))
    }

    /// Explicit finish from the summary screen. Requires the session to
    /// have been created; this is the one user-visible gateway error.
    pub fn finish(&mut self) -> Result<Option<SessionEvent>, GatewayError> {
        let Some(ev) = self.engine.finish() else {
            return Ok(None);
        };
        self.end_remote()?;
        Ok(Some(ev))
    }

    /// Leave the crisis state. Clears the draft; the exit event still goes
    /// out best-effort with the final patch.
    pub fn exit_crisis(&mut self) -> Option<SessionEvent> {
        let ev = self.engine.exit_crisis()?;
        self.try_sync();
        let _ = self.drafts.clear();
        Some(ev)
    }

    /// The flow is being left; stop timers and keep the draft resumable.
    pub fn suspend(&mut self) -> Option<SessionEvent> {
        let ev = self.engine.suspend();
        if ev.is_some() {
            self.checkpoint();
        }
        ev
    }

    /// Push any buffered events now, outside a transition. Returns how many
    /// events are still waiting (0 after a successful flush).
    pub fn flush(&mut self) -> usize {
        self.try_sync();
        if !self.engine.step().is_terminal() {
            let _ = self.drafts.save(&self.engine);
        }
        self.engine.log().len()
    }

    /// Final outcome for callers that record local history.
    pub fn outcome(&self) -> SessionOutcome {
        SessionOutcome::from_engine(&self.engine)
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn after(
        &mut self,
        f: impl FnOnce(&mut FlowEngine) -> Option<SessionEvent>,
    ) -> Option<SessionEvent> {
        let ev = f(&mut self.engine)?;
        // A tick can drive the summary timeout into a terminal end.
        if self.engine.step().is_terminal() {
            if let Err(e) = self.end_remote() {
                self.last_sync_error = Some(e);
            }
        } else {
            self.checkpoint();
        }
        Some(ev)
    }

    /// Draft write plus best-effort sync. Never blocks or fails the
    /// transition that triggered it.
    fn checkpoint(&mut self) {
        if self.engine.step().is_terminal() {
            let _ = self.drafts.clear();
        } else {
            let _ = self.drafts.save(&self.engine);
        }
        self.try_sync();
    }

    /// Drain-and-send. On failure the batch goes back to the head of the
    /// buffer so the next attempt retries the same events in order.
    fn try_sync(&mut self) {
        let Some(id) = self.engine.session_id().map(str::to_owned) else {
            return;
        };
        if self.engine.log().is_empty() {
            return;
        }
        let batch = self.engine.log_mut().drain();
        let patch = ProgressPatch::from_engine(&self.engine, batch.clone());
        match self.gateway.patch_progress(&id, &patch) {
            Ok(()) => {
                self.last_sync_error = None;
            }
            Err(e) => {
                self.engine.log_mut().requeue_front(batch);
                self.last_sync_error = Some(e);
            }
        }
    }

    /// Flush remaining events and send the terminal update, then clear the
    /// draft. Completion always clears the draft; the error reports what
    /// the backend never heard.
    fn end_remote(&mut self) -> Result<(), GatewayError> {
        self.try_sync();
        let result = match self.engine.session_id().map(str::to_owned) {
            None => Err(GatewayError::SessionNotCreated),
            Some(id) => self
                .gateway
                .end_session(&id, &SessionOutcome::from_engine(&self.engine)),
        };
        let _ = self.drafts.clear();
        result
    }
}
