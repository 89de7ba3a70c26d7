//! The session gateway contract.
//!
//! Everything the orchestrator needs from the backend, transport-agnostic:
//! create/patch/end a session record and ask the planner for a branch
//! decision. The core depends on this trait only; the HTTP implementation
//! lives in `sync::http_gateway` and tests plug in mocks.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::GatewayError;
use crate::events::SessionEvent;
use crate::flow::engine::FlowEngine;
use crate::flow::plan::{BranchPlan, PathTag};
use crate::flow::policy::Technique;
use crate::flow::state::FlowStep;

/// Initial context sent when the user commits to starting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateSessionRequest {
    pub entry_point: String,
    pub quick: bool,
    pub client_id: String,
}

/// Idempotent partial update: the full current snapshot of step-local
/// fields plus the drained event batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressPatch {
    pub step: FlowStep,
    pub intensity_pre: Option<u8>,
    pub intensity_mid: Option<u8>,
    pub intensity_post: Option<u8>,
    pub captured_text: String,
    pub path: Option<PathTag>,
    pub technique: Option<Technique>,
    pub fallback_used: bool,
    pub answers: BTreeMap<usize, String>,
    pub events: Vec<SessionEvent>,
}

impl ProgressPatch {
    /// Snapshot the engine's step-local fields, attaching an already
    /// drained event batch.
    pub fn from_engine(engine: &FlowEngine, events: Vec<SessionEvent>) -> Self {
        let data = engine.data();
        Self {
            step: engine.step(),
            intensity_pre: data.intensity_pre,
            intensity_mid: data.intensity_mid,
            intensity_post: data.intensity_post,
            captured_text: data.captured_text.clone(),
            path: engine.plan().map(|p| p.path),
            technique: data.technique,
            fallback_used: data.fallback_used,
            answers: data.answers.clone(),
            events,
        }
    }
}

/// Terminal update carrying the final outcome fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionOutcome {
    pub intensity_post: Option<u8>,
    pub confidence: Option<u8>,
    pub anchor: Option<String>,
    pub path: Option<PathTag>,
    pub technique: Option<Technique>,
    pub fallback_used: bool,
    pub timed_out: bool,
    pub duration_secs: u64,
}

impl SessionOutcome {
    pub fn from_engine(engine: &FlowEngine) -> Self {
        let data = engine.data();
        Self {
            intensity_post: data.intensity_post,
            confidence: data.confidence,
            anchor: data.anchor.clone(),
            path: engine.plan().map(|p| p.path),
            technique: data.technique,
            fallback_used: data.fallback_used,
            timed_out: data.timed_out,
            duration_secs: engine.elapsed_secs(),
        }
    }
}

/// Request for the planner's branch decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanRequest {
    pub captured_text: String,
    pub intensity_pre: Option<u8>,
    pub intensity_mid: Option<u8>,
}

impl PlanRequest {
    pub fn from_engine(engine: &FlowEngine) -> Self {
        let data = engine.data();
        Self {
            captured_text: data.captured_text.clone(),
            intensity_pre: data.intensity_pre,
            intensity_mid: data.intensity_mid,
        }
    }
}

/// Backend contract consumed by the flow runner.
///
/// Implementations must be safe to call repeatedly with the same payload;
/// the runner retries patches opportunistically and the backend store
/// tolerates at-least-once event delivery.
pub trait SessionGateway: Send + Sync {
    /// Create the remote session record; returns its identifier.
    fn create_session(&self, req: &CreateSessionRequest) -> Result<String, GatewayError>;

    /// Idempotent progress update. No response body is consumed.
    fn patch_progress(&self, session_id: &str, patch: &ProgressPatch) -> Result<(), GatewayError>;

    /// Terminal update.
    fn end_session(&self, session_id: &str, outcome: &SessionOutcome) -> Result<(), GatewayError>;

    /// Ask the planner which intervention path to take.
    fn decide_plan(&self, req: &PlanRequest) -> Result<BranchPlan, GatewayError>;
}
