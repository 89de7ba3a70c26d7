pub mod engine;
pub mod plan;
pub mod policy;
pub mod runner;
pub mod state;

pub use engine::{FlowEngine, FlowStatus};
pub use plan::{BranchPlan, BranchStepSpec, PathTag};
pub use policy::{FlowPolicy, Technique, TimerConfig};
pub use runner::SessionRunner;
pub use state::{FlowStep, IntensityStage, StepData};
