//! # Steady Core Library
//!
//! This library provides the core logic for Steady, a guided self-regulation
//! session tool. It implements a CLI-first philosophy where every operation
//! is available via a standalone CLI binary; any GUI is a thin layer over the
//! same core library.
//!
//! ## Architecture
//!
//! - **Flow Engine**: A wall-clock-based state machine for the session flow
//!   that requires the caller to periodically invoke `tick()` for countdown
//!   progress
//! - **Runner**: Wires the engine to draft persistence and the session
//!   gateway, checkpointing after every transition
//! - **Storage**: SQLite-based session history and TOML-based configuration
//! - **Sync**: At-least-once event delivery to the remote session gateway
//!
//! ## Key Components
//!
//! - [`FlowEngine`]: Core session state machine
//! - [`SessionRunner`]: Engine + draft store + gateway choreography
//! - [`Database`]: Local history and statistics persistence
//! - [`Config`]: Application configuration management
//! - [`SessionGateway`]: Trait for the remote backend

pub mod error;
pub mod events;
pub mod flow;
pub mod storage;
pub mod sync;
pub mod timer;

pub use error::{ConfigError, CoreError, DatabaseError, DraftError, GatewayError};
pub use events::SessionEvent;
pub use flow::{
    BranchPlan, BranchStepSpec, FlowEngine, FlowPolicy, FlowStatus, FlowStep, PathTag,
    SessionRunner, Technique, TimerConfig,
};
pub use storage::{Config, Database, DraftStore, GatewayConfig, SessionRecord, Stats};
pub use sync::{EventLog, HttpGateway, SessionGateway};
pub use timer::Countdown;
