//! Event-log synchronization layer.
//!
//! The flow buffers every session event locally; on each transition the
//! runner drains the buffer into a progress patch and sends it best-effort.
//! A failed send returns its batch to the head of the buffer, so delivery
//! is at-least-once and never lossy.

pub mod client_id;
pub mod event_log;
pub mod gateway;
pub mod http_gateway;


pub use client_id::{get_or_create_client_id, get_or_create_client_id_at, ClientIdError};
pub use event_log::EventLog;
pub use gateway::{
    CreateSessionRequest, PlanRequest, ProgressPatch, SessionGateway, SessionOutcome,
};
pub use http_gateway::HttpGateway;
