//! Wall-clock countdown for timed steps.
//!
//! No internal threads -- the caller is responsible for calling `tick()`
//! periodically, and the countdown computes elapsed time from wall-clock
//! deltas. Each logical slot (regulation, closure, summary inactivity) owns
//! its own [`Countdown`]; slots are independent and may run concurrently.
//!
//! Guarantees:
//! - the zero signal is reported exactly once per `start`, never after
//!   `stop`;
//! - `stop` is idempotent and a no-op once zero has fired;
//! - `start` on a running countdown replaces it, so at most one countdown
//!   is active per slot.

use serde::{Deserialize, Serialize};

/// A single countdown slot.
///
/// Serializable so it survives a draft snapshot, although a resumed run
/// restarts its timed step from the full duration rather than trusting a
/// stale epoch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Countdown {
    /// Configured duration in seconds for the current run.
    total_secs: u64,
    /// Epoch ms when the countdown was started; `None` when stopped.
    #[serde(default)]
    started_epoch_ms: Option<u64>,
    /// Whether zero has already been reported for the current start.
    #[serde(default)]
    fired: bool,
}

impl Countdown {
    /// An inert countdown that will never fire until started.
    pub fn idle() -> Self {
        Self {
            total_secs: 0,
            started_epoch_ms: None,
            fired: false,
        }
    }

    /// Begin a fresh countdown, replacing any countdown in progress.
    pub fn start(&mut self, duration_secs: u64) {
        self.total_secs = duration_secs;
        self.started_epoch_ms = Some(now_ms());
        self.fired = false;
    }

    /// Cancel the countdown. Idempotent; a no-op after zero has fired.
    pub fn stop(&mut self) {
        self.started_epoch_ms = None;
    }

    pub fn is_running(&self) -> bool {
        self.started_epoch_ms.is_some() && !self.fired
    }

    /// Seconds left, rounded up. Zero when stopped or already fired.
    pub fn remaining_secs(&self) -> u64 {
        self.remaining_secs_at(now_ms())
    }

    /// Check the countdown against the wall clock.
    ///
    /// Returns `true` exactly once, when the countdown reaches zero.
    pub fn tick(&mut self) -> bool {
        self.tick_at(now_ms())
    }

    /// Deterministic variant of [`Countdown::tick`] for callers that manage
    /// their own clock.
    pub fn tick_at(&mut self, now_epoch_ms: u64) -> bool {
        let Some(started) = self.started_epoch_ms else {
            return false;
        };
        if self.fired {
            return false;
        }
        let elapsed = now_epoch_ms.saturating_sub(started);
        if elapsed >= self.total_secs.saturating_mul(1000) {
            self.fired = true;
            self.started_epoch_ms = None;
            return true;
        }
        false
    }

    /// Deterministic variant of [`Countdown::remaining_secs`].
    pub fn remaining_secs_at(&self, now_epoch_ms: u64) -> u64 {
        let Some(started) = self.started_epoch_ms else {
            return 0;
        };
        if self.fired {
            return 0;
        }
        let elapsed_ms = now_epoch_ms.saturating_sub(started);
        let total_ms = self.total_secs.saturating_mul(1000);
        total_ms.saturating_sub(elapsed_ms).div_ceil(1000)
    }
}

impl Default for Countdown {
    fn default() -> Self {
        Self::idle()
    }
}

fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
