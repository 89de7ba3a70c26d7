//! Append-only buffer of session events awaiting sync.
//!
//! Drain-and-send is atomic from the caller's perspective: the buffer is
//! emptied into a batch *before* the network call, so events appended while
//! the call is in flight are neither included in that batch nor lost. A
//! failed call must hand its batch back via [`EventLog::requeue_front`],
//! which restores original order ahead of anything appended since. No event
//! is ever dropped by a failed sync; duplicate delivery on retry is the
//! backend's problem (it deduplicates).

use serde::{Deserialize, Serialize};

use crate::events::SessionEvent;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventLog {
    buffer: Vec<SessionEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// O(1) append.
    pub fn append(&mut self, event: SessionEvent) {
        self.buffer.push(event);
    }

    /// Empty the buffer into a batch for an outgoing sync call.
    pub fn drain(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.buffer)
    }

    /// Return a failed batch to the head of the buffer, ahead of any events
    /// appended since the drain, preserving original order.
    pub fn requeue_front(&mut self, mut batch: Vec<SessionEvent>) {
        batch.append(&mut self.buffer);
        self.buffer = batch;
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn events(&self) -> &[SessionEvent] {
        &self.buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use proptest::prelude::*;

    fn ev(n: usize) -> SessionEvent {
        SessionEvent::BranchStepAnswered {
            index: n,
            skipped: false,
            at: Utc::now(),
        }
    }

    fn index_of(e: &SessionEvent) -> usize {
        match e {
            SessionEvent::BranchStepAnswered { index, .. } => *index,
            _ => unreachable!(),
        }
    }

    #[test]
    fn drain_empties_the_buffer() {
        let mut log = EventLog::new();
        log.append(ev(0));
        log.append(ev(1));
        let batch = log.drain();
        assert_eq!(batch.len(), 2);
        assert!(log.is_empty());
    }

    #[test]
    fn requeue_front_preserves_order_ahead_of_new_events() {
        let mut log = EventLog::new();
        log.append(ev(0));
        log.append(ev(1));
        let batch = log.drain();

        // Events generated while the "call" was in flight.
        log.append(ev(2));
        log.append(ev(3));

        log.requeue_front(batch);
        let order: Vec<usize> = log.events().iter().map(index_of).collect();
        assert_eq!(order, vec![0, 1, 2, 3]);
    }

    #[test]
    fn failed_sync_never_reduces_event_count() {
        let mut log = EventLog::new();
        log.append(ev(0));
        log.append(ev(1));
        let before = log.len();

        let batch = log.drain();
        log.append(ev(2)); // appended during the failing call
        log.requeue_front(batch);

        assert_eq!(log.len(), before + 1);
    }

    proptest! {
        /// For any interleaving of appends, failed syncs and successful
        /// syncs, every appended event is delivered exactly once from the
        /// log's point of view, in original append order.
        #[test]
        fn delivery_preserves_order_across_retries(ops in proptest::collection::vec(0u8..3, 1..60)) {
            let mut log = EventLog::new();
            let mut appended = 0usize;
            let mut delivered: Vec<usize> = Vec::new();

            for op in ops {
                match op {
                    // Append a fresh event.
                    0 => {
                        log.append(ev(appended));
                        appended += 1;
                    }
                    // Sync attempt that fails mid-flight with a concurrent append.
                    1 => {
                        let batch = log.drain();
                        log.append(ev(appended));
                        appended += 1;
                        log.requeue_front(batch);
                    }
                    // Successful sync.
                    _ => {
                        delivered.extend(log.drain().iter().map(index_of));
                    }
                }
            }
            delivered.extend(log.drain().iter().map(index_of));

            prop_assert_eq!(delivered.len(), appended);
            let expected: Vec<usize> = (0..appended).collect();
            prop_assert_eq!(delivered, expected);
        }
    }
}
