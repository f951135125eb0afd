//! In-memory event queue

use parking_lot::Mutex;

use crate::types::TrackingEvent;

/// Unbounded FIFO of events waiting for a flush
///
/// A single buffer is shared by all ads. `drain` swaps it out under the lock,
/// so a submission either lands in the drained buffer or in the fresh one,
/// never in between.
#[derive(Debug, Default)]
pub struct EventQueue {
    buffer: Mutex<Vec<TrackingEvent>>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append to the tail, returning the queue length after the append
    pub fn push(&self, event: TrackingEvent) -> usize {
        let mut buffer = self.buffer.lock();
        buffer.push(event);
        buffer.len()
    }

    /// Take everything currently queued, leaving the queue empty
    pub fn drain(&self) -> Vec<TrackingEvent> {
        std::mem::take(&mut *self.buffer.lock())
    }

    /// Put drained events back at the head of the queue
    ///
    /// They keep their original order and stay ahead of anything submitted
    /// while they were out.
    pub fn requeue(&self, mut events: Vec<TrackingEvent>) {
        if events.is_empty() {
            return;
        }
        let mut buffer = self.buffer.lock();
        events.append(&mut buffer);
        *buffer = events;
    }

    pub fn len(&self) -> usize {
        self.buffer.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.lock().is_empty()
    }

    /// Number of queued events for one ad
    pub fn queued_for(&self, ad_id: &str) -> usize {
        self.buffer
            .lock()
            .iter()
            .filter(|e| e.ad_id == ad_id)
            .count()
    }
}
