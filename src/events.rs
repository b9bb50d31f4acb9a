//! Worker-to-presentation event dispatch
//!
//! Completion results are carried back to the presentation thread as
//! immutable payloads rather than closures over shared mutable state. The
//! embedding application drains the dispatcher on its presentation loop;
//! tests drain it directly.

use crate::types::SourceId;
use crossbeam_channel::{unbounded, Receiver, Sender};

/// Reconciliation payload posted by the capture worker
#[derive(Debug, Clone, PartialEq)]
pub enum SourceEvent {
    /// A start attempt finished on the worker
    StartCompleted {
        id: SourceId,
        /// Start generation the attempt belongs to; stale generations are
        /// discarded by the controller
        generation: u64,
        ok: bool,
        /// Negotiated mode string, empty when unavailable
        mode: String,
        /// Failure detail, empty on success
        error: String,
    },
}

impl SourceEvent {
    pub fn source(&self) -> SourceId {
        match self {
            SourceEvent::StartCompleted { id, .. } => *id,
        }
    }
}

/// Sending half handed to controllers
#[derive(Clone)]
pub struct EventSink {
    tx: Sender<SourceEvent>,
}

impl EventSink {
    pub fn post(&self, event: SourceEvent) {
        let _ = self.tx.send(event);
    }
}

/// Presentation-side event queue
pub struct Dispatcher {
    tx: Sender<SourceEvent>,
    rx: Receiver<SourceEvent>,
}

impl Dispatcher {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    pub fn sink(&self) -> EventSink {
        EventSink {
            tx: self.tx.clone(),
        }
    }

    /// Next pending event, if any (non-blocking)
    pub fn try_next(&self) -> Option<SourceEvent> {
        self.rx.try_recv().ok()
    }

    /// Drain all currently pending events
    pub fn drain(&self) -> Vec<SourceEvent> {
        let mut events = Vec::new();
        while let Some(ev) = self.try_next() {
            events.push(ev);
        }
        events
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_arrive_in_order() {
        let dispatcher = Dispatcher::new();
        let sink = dispatcher.sink();
        for generation in 1..=3 {
            sink.post(SourceEvent::StartCompleted {
                id: SourceId::External,
                generation,
                ok: true,
                mode: String::new(),
                error: String::new(),
            });
        }
        let drained = dispatcher.drain();
        assert_eq!(drained.len(), 3);
        match &drained[0] {
            SourceEvent::StartCompleted { generation, .. } => assert_eq!(*generation, 1),
        }
        assert!(dispatcher.try_next().is_none());
    }
}
