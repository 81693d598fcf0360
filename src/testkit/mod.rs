//! Reference implementations and a small event probe for integration tests,
//! re-exported here so a test only needs one `use crate::testkit::*`.
//!
//! The probe is modeled on the teacher's own `riker_testkit::probe`: a
//! cloneable sender side handed to actors or callbacks, and a receiver side
//! the test asserts against, so ordering across concurrent activations can
//! be observed without sprinkling `Arc<Mutex<Vec<_>>>` through every test.

use std::sync::mpsc::{channel, Receiver, Sender};
use std::time::Duration;

pub use crate::membership::InMemoryMembership;
pub use crate::persistence::InMemoryStateStore;
pub use crate::reminders::InMemoryReminderTable;
pub use crate::transport::in_memory::{pair as in_memory_transport_pair, InMemoryTransport};

/// The sender half of an event probe; `Clone` so every actor or callback
/// that wants to record an event can hold its own copy.
#[derive(Clone)]
pub struct Probe<T> {
    tx: Sender<T>,
}

impl<T> Probe<T> {
    pub fn record(&self, event: T) {
        // A closed receiver (test already finished asserting) is not an error.
        let _ = self.tx.send(event);
    }
}

/// The receiver half, held by the test itself.
pub struct ProbeReceiver<T> {
    rx: Receiver<T>,
}

impl<T> ProbeReceiver<T> {
    /// Blocks the current thread briefly waiting for the next recorded
    /// event. Intended for use from `tokio::test` via `spawn_blocking`, or
    /// from plain synchronous test bodies.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<T> {
        self.rx.recv_timeout(timeout).ok()
    }

    pub fn drain(&self) -> Vec<T> {
        self.rx.try_iter().collect()
    }
}

/// Builds a connected probe pair.
pub fn probe<T>() -> (Probe<T>, ProbeReceiver<T>) {
    let (tx, rx) = channel();
    (Probe { tx }, ProbeReceiver { rx })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn probe_delivers_events_in_order() {
        let (probe, receiver) = probe::<&'static str>();
        probe.record("first");
        probe.record("second");
        assert_eq!(receiver.drain(), vec!["first", "second"]);
    }

    #[test]
    fn probe_timeout_returns_none_when_empty() {
        let (_probe, receiver) = probe::<()>();
        assert!(receiver.recv_timeout(Duration::from_millis(10)).is_none());
    }
}
