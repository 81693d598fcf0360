//! The per-activation turn loop.
//!
//! Exactly one envelope is dispatched at a time by default, giving an actor's
//! state single-threaded semantics even though the runtime is built on tokio.
//! An actor may opt into reentrancy, in which case a reply belonging to the
//! same logical call chain — identified by `correlation_id` — may run
//! concurrently with the turn that is awaiting it, rather than queue behind
//! unrelated work. This mirrors the request/response pattern riker's `ask`
//! helper builds on, generalized to the mailbox itself.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{trace, warn};

use crate::error::Result;
use crate::identity::MessageId;
use crate::mailbox::queue::Mailbox;
use crate::message::Envelope;

/// Whether an activation accepts reentrant turns for its own call chains.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reentrancy {
    Off,
    On,
}

/// A cooperative cancellation signal handed to a dispatched turn.
///
/// The runtime never preempts a turn; a long-running handler is expected to
/// poll [`CancellationToken::is_cancelled`] at suspension points.
#[derive(Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<std::sync::atomic::AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, std::sync::atomic::Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(std::sync::atomic::Ordering::Acquire)
    }
}

/// Dispatches a single envelope to the actor occupying an activation.
///
/// Implemented by the activation (see `crate::directory`), which owns the
/// boxed `Actor` instance and performs the generic-to-concrete method call.
#[async_trait]
pub trait Dispatch: Send + Sync {
    async fn dispatch(&self, envelope: Envelope, cancel: CancellationToken) -> Result<Option<Envelope>>;
}

/// Runs the turn loop for one activation until its mailbox closes and drains.
///
/// Spawns onto the current tokio runtime and returns a handle the caller may
/// await for graceful shutdown.
pub fn spawn_turn_loop(
    mut mailbox: Mailbox,
    dispatcher: Arc<dyn Dispatch>,
    reentrancy: Reentrancy,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let in_flight_chains: Arc<Mutex<HashSet<MessageId>>> = Arc::new(Mutex::new(HashSet::new()));
        let mut concurrent: Vec<JoinHandle<()>> = Vec::new();

        while let Some(envelope) = mailbox.recv().await {
            let is_reentrant_reply = reentrancy == Reentrancy::On
                && envelope
                    .correlation_id
                    .as_ref()
                    .map(|id| {
                        // Non-blocking best-effort check; a racing insert is fine,
                        // it only means this reply misses one turn's overlap window.
                        in_flight_chains.try_lock().map(|g| g.contains(id)).unwrap_or(false)
                    })
                    .unwrap_or(false);

            if is_reentrant_reply {
                let dispatcher = dispatcher.clone();
                let identity = mailbox.identity().clone();
                let chains = in_flight_chains.clone();
                let chain_id = envelope.correlation_id.clone();
                let cancel = cancel.clone();
                concurrent.push(tokio::spawn(async move {
                    if let Err(err) = dispatcher.dispatch(envelope, cancel).await {
                        warn!(%identity, error = %err, "reentrant turn failed");
                    }
                    if let Some(id) = chain_id {
                        chains.lock().await.remove(&id);
                    }
                }));
                concurrent.retain(|h| !h.is_finished());
                continue;
            }

            let chain_id = envelope.message_id.clone();
            in_flight_chains.lock().await.insert(chain_id.clone());

            if let Err(err) = dispatcher.dispatch(envelope, cancel.clone()).await {
                warn!(identity = %mailbox.identity(), error = %err, "turn failed");
            }

            in_flight_chains.lock().await.remove(&chain_id);
            concurrent.retain(|h| !h.is_finished());
        }

        for handle in concurrent {
            let _ = handle.await;
        }
        trace!(identity = %mailbox.identity(), "turn loop exited");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{ActorIdentity, MessageIdGenerator};
    use crate::mailbox::queue::mailbox;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingDispatcher {
        seen: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Dispatch for CountingDispatcher {
        async fn dispatch(&self, _envelope: Envelope, _cancel: CancellationToken) -> Result<Option<Envelope>> {
            self.seen.fetch_add(1, Ordering::SeqCst);
            Ok(None)
        }
    }

    #[tokio::test]
    async fn processes_all_enqueued_envelopes() {
        let identity = ActorIdentity::new("T", "1");
        let (sender, mbox) = mailbox(identity.clone(), 8);
        let gen = MessageIdGenerator::new();
        for _ in 0..5 {
            sender
                .try_enqueue(Envelope::new(identity.clone(), "m", vec![], gen.next()))
                .unwrap();
        }
        let seen = Arc::new(AtomicUsize::new(0));
        let dispatcher = Arc::new(CountingDispatcher { seen: seen.clone() });
        mbox.close();
        drop(sender);

        spawn_turn_loop(mbox, dispatcher, Reentrancy::Off, CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 5);
    }
}
