//! The bounded, ordered queue backing one activation's mailbox.
//!
//! Producers append, the turn loop consumes the head. Once closed (the
//! activation has stopped) further enqueues fail with [`QuarkError::ActorGone`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::error::{QuarkError, Result};
use crate::identity::ActorIdentity;
use crate::message::Envelope;

/// The producer-facing half of a mailbox.
#[derive(Clone)]
pub struct MailboxSender {
    identity: ActorIdentity,
    tx: mpsc::Sender<Envelope>,
    closed: Arc<AtomicBool>,
}

impl MailboxSender {
    /// Enqueues `envelope`. Fails with `Overloaded` once the soft bound is
    /// exceeded, or `ActorGone` once the mailbox has been closed.
    pub fn try_enqueue(&self, envelope: Envelope) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(QuarkError::ActorGone {
                identity: self.identity.clone(),
            });
        }

        self.tx.try_send(envelope).map_err(|err| match err {
            mpsc::error::TrySendError::Full(_) => QuarkError::Overloaded {
                identity: self.identity.clone(),
            },
            mpsc::error::TrySendError::Closed(_) => QuarkError::ActorGone {
                identity: self.identity.clone(),
            },
        })
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Closes the mailbox from the producer side. Already-queued envelopes
    /// are still delivered to the turn loop; further enqueues fail.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }
}

/// The consumer-facing half, owned by the turn loop.
pub struct Mailbox {
    identity: ActorIdentity,
    rx: mpsc::Receiver<Envelope>,
    closed: Arc<AtomicBool>,
}

impl Mailbox {
    /// Awaits the next envelope. Once closed, drains whatever is already
    /// queued without blocking and then returns `None` — quiescing rather
    /// than abandoning in-flight work.
    pub async fn recv(&mut self) -> Option<Envelope> {
        if self.closed.load(Ordering::Acquire) {
            return self.rx.try_recv().ok();
        }
        self.rx.recv().await
    }

    /// Closes the mailbox: no further enqueues succeed. In-flight envelopes
    /// already queued remain available to `recv` until drained.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    pub fn identity(&self) -> &ActorIdentity {
        &self.identity
    }
}

/// Creates a mailbox pair with the given soft capacity bound.
pub fn mailbox(identity: ActorIdentity, soft_bound: usize) -> (MailboxSender, Mailbox) {
    let (tx, rx) = mpsc::channel(soft_bound.max(1));
    let closed = Arc::new(AtomicBool::new(false));

    let sender = MailboxSender {
        identity: identity.clone(),
        tx,
        closed: closed.clone(),
    };
    let mailbox = Mailbox {
        identity,
        rx,
        closed,
    };

    (sender, mailbox)
}
