//! The envelope that carries an invocation or its response through the
//! mailbox and, eventually, the transport.

use std::collections::HashMap;
use std::time::Duration;

use crate::identity::{ActorIdentity, MessageId};

/// Discriminates an ordinary call envelope from a synthetic one the
/// activation's own timer loop or the reminder sweeper schedules.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnvelopeKind {
    Call,
    TimerFired,
    ReminderFired,
}

/// A message carried between a sender and a target actor, or a response
/// correlated back to the original request.
#[derive(Clone, Debug)]
pub struct Envelope {
    pub message_id: MessageId,
    /// Set on a response envelope: the `message_id` of the request.
    pub correlation_id: Option<MessageId>,
    pub sender: Option<ActorIdentity>,
    pub target: ActorIdentity,
    pub method: String,
    pub args_blob: Vec<u8>,
    pub deadline: Option<Duration>,
    pub headers: HashMap<String, String>,
    pub kind: EnvelopeKind,
}

impl Envelope {
    pub fn new(target: ActorIdentity, method: impl Into<String>, args_blob: Vec<u8>, message_id: MessageId) -> Self {
        Envelope {
            message_id,
            correlation_id: None,
            sender: None,
            target,
            method: method.into(),
            args_blob,
            deadline: None,
            headers: HashMap::new(),
            kind: EnvelopeKind::Call,
        }
    }

    /// A synthetic envelope invoking `Actor::on_timer` for the timer named
    /// `name`. Carries no sender; the reply, if any, is discarded.
    pub fn timer_fired(target: ActorIdentity, name: impl Into<String>, message_id: MessageId) -> Self {
        Envelope {
            kind: EnvelopeKind::TimerFired,
            ..Envelope::new(target, name, Vec::new(), message_id)
        }
    }

    /// A synthetic envelope invoking `Actor::on_reminder` for the reminder
    /// named `name`, carrying its durable `data` payload as `args_blob`.
    pub fn reminder_fired(target: ActorIdentity, name: impl Into<String>, data: Vec<u8>, message_id: MessageId) -> Self {
        Envelope {
            kind: EnvelopeKind::ReminderFired,
            ..Envelope::new(target, name, data, message_id)
        }
    }

    pub fn with_sender(mut self, sender: ActorIdentity) -> Self {
        self.sender = Some(sender);
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_correlation(mut self, correlation_id: MessageId) -> Self {
        self.correlation_id = Some(correlation_id);
        self
    }

    /// A synthesized reply envelope addressed back to `self.sender`, carrying
    /// `self.message_id` as the correlation id.
    pub fn reply_to(&self, method: impl Into<String>, args_blob: Vec<u8>, reply_id: MessageId) -> Option<Envelope> {
        let sender = self.sender.clone()?;
        Some(
            Envelope::new(sender, method, args_blob, reply_id)
                .with_correlation(self.message_id.clone()),
        )
    }
}
