//! What an actor can see and do during a turn: its own identity, timers,
//! reminders, a cooperative cancellation signal, and a way to call other
//! actors without knowing whether they are local or remote.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{QuarkError, Result};
use crate::identity::ActorIdentity;
use crate::mailbox::CancellationToken;
use crate::persistence::StateStore;
use crate::reminders::ReminderHandle;
use crate::timers::TimerHandle;

/// Implemented by the directory: routes an invocation to an activation,
/// activating it on demand if it is not already resident. An actor's
/// `ActorContext` is handed one of these so it can call siblings without
/// depending on `crate::directory` directly.
#[async_trait]
pub trait Invoker: Send + Sync {
    async fn invoke(&self, target: ActorIdentity, method: &str, args_blob: Vec<u8>) -> Result<Vec<u8>>;
}

/// Handed to an actor for the duration of one turn (`on_activate`,
/// `handle_envelope`, `on_timer`, `on_reminder`, `on_deactivate`).
#[derive(Clone)]
pub struct ActorContext {
    identity: ActorIdentity,
    timers: TimerHandle,
    reminders: ReminderHandle,
    cancel: CancellationToken,
    invoker: Arc<dyn Invoker>,
    state_store: Arc<dyn StateStore>,
}

impl ActorContext {
    pub fn new(
        identity: ActorIdentity,
        timers: TimerHandle,
        reminders: ReminderHandle,
        cancel: CancellationToken,
        invoker: Arc<dyn Invoker>,
        state_store: Arc<dyn StateStore>,
    ) -> Self {
        ActorContext {
            identity,
            timers,
            reminders,
            cancel,
            invoker,
            state_store,
        }
    }

    pub fn identity(&self) -> &ActorIdentity {
        &self.identity
    }

    pub fn timers(&self) -> &TimerHandle {
        &self.timers
    }

    pub fn reminders(&self) -> &ReminderHandle {
        &self.reminders
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn state_store(&self) -> &Arc<dyn StateStore> {
        &self.state_store
    }

    /// Calls another actor by identity, activating it if it is not resident.
    /// Refuses with `Cancelled` once the activation's root token has fired.
    pub async fn call(&self, target: ActorIdentity, method: &str, args_blob: Vec<u8>) -> Result<Vec<u8>> {
        if self.cancel.is_cancelled() {
            return Err(QuarkError::Cancelled);
        }
        self.invoker.invoke(target, method, args_blob).await
    }
}
