//! The activation directory: the sharded, concurrent map from actor
//! identity to resident activation, with on-demand activation and
//! quiesce-on-deactivate.
//!
//! Backed by `dashmap` for lock-free reads on the hot path, the way the
//! rest of the ecosystem builds concurrent routing tables; a per-identity
//! activation lock only guards the (rare) activate-on-miss path so two
//! concurrent callers targeting the same identity can't race into creating
//! two activations.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::actor::context::Invoker;
use crate::actor::{Actor, ActorContext};
use crate::config::SupervisionConfig;
use crate::error::{QuarkError, Result};
use crate::identity::{ActorIdentity, MessageId, MessageIdGenerator};
use crate::mailbox::{mailbox, CancellationToken, Dispatch, MailboxSender, Reentrancy};
use crate::message::{Envelope, EnvelopeKind};
use crate::persistence::StateStore;
use crate::reminders::{ReminderHandle, ReminderTable};
use crate::supervision::{RestartBackoff, SupervisionDirective};
use crate::timers::{TimerHandle, TimerSet};

/// Produces a fresh actor instance for one actor type. A directory holds one
/// factory per type name, registered at startup.
pub trait ActorFactory: Send + Sync {
    fn create(&self) -> Box<dyn Actor>;
}

impl<F> ActorFactory for F
where
    F: Fn() -> Box<dyn Actor> + Send + Sync,
{
    fn create(&self) -> Box<dyn Actor> {
        (self)()
    }
}

fn turn_to_state(state: crate::actor::TurnState) -> u8 {
    use crate::actor::TurnState::*;
    match state {
        Idle => 0,
        Running => 1,
        Suspending => 2,
        Stopped => 3,
    }
}

/// Bookkeeping the directory keeps for one resident activation, independent
/// of the actor instance itself (which lives inside the dispatcher).
struct ActivationEntry {
    sender: MailboxSender,
    turn_state: AtomicU8,
    last_activity: std::sync::Mutex<Instant>,
    turn_handle: JoinHandle<()>,
    #[allow(dead_code)] // kept so the activation's timers outlive dispatch; cancelled on drop
    timers: TimerHandle,
    actor: Arc<Mutex<Box<dyn Actor>>>,
    context: ActorContext,
}

impl ActivationEntry {
    fn touch(&self) {
        *self.last_activity.lock().expect("poisoned") = Instant::now();
    }

    fn idle_for(&self) -> Duration {
        self.last_activity.lock().expect("poisoned").elapsed()
    }
}

struct ActivationDispatcher {
    identity: ActorIdentity,
    actor: Arc<Mutex<Box<dyn Actor>>>,
    factory: Arc<dyn ActorFactory>,
    context: ActorContext,
    pending: Arc<DashMap<MessageId, oneshot::Sender<Result<Vec<u8>>>>>,
    backoff: Arc<Mutex<RestartBackoff>>,
    state_store: Arc<dyn StateStore>,
}

#[async_trait]
impl Dispatch for ActivationDispatcher {
    async fn dispatch(&self, envelope: Envelope, cancel: CancellationToken) -> Result<Option<Envelope>> {
        if cancel.is_cancelled() {
            return Err(QuarkError::Cancelled);
        }

        let mut actor = self.actor.lock().await;
        let outcome = match envelope.kind {
            EnvelopeKind::Call => {
                actor
                    .handle_envelope(&self.context, &envelope.method, &envelope.args_blob)
                    .await
            }
            EnvelopeKind::TimerFired => actor.on_timer(&self.context, &envelope.method).await.map(|_| Vec::new()),
            EnvelopeKind::ReminderFired => actor
                .on_reminder(&self.context, &envelope.method, &envelope.args_blob)
                .await
                .map(|_| Vec::new()),
        };

        let outcome = match outcome {
            Ok(bytes) => Ok(bytes),
            Err(err) => {
                let directive = actor.supervision_directive(&err);
                let directive = self.backoff.lock().await.apply(&self.identity, directive, Utc::now());
                warn!(identity = %self.identity, error = %err, directive = ?directive, "turn failed");

                if directive == SupervisionDirective::Restart {
                    debug!(identity = %self.identity, "restarting activation after failure");
                    let _ = actor.on_deactivate(&self.context).await;
                    let mut fresh = self.factory.create();
                    match self.state_store.load_with_version(&self.identity).await {
                        Ok(Some(loaded)) => fresh.restore_state(loaded),
                        Ok(None) => {}
                        Err(load_err) => {
                            warn!(identity = %self.identity, error = %load_err, "failed to reload state on restart")
                        }
                    }
                    if let Err(activate_err) = fresh.on_activate(&self.context).await {
                        warn!(identity = %self.identity, error = %activate_err, "reactivation after restart failed");
                    }
                    *actor = fresh;
                }

                Err(err)
            }
        };
        drop(actor);

        if let Some((_, tx)) = self.pending.remove(&envelope.message_id) {
            let _ = tx.send(outcome);
            return Ok(None);
        }
        outcome.map(|_| None)
    }
}

/// Resolves a target identity to a resident activation, activating it first
/// if necessary, and routes envelopes into its mailbox.
pub struct ActivationDirectory {
    self_ref: Weak<ActivationDirectory>,
    factories: DashMap<String, Arc<dyn ActorFactory>>,
    activations: DashMap<ActorIdentity, Arc<ActivationEntry>>,
    activation_locks: DashMap<ActorIdentity, Arc<Mutex<()>>>,
    pending: Arc<DashMap<MessageId, oneshot::Sender<Result<Vec<u8>>>>>,
    message_ids: MessageIdGenerator,
    state_store: Arc<dyn StateStore>,
    reminder_table: Arc<dyn ReminderTable>,
    mailbox_soft_bound: usize,
    call_timeout: Duration,
    backoff: Arc<Mutex<RestartBackoff>>,
}

impl ActivationDirectory {
    pub fn new(
        state_store: Arc<dyn StateStore>,
        reminder_table: Arc<dyn ReminderTable>,
        mailbox_soft_bound: usize,
        silo_prefix: impl Into<String>,
        supervision: SupervisionConfig,
    ) -> Arc<Self> {
        Arc::new_cyclic(|weak| ActivationDirectory {
            self_ref: weak.clone(),
            factories: DashMap::new(),
            activations: DashMap::new(),
            activation_locks: DashMap::new(),
            pending: Arc::new(DashMap::new()),
            message_ids: MessageIdGenerator::with_prefix(silo_prefix),
            state_store,
            reminder_table,
            mailbox_soft_bound,
            call_timeout: Duration::from_secs(30),
            backoff: Arc::new(Mutex::new(RestartBackoff::new(supervision.restart_threshold, supervision.restart_window()))),
        })
    }

    pub fn register_factory(&self, type_name: impl Into<String>, factory: Arc<dyn ActorFactory>) {
        self.factories.insert(type_name.into(), factory);
    }

    pub fn is_resident(&self, identity: &ActorIdentity) -> bool {
        self.activations.contains_key(identity)
    }

    pub fn resident_count(&self) -> usize {
        self.activations.len()
    }

    /// Resident identities that have been idle for at least `min_idle`,
    /// consulted by the serverless controller when sweeping for eviction.
    pub fn idle_candidates(&self, min_idle: Duration) -> Vec<ActorIdentity> {
        self.activations
            .iter()
            .filter(|e| e.value().idle_for() >= min_idle)
            .map(|e| e.key().clone())
            .collect()
    }

    fn lock_for(&self, identity: &ActorIdentity) -> Arc<Mutex<()>> {
        self.activation_locks
            .entry(identity.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Returns the resident activation for `identity`, activating it first
    /// (constructing via the registered factory and running `on_activate`)
    /// if it is not already present. Concurrent callers targeting the same
    /// identity serialize on a per-identity lock so only one activation is
    /// ever created.
    async fn get_or_activate(&self, identity: ActorIdentity) -> Result<Arc<ActivationEntry>> {
        if let Some(entry) = self.activations.get(&identity) {
            entry.touch();
            return Ok(entry.clone());
        }

        let lock = self.lock_for(&identity);
        let _guard = lock.lock().await;

        if let Some(entry) = self.activations.get(&identity) {
            entry.touch();
            return Ok(entry.clone());
        }

        let factory = self
            .factories
            .get(&identity.type_name)
            .ok_or_else(|| QuarkError::NoCapacity {
                actor_type: identity.type_name.clone(),
            })?
            .clone();

        debug!(identity = %identity, "activating");

        let mut actor = factory.create();
        let (sender, mbox) = mailbox(identity.clone(), self.mailbox_soft_bound);
        let (timer_handle, timer_set) = TimerSet::new(identity.clone());
        let reminder_handle = ReminderHandle::new(identity.clone(), self.reminder_table.clone());
        let cancel = CancellationToken::new();
        let invoker: Arc<dyn Invoker> = self
            .self_ref
            .upgrade()
            .expect("directory outlives its own activations");
        let context = ActorContext::new(
            identity.clone(),
            timer_handle.clone(),
            reminder_handle,
            cancel.clone(),
            invoker,
            self.state_store.clone(),
        );

        match self.state_store.load_with_version(&identity).await {
            Ok(Some(loaded)) => actor.restore_state(loaded),
            Ok(None) => {}
            Err(err) => warn!(identity = %identity, error = %err, "failed to load persisted state on activation"),
        }

        actor.on_activate(&context).await?;
        let reentrancy = if actor.reentrant() { Reentrancy::On } else { Reentrancy::Off };

        let actor = Arc::new(Mutex::new(actor));
        let dispatcher = Arc::new(ActivationDispatcher {
            identity: identity.clone(),
            actor: actor.clone(),
            factory,
            context: context.clone(),
            pending: self.pending.clone(),
            backoff: self.backoff.clone(),
            state_store: self.state_store.clone(),
        });

        let turn_handle = crate::mailbox::spawn_turn_loop(mbox, dispatcher, reentrancy, cancel);

        let timer_identity = identity.clone();
        let timer_sender = sender.clone();
        tokio::spawn(async move {
            crate::timers::run_timer_loop(timer_set, Duration::from_millis(100), move |name| {
                let envelope = Envelope::timer_fired(
                    timer_identity.clone(),
                    name,
                    MessageId::synthetic(format!("timer-{timer_identity}-{name}")),
                );
                if let Err(err) = timer_sender.try_enqueue(envelope) {
                    debug!(identity = %timer_identity, timer = %name, error = %err, "timer delivery dropped");
                }
            })
            .await;
        });

        let entry = Arc::new(ActivationEntry {
            sender,
            turn_state: AtomicU8::new(turn_to_state(crate::actor::TurnState::Running)),
            last_activity: std::sync::Mutex::new(Instant::now()),
            turn_handle,
            timers: timer_handle,
            actor,
            context,
        });

        self.activations.insert(identity.clone(), entry.clone());
        self.activation_locks.remove(&identity);

        Ok(entry)
    }

    /// Quiesces and evicts one activation: stops accepting new envelopes,
    /// lets in-flight and already-queued ones drain, then runs
    /// `on_deactivate` and removes the activation record.
    pub async fn deactivate(&self, identity: &ActorIdentity) -> Result<()> {
        let Some((_, entry)) = self.activations.remove(identity) else {
            return Ok(());
        };

        entry
            .turn_state
            .store(turn_to_state(crate::actor::TurnState::Suspending), Ordering::Release);
        entry.sender.close();
        entry.context.cancellation().cancel();

        let _ = tokio::time::timeout(Duration::from_secs(10), wait_for(&entry.turn_handle)).await;

        let mut actor = entry.actor.lock().await;
        actor.on_deactivate(&entry.context).await?;
        if let Some((state, version)) = actor.persisted_state() {
            if let Err(err) = self.state_store.save_with_version(identity, state, version).await {
                warn!(identity = %identity, error = %err, "failed to persist state on deactivation");
            }
        }
        drop(actor);
        entry
            .turn_state
            .store(turn_to_state(crate::actor::TurnState::Stopped), Ordering::Release);

        info!(identity = %identity, "deactivated");
        Ok(())
    }

    /// Delivers a fired reminder directly to `Actor::on_reminder`, activating
    /// the target if it is not resident. Fire-and-forget: no reply is
    /// awaited and the pending/oneshot map is never touched.
    pub async fn deliver_reminder(&self, actor: ActorIdentity, name: impl Into<String>, data: Vec<u8>) -> Result<()> {
        let entry = self.get_or_activate(actor.clone()).await?;
        let name = name.into();
        let message_id = MessageId::synthetic(format!("reminder-{actor}-{name}"));
        let envelope = Envelope::reminder_fired(actor, name, data, message_id);
        entry.sender.try_enqueue(envelope)
    }
}

async fn wait_for(handle: &JoinHandle<()>) {
    while !handle.is_finished() {
        tokio::task::yield_now().await;
    }
}

#[async_trait]
impl Invoker for ActivationDirectory {
    async fn invoke(&self, target: ActorIdentity, method: &str, args_blob: Vec<u8>) -> Result<Vec<u8>> {
        let entry = self.get_or_activate(target.clone()).await?;

        let message_id = self.message_ids.next();
        let (tx, rx) = oneshot::channel();
        self.pending.insert(message_id.clone(), tx);

        let envelope = Envelope::new(target.clone(), method, args_blob, message_id.clone());
        if let Err(err) = entry.sender.try_enqueue(envelope) {
            self.pending.remove(&message_id);
            return Err(err);
        }

        match tokio::time::timeout(self.call_timeout, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(QuarkError::ActorGone { identity: target }),
            Err(_) => Err(QuarkError::DeadlineExceeded),
        }
    }
}
