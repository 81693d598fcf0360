//! Durable reminders: unlike timers, reminders survive deactivation and
//! silo restart because they live in an external `ReminderTable`, not in
//! process memory. Each silo sweeps the reminders it currently owns
//! (`hashing::owning_silo`) on a fixed tick and synthesizes an envelope back
//! into the owning actor's mailbox for each one due.

pub mod hashing;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::interval;
use tracing::{debug, warn};

use crate::error::Result;
use crate::identity::ActorIdentity;
use crate::membership::{silo_ids, ClusterMembership, SiloId};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Reminder {
    pub actor: ActorIdentity,
    pub name: String,
    pub due_at: DateTime<Utc>,
    pub period: Option<Duration>,
    /// Opaque payload handed back to `Actor::on_reminder` on firing.
    pub data: Vec<u8>,
}

/// The external, durable store of reminders. Distinct from [`crate::timers`]
/// precisely because it must outlive any single activation or silo process.
#[async_trait]
pub trait ReminderTable: Send + Sync {
    async fn register(&self, reminder: Reminder) -> Result<()>;
    async fn unregister(&self, actor: &ActorIdentity, name: &str) -> Result<()>;
    async fn reminders_for_actor(&self, actor: &ActorIdentity) -> Result<Vec<Reminder>>;
    /// All reminders, cluster-wide, due at or before `now`. The service then
    /// filters to those owned by the current silo before firing them.
    async fn due_reminders(&self, now: DateTime<Utc>) -> Result<Vec<Reminder>>;
    async fn update_fire_time(&self, actor: &ActorIdentity, name: &str, next_due: DateTime<Utc>) -> Result<()>;
}

/// Reference `ReminderTable` backed by an in-memory vector, for tests and
/// single-process examples; not durable across a real process restart.
#[derive(Default, Clone)]
pub struct InMemoryReminderTable {
    inner: Arc<tokio::sync::Mutex<Vec<Reminder>>>,
}

impl InMemoryReminderTable {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReminderTable for InMemoryReminderTable {
    async fn register(&self, reminder: Reminder) -> Result<()> {
        let mut guard = self.inner.lock().await;
        guard.retain(|r| !(r.actor == reminder.actor && r.name == reminder.name));
        guard.push(reminder);
        Ok(())
    }

    async fn unregister(&self, actor: &ActorIdentity, name: &str) -> Result<()> {
        let mut guard = self.inner.lock().await;
        guard.retain(|r| !(&r.actor == actor && r.name == name));
        Ok(())
    }

    async fn reminders_for_actor(&self, actor: &ActorIdentity) -> Result<Vec<Reminder>> {
        let guard = self.inner.lock().await;
        Ok(guard.iter().filter(|r| &r.actor == actor).cloned().collect())
    }

    async fn due_reminders(&self, now: DateTime<Utc>) -> Result<Vec<Reminder>> {
        let guard = self.inner.lock().await;
        Ok(guard.iter().filter(|r| r.due_at <= now).cloned().collect())
    }

    async fn update_fire_time(&self, actor: &ActorIdentity, name: &str, next_due: DateTime<Utc>) -> Result<()> {
        let mut guard = self.inner.lock().await;
        if let Some(r) = guard.iter_mut().find(|r| &r.actor == actor && r.name == name) {
            r.due_at = next_due;
        }
        Ok(())
    }
}

/// Handle an activation uses to manage its own durable reminders.
#[derive(Clone)]
pub struct ReminderHandle {
    actor: ActorIdentity,
    table: Arc<dyn ReminderTable>,
}

impl ReminderHandle {
    pub fn new(actor: ActorIdentity, table: Arc<dyn ReminderTable>) -> Self {
        ReminderHandle { actor, table }
    }

    pub async fn register(
        &self,
        name: impl Into<String>,
        due_at: DateTime<Utc>,
        period: Option<Duration>,
        data: Vec<u8>,
    ) -> Result<()> {
        self.table
            .register(Reminder {
                actor: self.actor.clone(),
                name: name.into(),
                due_at,
                period,
                data,
            })
            .await
    }

    pub async fn unregister(&self, name: &str) -> Result<()> {
        self.table.unregister(&self.actor, name).await
    }

    pub async fn list(&self) -> Result<Vec<Reminder>> {
        self.table.reminders_for_actor(&self.actor).await
    }
}

/// Callback invoked once per due reminder this silo owns. Expected to enqueue
/// an envelope into the target actor's mailbox (activating it if needed).
pub type FireCallback = Arc<dyn Fn(Reminder) + Send + Sync>;

/// Periodically sweeps the `ReminderTable` for reminders owned by
/// `this_silo`, firing each due one and, if it repeats, rescheduling it.
pub struct ReminderService {
    this_silo: SiloId,
    table: Arc<dyn ReminderTable>,
    membership: Arc<dyn ClusterMembership>,
    tick: Duration,
}

impl ReminderService {
    pub fn new(
        this_silo: SiloId,
        table: Arc<dyn ReminderTable>,
        membership: Arc<dyn ClusterMembership>,
        tick: Duration,
    ) -> Self {
        ReminderService {
            this_silo,
            table,
            membership,
            tick,
        }
    }

    /// Runs the sweep loop forever. Intended to be spawned as a background
    /// task by the host.
    pub async fn run(self, on_fire: FireCallback) {
        let mut ticker = interval(self.tick);
        loop {
            ticker.tick().await;
            if let Err(err) = self.sweep_once(&on_fire).await {
                warn!(silo = %self.this_silo, error = %err, "reminder sweep failed");
            }
        }
    }

    /// A single sweep, exposed separately so tests can drive it without a
    /// real tick loop.
    pub async fn sweep_once(&self, on_fire: &FireCallback) -> Result<()> {
        let now = Utc::now();
        let due = self.table.due_reminders(now).await?;
        let roster = silo_ids(self.membership.as_ref()).await?;

        for reminder in due {
            let owner = hashing::owning_silo(&reminder.actor, &roster).cloned();
            if owner.as_ref() != Some(&self.this_silo) {
                continue;
            }

            debug!(actor = %reminder.actor, name = %reminder.name, "reminder due");
            on_fire(reminder.clone());

            match reminder.period {
                Some(period) => {
                    let next_due = reminder.due_at + chrono::Duration::from_std(period).unwrap_or_default();
                    self.table
                        .update_fire_time(&reminder.actor, &reminder.name, next_due)
                        .await?;
                }
                None => {
                    self.table.unregister(&reminder.actor, &reminder.name).await?;
                }
            }
        }
        Ok(())
    }
}
