//! `Runtime` composes the directory, reminder sweeper and serverless
//! controller into one silo process, mirroring the teacher's system
//! init/shutdown ordering: timers and storage first, then the directory
//! that depends on them, then the background services that depend on the
//! directory.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::info;

use crate::actor::context::Invoker;
use crate::config::Config;
use crate::directory::{ActivationDirectory, ActorFactory};
use crate::membership::{ClusterMembership, InMemoryMembership, SiloId, SiloInfo};
use crate::persistence::{InMemoryStateStore, StateStore};
use crate::reminders::{InMemoryReminderTable, ReminderService, ReminderTable};
use crate::serverless::ServerlessController;

/// One running silo: an activation directory plus its background services.
pub struct Runtime {
    pub directory: Arc<ActivationDirectory>,
    pub membership: Arc<dyn ClusterMembership>,
    config: Config,
    background: Vec<JoinHandle<()>>,
}

/// Construction knobs for [`Runtime::start`]; defaults to in-memory
/// reference implementations suitable for tests and single-process examples.
pub struct RuntimeBuilder {
    config: Config,
    state_store: Arc<dyn StateStore>,
    reminder_table: Arc<dyn ReminderTable>,
    membership: Arc<dyn ClusterMembership>,
}

impl RuntimeBuilder {
    pub fn new(config: Config) -> Self {
        RuntimeBuilder {
            config,
            state_store: Arc::new(InMemoryStateStore::new()),
            reminder_table: Arc::new(InMemoryReminderTable::new()),
            membership: Arc::new(InMemoryMembership::new()),
        }
    }

    pub fn with_state_store(mut self, store: Arc<dyn StateStore>) -> Self {
        self.state_store = store;
        self
    }

    pub fn with_reminder_table(mut self, table: Arc<dyn ReminderTable>) -> Self {
        self.reminder_table = table;
        self
    }

    pub fn with_membership(mut self, membership: Arc<dyn ClusterMembership>) -> Self {
        self.membership = membership;
        self
    }

    pub async fn start(self) -> Runtime {
        let silo_id = SiloId::new(self.config.silo_id.clone());
        self.membership
            .join(SiloInfo {
                silo_id: silo_id.clone(),
                address: "127.0.0.1".into(),
                port: 0,
            })
            .await
            .ok();

        let directory = ActivationDirectory::new(
            self.state_store.clone(),
            self.reminder_table.clone(),
            self.config.mailbox.soft_bound,
            self.config.silo_id.clone(),
            self.config.supervision.clone(),
        );

        let mut background = Vec::new();

        if self.config.serverless.enabled {
            let controller = ServerlessController::new(directory.clone(), self.config.serverless.clone());
            background.push(tokio::spawn(controller.run()));
        }

        let reminder_service = ReminderService::new(
            silo_id,
            self.reminder_table.clone(),
            self.membership.clone(),
            self.config.reminders.tick_interval(),
        );
        let directory_for_reminders = directory.clone();
        background.push(tokio::spawn(async move {
            reminder_service
                .run(Arc::new(move |reminder| {
                    let directory = directory_for_reminders.clone();
                    tokio::spawn(async move {
                        let _ = directory
                            .deliver_reminder(reminder.actor.clone(), reminder.name.clone(), reminder.data.clone())
                            .await;
                    });
                }))
                .await;
        }));

        info!(silo_id = %self.config.silo_id, "runtime started");

        Runtime {
            directory,
            membership: self.membership,
            config: self.config,
            background,
        }
    }
}

impl Runtime {
    pub fn builder(config: Config) -> RuntimeBuilder {
        RuntimeBuilder::new(config)
    }

    pub async fn start(config: Config) -> Self {
        RuntimeBuilder::new(config).start().await
    }

    pub fn register_factory(&self, type_name: impl Into<String>, factory: Arc<dyn ActorFactory>) {
        self.directory.register_factory(type_name, factory);
    }

    /// Stops background services. Resident activations are left to quiesce
    /// on their own via the serverless controller, rather than force-stopped
    /// here, matching the "drain, don't abandon" posture used throughout.
    pub async fn shutdown(mut self) {
        for handle in self.background.drain(..) {
            handle.abort();
        }
        self.membership
            .leave(&SiloId::new(self.config.silo_id.clone()))
            .await
            .ok();
        info!(silo_id = %self.config.silo_id, "runtime stopped");
    }
}
