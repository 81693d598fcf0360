//! A due reminder is delivered straight to `Actor::on_reminder`, carrying
//! its payload, rather than being routed through a magic method name.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use quark::directory::ActorFactory;
use quark::error::Result;
use quark::membership::{InMemoryMembership, SiloInfo};
use quark::prelude::*;
use quark::reminders::{FireCallback, InMemoryReminderTable, Reminder, ReminderService, ReminderTable};
use quark::testkit::{probe, Probe, ProbeReceiver};

struct Counter {
    fired: Probe<(String, Vec<u8>)>,
}

#[async_trait]
impl Actor for Counter {
    async fn handle_envelope(&mut self, _ctx: &ActorContext, _method: &str, args_blob: &[u8]) -> Result<Vec<u8>> {
        Ok(args_blob.to_vec())
    }

    async fn on_reminder(&mut self, _ctx: &ActorContext, name: &str, data: &[u8]) -> Result<()> {
        self.fired.record((name.to_string(), data.to_vec()));
        Ok(())
    }
}

struct CounterFactory {
    fired: Probe<(String, Vec<u8>)>,
}

impl ActorFactory for CounterFactory {
    fn create(&self) -> Box<dyn Actor> {
        Box::new(Counter { fired: self.fired.clone() })
    }
}

#[tokio::test]
async fn due_reminder_delivers_name_and_data_to_on_reminder() {
    let table = Arc::new(InMemoryReminderTable::new());
    let membership = Arc::new(InMemoryMembership::with_silos([SiloInfo {
        silo_id: SiloId::new("silo-1"),
        address: "127.0.0.1".into(),
        port: 0,
    }]));

    let mut config = Config::default();
    config.serverless.enabled = false;
    config.silo_id = "silo-1".into();
    // Keep the host's own background sweep from racing the manual
    // `sweep_once` this test drives below.
    config.reminders.tick_interval_secs = 3600;
    let runtime = Runtime::builder(config)
        .with_reminder_table(table.clone())
        .with_membership(membership.clone())
        .start()
        .await;

    let (fired, receiver): (Probe<(String, Vec<u8>)>, ProbeReceiver<(String, Vec<u8>)>) = probe();
    runtime.register_factory("Counter", Arc::new(CounterFactory { fired }));

    let identity = ActorIdentity::new("Counter", "1");
    table
        .register(Reminder {
            actor: identity.clone(),
            name: "restock".into(),
            due_at: chrono::Utc::now() - chrono::Duration::seconds(1),
            period: None,
            data: vec![7, 7],
        })
        .await
        .unwrap();

    let service = ReminderService::new(SiloId::new("silo-1"), table.clone(), membership, Duration::from_secs(1));
    let directory = runtime.directory.clone();
    service
        .sweep_once(&(Arc::new(move |reminder: Reminder| {
            let directory = directory.clone();
            tokio::spawn(async move {
                directory
                    .deliver_reminder(reminder.actor, reminder.name, reminder.data)
                    .await
                    .unwrap();
            });
        }) as FireCallback))
        .await
        .unwrap();

    let event = tokio::task::spawn_blocking(move || receiver.recv_timeout(Duration::from_secs(2)))
        .await
        .unwrap();
    assert_eq!(event, Some(("restock".to_string(), vec![7, 7])));

    runtime.shutdown().await;
}
