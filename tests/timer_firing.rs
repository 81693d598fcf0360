//! A timer registered from `on_activate` actually reaches `Actor::on_timer`
//! through a synthesized envelope on the activation's own mailbox, rather
//! than firing into the void.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use quark::directory::ActorFactory;
use quark::error::Result;
use quark::prelude::*;
use quark::testkit::{probe, Probe, ProbeReceiver};

struct Alarm {
    fired: Probe<String>,
}

#[async_trait]
impl Actor for Alarm {
    async fn on_activate(&mut self, ctx: &ActorContext) -> Result<()> {
        ctx.timers().schedule_once("wake", Duration::from_millis(50))
    }

    async fn handle_envelope(&mut self, _ctx: &ActorContext, _method: &str, _args_blob: &[u8]) -> Result<Vec<u8>> {
        Ok(vec![])
    }

    async fn on_timer(&mut self, _ctx: &ActorContext, name: &str) -> Result<()> {
        self.fired.record(name.to_string());
        Ok(())
    }
}

struct AlarmFactory {
    fired: Probe<String>,
}

impl ActorFactory for AlarmFactory {
    fn create(&self) -> Box<dyn Actor> {
        Box::new(Alarm { fired: self.fired.clone() })
    }
}

#[tokio::test]
async fn timer_fires_into_on_timer() {
    let mut config = Config::default();
    config.serverless.enabled = false;
    let runtime = Runtime::start(config).await;

    let (fired, receiver): (Probe<String>, ProbeReceiver<String>) = probe();
    runtime.register_factory("Alarm", Arc::new(AlarmFactory { fired }));

    let identity = ActorIdentity::new("Alarm", "1");
    runtime.directory.invoke(identity, "noop", vec![]).await.unwrap();

    let name = tokio::task::spawn_blocking(move || receiver.recv_timeout(Duration::from_secs(2)))
        .await
        .unwrap();
    assert_eq!(name, Some("wake".to_string()));

    runtime.shutdown().await;
}
