//! Concurrent callers targeting the same identity observe turns run one at
//! a time, in the order they were enqueued, against a single activation.

use std::sync::Arc;

use async_trait::async_trait;
use quark::actor::context::Invoker;
use quark::directory::ActorFactory;
use quark::error::Result;
use quark::prelude::*;
use quark::testkit::{probe, Probe, ProbeReceiver};

struct Counter {
    value: u32,
    events: Probe<u32>,
}

#[async_trait]
impl Actor for Counter {
    async fn handle_envelope(&mut self, _ctx: &ActorContext, _method: &str, _args_blob: &[u8]) -> Result<Vec<u8>> {
        // Any interleaving here would show up as a non-monotonic or
        // duplicated sequence in the probe.
        let seen = self.value;
        tokio::task::yield_now().await;
        self.value = seen + 1;
        self.events.record(self.value);
        Ok(vec![self.value as u8])
    }
}

struct CounterFactory {
    events: Probe<u32>,
}

impl ActorFactory for CounterFactory {
    fn create(&self) -> Box<dyn Actor> {
        Box::new(Counter { value: 0, events: self.events.clone() })
    }
}

#[tokio::test]
async fn concurrent_callers_observe_strictly_serialized_turns() {
    let mut config = Config::default();
    config.serverless.enabled = false;
    let runtime = Runtime::start(config).await;

    let (events, receiver): (Probe<u32>, ProbeReceiver<u32>) = probe();
    runtime.register_factory("Counter", Arc::new(CounterFactory { events }));

    let identity = ActorIdentity::new("Counter", "1");

    let mut calls = Vec::new();
    for _ in 0..20 {
        let directory = runtime.directory.clone();
        let identity = identity.clone();
        calls.push(tokio::spawn(async move {
            directory.invoke(identity, "bump", vec![]).await.unwrap()
        }));
    }

    for call in calls {
        call.await.unwrap();
    }

    let mut seen = receiver.drain();
    seen.sort_unstable();
    let expected: Vec<u32> = (1..=20).collect();
    assert_eq!(seen, expected, "each turn must observe a unique, monotonically assigned value");
    assert_eq!(runtime.directory.resident_count(), 1, "only one activation for a single identity");

    runtime.shutdown().await;
}
