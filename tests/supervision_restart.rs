//! A turn that fails is restarted by default. The fresh instance reloads its
//! state from the `StateStore` rather than resetting to a blank default.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use quark::actor::context::Invoker;
use quark::directory::ActorFactory;
use quark::error::{QuarkError, Result};
use quark::prelude::*;
use serde_json::json;

struct Flaky {
    activation_count: Arc<AtomicUsize>,
    counter: u32,
    version: i64,
}

#[async_trait]
impl Actor for Flaky {
    async fn on_activate(&mut self, _ctx: &ActorContext) -> Result<()> {
        self.activation_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn handle_envelope(&mut self, _ctx: &ActorContext, method: &str, _args_blob: &[u8]) -> Result<Vec<u8>> {
        match method {
            "bump" => {
                self.counter += 1;
                Ok(vec![self.counter as u8])
            }
            "blow_up" => Err(QuarkError::DeadlineExceeded),
            _ => unreachable!("test actor only handles bump/blow_up"),
        }
    }

    fn persisted_state(&self) -> Option<(serde_json::Value, i64)> {
        Some((json!({ "counter": self.counter }), self.version))
    }

    fn restore_state(&mut self, loaded: StateWithVersion) {
        self.counter = loaded.state["counter"].as_u64().unwrap_or(0) as u32;
        self.version = loaded.version;
    }
}

struct FlakyFactory {
    activation_count: Arc<AtomicUsize>,
}

impl ActorFactory for FlakyFactory {
    fn create(&self) -> Box<dyn Actor> {
        Box::new(Flaky {
            activation_count: self.activation_count.clone(),
            counter: 0,
            version: 0,
        })
    }
}

#[tokio::test]
async fn failed_turn_restarts_and_reloads_persisted_state() {
    let store: Arc<dyn StateStore> = Arc::new(quark::testkit::InMemoryStateStore::new());
    let mut config = Config::default();
    config.serverless.enabled = false;
    let runtime = Runtime::builder(config).with_state_store(store.clone()).start().await;

    let activation_count = Arc::new(AtomicUsize::new(0));
    runtime.register_factory(
        "Flaky",
        Arc::new(FlakyFactory {
            activation_count: activation_count.clone(),
        }),
    );

    let identity = ActorIdentity::new("Flaky", "1");

    let reply = runtime.directory.invoke(identity.clone(), "bump", vec![]).await.unwrap();
    assert_eq!(reply, vec![1]);
    let reply = runtime.directory.invoke(identity.clone(), "bump", vec![]).await.unwrap();
    assert_eq!(reply, vec![2]);
    assert_eq!(activation_count.load(Ordering::SeqCst), 1);

    // Nothing has been saved to the store yet: the in-memory bumps above
    // never went through `on_deactivate`/an explicit save.
    store.save_with_version(&identity, json!({ "counter": 2 }), 0).await.unwrap();

    let err = runtime.directory.invoke(identity.clone(), "blow_up", vec![]).await.unwrap_err();
    assert!(matches!(err, QuarkError::DeadlineExceeded));

    // The restart reactivates before the next call is accepted, and the
    // fresh instance reloads `counter` from storage instead of starting
    // over at zero.
    assert_eq!(activation_count.load(Ordering::SeqCst), 2);
    let reply = runtime.directory.invoke(identity, "bump", vec![]).await.unwrap();
    assert_eq!(reply, vec![3]);

    runtime.shutdown().await;
}
