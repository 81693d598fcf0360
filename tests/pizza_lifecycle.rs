//! End-to-end: an order actor's status transitions are observed by a
//! subscriber in send order, and its final state reflects the last update.

use std::sync::Arc;

use async_trait::async_trait;
use quark::actor::context::Invoker;
use quark::directory::ActorFactory;
use quark::error::Result;
use quark::prelude::*;
use quark::testkit::{probe, Probe, ProbeReceiver};
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
enum OrderStatus {
    Ordered,
    Baking,
    Delivered,
}

struct PizzaActor {
    status: Option<OrderStatus>,
    events: Probe<OrderStatus>,
}

#[async_trait]
impl Actor for PizzaActor {
    async fn handle_envelope(&mut self, _ctx: &ActorContext, method: &str, args_blob: &[u8]) -> Result<Vec<u8>> {
        match method {
            "CreateOrder" => {
                self.status = Some(OrderStatus::Ordered);
                self.events.record(OrderStatus::Ordered);
                Ok(vec![])
            }
            "UpdateStatus" => {
                let status: OrderStatus = serde_json::from_slice(args_blob).unwrap();
                self.status = Some(status);
                self.events.record(status);
                Ok(vec![])
            }
            "GetOrder" => Ok(serde_json::to_vec(&json!({ "status": self.status })).unwrap()),
            _ => unreachable!("test actor only handles the three methods above"),
        }
    }
}

struct PizzaFactory {
    events: Probe<OrderStatus>,
}

impl ActorFactory for PizzaFactory {
    fn create(&self) -> Box<dyn Actor> {
        Box::new(PizzaActor {
            status: None,
            events: self.events.clone(),
        })
    }
}

#[tokio::test]
async fn pizza_order_lifecycle_emits_events_in_send_order() {
    let mut config = Config::default();
    config.serverless.enabled = false;
    let runtime = Runtime::start(config).await;

    let (events, receiver): (Probe<OrderStatus>, ProbeReceiver<OrderStatus>) = probe();
    runtime.register_factory("Pizza", Arc::new(PizzaFactory { events }));

    let pizza = ActorIdentity::new("Pizza", "p-001");

    runtime
        .directory
        .invoke(pizza.clone(), "CreateOrder", serde_json::to_vec(&json!(["c-123", "Pepperoni"])).unwrap())
        .await
        .unwrap();
    runtime
        .directory
        .invoke(pizza.clone(), "UpdateStatus", serde_json::to_vec(&OrderStatus::Baking).unwrap())
        .await
        .unwrap();
    runtime
        .directory
        .invoke(pizza.clone(), "UpdateStatus", serde_json::to_vec(&OrderStatus::Delivered).unwrap())
        .await
        .unwrap();

    assert_eq!(
        receiver.drain(),
        vec![OrderStatus::Ordered, OrderStatus::Baking, OrderStatus::Delivered]
    );

    let reply = runtime.directory.invoke(pizza, "GetOrder", vec![]).await.unwrap();
    let value: serde_json::Value = serde_json::from_slice(&reply).unwrap();
    assert_eq!(value["status"], json!("Delivered"));

    runtime.shutdown().await;
}
