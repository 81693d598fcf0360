//! Optimistic-concurrency state persistence.
//!
//! An activation's state round-trips through `serde_json`; the store itself
//! is oblivious to the shape of `state` and only enforces the version check.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::{QuarkError, Result};
use crate::identity::ActorIdentity;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StateWithVersion {
    pub state: serde_json::Value,
    pub version: i64,
}

/// Durable state storage keyed by actor identity, with optimistic
/// concurrency control: `save_with_version` fails with
/// `ConcurrencyConflict` if `expected_version` does not match what's stored.
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn load_with_version(&self, actor: &ActorIdentity) -> Result<Option<StateWithVersion>>;

    /// Saves `state`, asserting the currently stored version equals
    /// `expected_version` (0 means "no row yet"). On success the new row's
    /// version is `expected_version + 1`.
    async fn save_with_version(&self, actor: &ActorIdentity, state: serde_json::Value, expected_version: i64) -> Result<i64>;

    async fn delete(&self, actor: &ActorIdentity) -> Result<()>;
}

/// Reference in-memory `StateStore`, for tests and single-process examples.
#[derive(Default, Clone)]
pub struct InMemoryStateStore {
    rows: Arc<Mutex<HashMap<ActorIdentity, StateWithVersion>>>,
}

impl InMemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateStore for InMemoryStateStore {
    async fn load_with_version(&self, actor: &ActorIdentity) -> Result<Option<StateWithVersion>> {
        Ok(self.rows.lock().await.get(actor).cloned())
    }

    async fn save_with_version(&self, actor: &ActorIdentity, state: serde_json::Value, expected_version: i64) -> Result<i64> {
        let mut rows = self.rows.lock().await;
        let actual = rows.get(actor).map(|r| r.version).unwrap_or(0);
        if actual != expected_version {
            return Err(QuarkError::ConcurrencyConflict {
                expected: expected_version,
                actual,
            });
        }
        let new_version = expected_version + 1;
        rows.insert(
            actor.clone(),
            StateWithVersion {
                state,
                version: new_version,
            },
        );
        Ok(new_version)
    }

    async fn delete(&self, actor: &ActorIdentity) -> Result<()> {
        self.rows.lock().await.remove(actor);
        Ok(())
    }
}
