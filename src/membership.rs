//! Cluster roster: which silos are alive, used to derive reminder ownership
//! and placement candidates.
//!
//! The runtime treats membership as a linearizable external fact — silos
//! joining or leaving is not something this crate arbitrates, only observes.
//! `InMemoryMembership` (used by `testkit` and single-process examples) is a
//! reference implementation that simply never changes.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SiloId(String);

impl SiloId {
    pub fn new(id: impl Into<String>) -> Self {
        SiloId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SiloId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SiloInfo {
    pub silo_id: SiloId,
    pub address: String,
    pub port: u16,
}

/// A roster of live silos, consulted by reminder ownership hashing and by
/// placement when choosing a target silo for a new activation.
#[async_trait]
pub trait ClusterMembership: Send + Sync {
    async fn roster(&self) -> Result<Vec<SiloInfo>>;
    async fn join(&self, info: SiloInfo) -> Result<()>;
    async fn leave(&self, silo_id: &SiloId) -> Result<()>;
}

/// A single-process reference roster backed by a concurrent map, for tests
/// and examples that don't run a real gossip/consensus layer.
#[derive(Default, Clone)]
pub struct InMemoryMembership {
    silos: Arc<DashMap<SiloId, SiloInfo>>,
}

impl InMemoryMembership {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_silos(silos: impl IntoIterator<Item = SiloInfo>) -> Self {
        let map = DashMap::new();
        for info in silos {
            map.insert(info.silo_id.clone(), info);
        }
        InMemoryMembership { silos: Arc::new(map) }
    }
}

#[async_trait]
impl ClusterMembership for InMemoryMembership {
    async fn roster(&self) -> Result<Vec<SiloInfo>> {
        Ok(self.silos.iter().map(|e| e.value().clone()).collect())
    }

    async fn join(&self, info: SiloInfo) -> Result<()> {
        self.silos.insert(info.silo_id.clone(), info);
        Ok(())
    }

    async fn leave(&self, silo_id: &SiloId) -> Result<()> {
        self.silos.remove(silo_id);
        Ok(())
    }
}

/// Snapshot of silo ids alone, the shape reminder ownership hashing needs.
pub async fn silo_ids(membership: &dyn ClusterMembership) -> Result<Vec<SiloId>> {
    Ok(membership.roster().await?.into_iter().map(|s| s.silo_id).collect())
}

/// Helper retained for call sites that already hold a roster snapshot and
/// want it keyed by id.
pub fn index_by_id(roster: Vec<SiloInfo>) -> HashMap<SiloId, SiloInfo> {
    roster.into_iter().map(|info| (info.silo_id.clone(), info)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn join_and_leave_update_roster() {
        let membership = InMemoryMembership::new();
        membership
            .join(SiloInfo {
                silo_id: SiloId::new("silo-1"),
                address: "127.0.0.1".into(),
                port: 7000,
            })
            .await
            .unwrap();
        assert_eq!(membership.roster().await.unwrap().len(), 1);

        membership.leave(&SiloId::new("silo-1")).await.unwrap();
        assert!(membership.roster().await.unwrap().is_empty());
    }
}
