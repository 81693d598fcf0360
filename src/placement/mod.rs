//! Chooses which silo a freshly-created activation should live on.
//!
//! Affinity groups let related actor types co-locate (e.g. a session actor
//! and its per-session cache), overriding the configured strategy for the
//! member types; everything else goes through the ordinary strategy with a
//! `NoCapacity` error if no candidate clears the configured threshold.

pub mod resources;
pub mod strategies;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::PlacementConfig;
use crate::error::{QuarkError, Result};
use crate::membership::{ClusterMembership, SiloId};
use crate::placement::resources::{ResourceProvider, ResourceSnapshot};
use crate::placement::strategies::{Candidate, FirstAvailable, LeastMemoryUsed, LeastUtilized, PlacementStrategy, RoundRobin};

/// Per-silo resource probe, keyed so the placement service can gather a
/// snapshot for every live silo before choosing among them.
#[async_trait]
pub trait SiloResourceProbe: Send + Sync {
    async fn snapshot_for(&self, silo_id: &SiloId) -> Result<ResourceSnapshot>;
}

/// Wraps a single local `ResourceProvider` behind the multi-silo probe
/// interface, for single-process examples and tests.
pub struct SingleSiloProbe<P: ResourceProvider> {
    pub silo_id: SiloId,
    pub provider: P,
}

#[async_trait]
impl<P: ResourceProvider + Sync> SiloResourceProbe for SingleSiloProbe<P> {
    async fn snapshot_for(&self, silo_id: &SiloId) -> Result<ResourceSnapshot> {
        if silo_id == &self.silo_id {
            self.provider.snapshot().await
        } else {
            Ok(ResourceSnapshot::default())
        }
    }
}

/// Chooses a target silo for a new activation of `actor_type`.
pub struct PlacementService {
    config: PlacementConfig,
    membership: Arc<dyn ClusterMembership>,
    probe: Arc<dyn SiloResourceProbe>,
    strategy: Box<dyn PlacementStrategy>,
}

impl PlacementService {
    pub fn new(
        config: PlacementConfig,
        membership: Arc<dyn ClusterMembership>,
        probe: Arc<dyn SiloResourceProbe>,
        strategy: Box<dyn PlacementStrategy>,
    ) -> Self {
        PlacementService {
            config,
            membership,
            probe,
            strategy,
        }
    }

    /// Builds the default strategy named by `config.gpu.device_selection_strategy`.
    pub fn strategy_from_config(config: &PlacementConfig) -> Box<dyn PlacementStrategy> {
        use crate::config::DeviceSelectionStrategy as Dss;
        match config.gpu.device_selection_strategy {
            Dss::LeastUtilized => Box::new(LeastUtilized::new(config.numa.node_cpu_threshold)),
            Dss::LeastMemoryUsed => Box::new(LeastMemoryUsed),
            Dss::RoundRobin => Box::new(RoundRobin::new()),
            Dss::FirstAvailable => Box::new(FirstAvailable {
                cpu_threshold: config.numa.node_cpu_threshold,
            }),
        }
    }

    /// Picks a silo for `actor_type`, honoring any affinity group it belongs
    /// to (co-locating with the group's first already-placed member, if the
    /// caller supplies one via `affinity_anchor`).
    pub async fn place(&self, actor_type: &str, affinity_anchor: Option<&SiloId>) -> Result<SiloId> {
        if let Some(anchor) = affinity_anchor {
            if self.is_affinity_grouped(actor_type) {
                return Ok(anchor.clone());
            }
        }

        let roster = self.membership.roster().await?;
        if roster.is_empty() {
            return Err(QuarkError::NoCapacity {
                actor_type: actor_type.to_string(),
            });
        }

        let mut snapshots = HashMap::new();
        for silo in &roster {
            let snapshot = self.probe.snapshot_for(&silo.silo_id).await?;
            snapshots.insert(silo.silo_id.clone(), snapshot);
        }

        let candidates: Vec<Candidate<'_>> = roster
            .iter()
            .map(|s| Candidate {
                silo_id: &s.silo_id,
                snapshot: snapshots.get(&s.silo_id).expect("snapshot collected above"),
            })
            .collect();

        self.strategy.select(&candidates).ok_or_else(|| QuarkError::NoCapacity {
            actor_type: actor_type.to_string(),
        })
    }

    fn is_affinity_grouped(&self, actor_type: &str) -> bool {
        self.config
            .numa
            .affinity_groups
            .values()
            .any(|members| members.iter().any(|m| m == actor_type))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::membership::{InMemoryMembership, SiloInfo};
    use crate::placement::resources::StaticResourceProvider;

    struct FixedProbe(HashMap<String, ResourceSnapshot>);

    #[async_trait]
    impl SiloResourceProbe for FixedProbe {
        async fn snapshot_for(&self, silo_id: &SiloId) -> Result<ResourceSnapshot> {
            Ok(self.0.get(silo_id.as_str()).cloned().unwrap_or_default())
        }
    }

    #[tokio::test]
    async fn no_capacity_when_roster_is_empty() {
        let service = PlacementService::new(
            PlacementConfig::default(),
            Arc::new(InMemoryMembership::new()),
            Arc::new(SingleSiloProbe {
                silo_id: SiloId::new("silo-1"),
                provider: StaticResourceProvider(ResourceSnapshot::default()),
            }),
            Box::new(RoundRobin::new()),
        );
        let err = service.place("Pizza", None).await.unwrap_err();
        assert!(matches!(err, QuarkError::NoCapacity { .. }));
    }

    #[tokio::test]
    async fn affinity_group_colocates_with_anchor() {
        let mut config = PlacementConfig::default();
        config
            .numa
            .affinity_groups
            .insert("session".into(), vec!["Session".into(), "SessionCache".into()]);

        let membership = Arc::new(InMemoryMembership::with_silos([SiloInfo {
            silo_id: SiloId::new("silo-1"),
            address: "127.0.0.1".into(),
            port: 1,
        }]));

        let service = PlacementService::new(
            config,
            membership,
            Arc::new(FixedProbe(HashMap::new())),
            Box::new(RoundRobin::new()),
        );
        let anchor = SiloId::new("silo-7");
        let chosen = service.place("SessionCache", Some(&anchor)).await.unwrap();
        assert_eq!(chosen, anchor);
    }
}
