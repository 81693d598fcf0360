//! Pluggable silo-selection strategies, chosen via
//! `DeviceSelectionStrategy` in configuration.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::membership::SiloId;
use crate::placement::resources::ResourceSnapshot;

/// One candidate silo and its current resource snapshot.
pub struct Candidate<'a> {
    pub silo_id: &'a SiloId,
    pub snapshot: &'a ResourceSnapshot,
}

pub trait PlacementStrategy: Send + Sync {
    /// Picks a silo from `candidates`, or `None` if none are viable.
    fn select(&self, candidates: &[Candidate<'_>]) -> Option<SiloId>;
}

/// Picks the candidate with the lowest mean CPU utilization among those
/// under `cpu_ceiling`, breaking ties by preferring fewer resident actors.
pub struct LeastUtilized {
    pub cpu_ceiling: f64,
}

impl LeastUtilized {
    pub fn new(cpu_ceiling: f64) -> Self {
        LeastUtilized { cpu_ceiling }
    }
}

impl PlacementStrategy for LeastUtilized {
    fn select(&self, candidates: &[Candidate<'_>]) -> Option<SiloId> {
        candidates
            .iter()
            .filter(|c| c.snapshot.mean_cpu_utilization() < self.cpu_ceiling)
            .min_by(|a, b| {
                a.snapshot
                    .mean_cpu_utilization()
                    .total_cmp(&b.snapshot.mean_cpu_utilization())
                    .then_with(|| {
                        a.snapshot
                            .total_active_actor_count()
                            .cmp(&b.snapshot.total_active_actor_count())
                    })
            })
            .map(|c| c.silo_id.clone())
    }
}

pub struct LeastMemoryUsed;

impl PlacementStrategy for LeastMemoryUsed {
    fn select(&self, candidates: &[Candidate<'_>]) -> Option<SiloId> {
        candidates
            .iter()
            .min_by(|a, b| {
                a.snapshot
                    .mean_memory_utilization()
                    .total_cmp(&b.snapshot.mean_memory_utilization())
            })
            .map(|c| c.silo_id.clone())
    }
}

/// Cycles through candidates in the order given, independent of load.
pub struct RoundRobin {
    next: AtomicUsize,
}

impl RoundRobin {
    pub fn new() -> Self {
        RoundRobin { next: AtomicUsize::new(0) }
    }
}

impl Default for RoundRobin {
    fn default() -> Self {
        Self::new()
    }
}

impl PlacementStrategy for RoundRobin {
    fn select(&self, candidates: &[Candidate<'_>]) -> Option<SiloId> {
        if candidates.is_empty() {
            return None;
        }
        let idx = self.next.fetch_add(1, Ordering::Relaxed) % candidates.len();
        Some(candidates[idx].silo_id.clone())
    }
}

/// Picks the first candidate under the configured utilization threshold,
/// without comparing the rest. Cheaper than `LeastUtilized` when any viable
/// silo is as good as the best one.
pub struct FirstAvailable {
    pub cpu_threshold: f64,
}

impl PlacementStrategy for FirstAvailable {
    fn select(&self, candidates: &[Candidate<'_>]) -> Option<SiloId> {
        candidates
            .iter()
            .find(|c| c.snapshot.mean_cpu_utilization() < self.cpu_threshold)
            .map(|c| c.silo_id.clone())
    }
}
