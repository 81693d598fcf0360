//! NUMA/GPU resource snapshots, TTL-cached so placement decisions don't pay
//! the cost of a fresh probe on every activation.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::Result;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NumaNodeInfo {
    pub node_id: u32,
    /// Total actor slots this node can host.
    pub capacity: u32,
    /// Slots not currently occupied.
    pub availability: u32,
    pub active_actor_count: u32,
    pub cpu_utilization: f64,
    pub memory_utilization: f64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GpuDeviceInfo {
    pub device_id: u32,
    pub capacity: u32,
    pub availability: u32,
    pub active_actor_count: u32,
    pub compute_utilization: f64,
    pub memory_utilization: f64,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResourceSnapshot {
    pub numa_nodes: Vec<NumaNodeInfo>,
    pub gpu_devices: Vec<GpuDeviceInfo>,
}

impl ResourceSnapshot {
    pub fn mean_cpu_utilization(&self) -> f64 {
        mean(self.numa_nodes.iter().map(|n| n.cpu_utilization))
    }

    pub fn mean_memory_utilization(&self) -> f64 {
        mean(self.numa_nodes.iter().map(|n| n.memory_utilization))
    }

    /// Total actors resident across every node/device in this snapshot,
    /// used by [`crate::placement::strategies::LeastUtilized`] to tie-break
    /// candidates that land within the same utilization band.
    pub fn total_active_actor_count(&self) -> u32 {
        self.numa_nodes.iter().map(|n| n.active_actor_count).sum::<u32>()
            + self.gpu_devices.iter().map(|g| g.active_actor_count).sum::<u32>()
    }
}

fn mean(values: impl Iterator<Item = f64> + Clone) -> f64 {
    let count = values.clone().count();
    if count == 0 {
        return 0.0;
    }
    values.sum::<f64>() / count as f64
}

/// Probes a silo's current resource utilization. A real implementation reads
/// `/sys/devices/system/node` and an NVML/ROCm binding; tests supply a fixed
/// snapshot instead.
#[async_trait]
pub trait ResourceProvider: Send + Sync {
    async fn snapshot(&self) -> Result<ResourceSnapshot>;
}

/// Wraps a `ResourceProvider`, serving a cached snapshot until `ttl` elapses.
pub struct CachedResourceProvider<P: ResourceProvider> {
    inner: P,
    ttl: Duration,
    cached: Mutex<Option<(Instant, ResourceSnapshot)>>,
}

impl<P: ResourceProvider> CachedResourceProvider<P> {
    pub fn new(inner: P, ttl: Duration) -> Self {
        CachedResourceProvider {
            inner,
            ttl,
            cached: Mutex::new(None),
        }
    }

    pub async fn snapshot(&self) -> Result<ResourceSnapshot> {
        let mut cached = self.cached.lock().await;
        if let Some((taken_at, snapshot)) = cached.as_ref() {
            if taken_at.elapsed() < self.ttl {
                return Ok(snapshot.clone());
            }
        }
        let fresh = self.inner.snapshot().await?;
        *cached = Some((Instant::now(), fresh.clone()));
        Ok(fresh)
    }
}

/// A fixed snapshot, for tests and for silos with NUMA/GPU awareness disabled.
pub struct StaticResourceProvider(pub ResourceSnapshot);

#[async_trait]
impl ResourceProvider for StaticResourceProvider {
    async fn snapshot(&self) -> Result<ResourceSnapshot> {
        Ok(self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingProvider {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl ResourceProvider for CountingProvider {
        async fn snapshot(&self) -> Result<ResourceSnapshot> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(ResourceSnapshot::default())
        }
    }

    #[tokio::test]
    async fn cache_suppresses_repeated_probes_within_ttl() {
        let calls = Arc::new(AtomicUsize::new(0));
        let provider = CachedResourceProvider::new(CountingProvider { calls: calls.clone() }, Duration::from_secs(60));
        provider.snapshot().await.unwrap();
        provider.snapshot().await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cache_refreshes_after_ttl_elapses() {
        let calls = Arc::new(AtomicUsize::new(0));
        let provider = CachedResourceProvider::new(CountingProvider { calls: calls.clone() }, Duration::from_millis(1));
        provider.snapshot().await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        provider.snapshot().await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
