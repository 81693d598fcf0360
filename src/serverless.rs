//! The serverless controller: periodically evicts activations that have
//! been idle past the configured timeout, subject to a floor on how many
//! stay resident. Reactivation on the next call is expected to complete
//! well under the mailbox's own processing latency — the directory does no
//! extra work on the hot path beyond the `dashmap` lookup.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::config::ServerlessConfig;
use crate::directory::ActivationDirectory;

pub struct ServerlessController {
    directory: Arc<ActivationDirectory>,
    config: ServerlessConfig,
}

impl ServerlessController {
    pub fn new(directory: Arc<ActivationDirectory>, config: ServerlessConfig) -> Self {
        ServerlessController { directory, config }
    }

    /// Runs the sweep loop forever at `config.check_interval`. Intended to
    /// be spawned as a background task by the host.
    pub async fn run(self) {
        if !self.config.enabled {
            return;
        }
        let mut ticker = tokio::time::interval(self.config.check_interval());
        loop {
            ticker.tick().await;
            self.sweep_once().await;
        }
    }

    /// A single sweep, exposed separately so tests can drive it deterministically.
    pub async fn sweep_once(&self) {
        let idle_timeout = self.config.idle_timeout();
        let floor = self.config.minimum_active_actors;

        let mut candidates = self.directory.idle_candidates(idle_timeout);
        let resident = self.directory.resident_count();
        let evictable = resident.saturating_sub(floor);
        candidates.truncate(evictable);

        for identity in candidates {
            debug!(identity = %identity, "evicting idle activation");
            if let Err(err) = self.directory.deactivate(&identity).await {
                warn!(identity = %identity, error = %err, "deactivate failed during sweep");
            }
        }
    }
}
