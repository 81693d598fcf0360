//! Configuration surface recognized by the runtime (spec §6).
//!
//! Mirrors the teacher's `load_config` pattern: defaults are set
//! programmatically, then overridden by an optional TOML file named by the
//! `QUARK_CONF` environment variable (default `config/quark.toml`).

use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{QuarkError, Result};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerlessConfig {
    pub enabled: bool,
    pub idle_timeout_secs: u64,
    pub check_interval_secs: u64,
    pub minimum_active_actors: usize,
}

impl Default for ServerlessConfig {
    fn default() -> Self {
        ServerlessConfig {
            enabled: true,
            idle_timeout_secs: 300,
            check_interval_secs: 5,
            minimum_active_actors: 0,
        }
    }
}

impl ServerlessConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct NumaConfig {
    pub enabled: bool,
    pub balanced_placement: bool,
    pub node_cpu_threshold: f64,
    pub node_memory_threshold: f64,
    pub metrics_refresh_interval_secs: u64,
    pub affinity_groups: std::collections::HashMap<String, Vec<String>>,
}

impl Default for NumaConfig {
    fn default() -> Self {
        NumaConfig {
            enabled: false,
            balanced_placement: true,
            node_cpu_threshold: 0.85,
            node_memory_threshold: 0.85,
            metrics_refresh_interval_secs: 10,
            affinity_groups: std::collections::HashMap::new(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GpuBackend {
    Auto,
    Cuda,
    OpenCl,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceSelectionStrategy {
    LeastUtilized,
    LeastMemoryUsed,
    RoundRobin,
    FirstAvailable,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct GpuConfig {
    pub enabled: bool,
    pub backend: GpuBackend,
    pub device_selection_strategy: DeviceSelectionStrategy,
    pub accelerated_actor_types: Vec<String>,
    pub allow_cpu_fallback: bool,
    pub max_gpu_compute_utilization: f64,
    pub max_gpu_memory_utilization: f64,
}

impl Default for GpuConfig {
    fn default() -> Self {
        GpuConfig {
            enabled: false,
            backend: GpuBackend::Auto,
            device_selection_strategy: DeviceSelectionStrategy::LeastUtilized,
            accelerated_actor_types: Vec::new(),
            allow_cpu_fallback: true,
            max_gpu_compute_utilization: 0.9,
            max_gpu_memory_utilization: 0.9,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementConfig {
    pub numa: NumaConfig,
    pub gpu: GpuConfig,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        PlacementConfig {
            numa: NumaConfig::default(),
            gpu: GpuConfig::default(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub client_id: String,
    pub max_retries: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            client_id: "quark-client".into(),
            max_retries: 3,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SupervisionConfig {
    pub restart_window_secs: u64,
    pub restart_threshold: u32,
}

impl Default for SupervisionConfig {
    fn default() -> Self {
        SupervisionConfig {
            restart_window_secs: 60,
            restart_threshold: 5,
        }
    }
}

impl SupervisionConfig {
    pub fn restart_window(&self) -> Duration {
        Duration::from_secs(self.restart_window_secs)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct MailboxConfig {
    /// Soft bound; enqueue past this fails with `Overloaded`.
    pub soft_bound: usize,
}

impl Default for MailboxConfig {
    fn default() -> Self {
        MailboxConfig { soft_bound: 1000 }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ReminderConfig {
    pub tick_interval_secs: u64,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        ReminderConfig {
            tick_interval_secs: 1,
        }
    }
}

impl ReminderConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs)
    }
}

/// Top-level runtime configuration, matching spec §6's configuration surface.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub silo_id: String,
    pub debug: bool,
    pub serverless: ServerlessConfig,
    pub placement: PlacementConfig,
    pub client: ClientConfig,
    pub supervision: SupervisionConfig,
    pub mailbox: MailboxConfig,
    pub reminders: ReminderConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            silo_id: "silo-1".into(),
            debug: false,
            serverless: ServerlessConfig::default(),
            placement: PlacementConfig::default(),
            client: ClientConfig::default(),
            supervision: SupervisionConfig::default(),
            mailbox: MailboxConfig::default(),
            reminders: ReminderConfig::default(),
        }
    }
}

impl Config {
    /// Loads configuration, merging an optional TOML file named by the
    /// `QUARK_CONF` environment variable (default `config/quark.toml`) over
    /// the documented defaults. Missing files are not an error.
    pub fn load() -> Result<Self> {
        let path = env::var("QUARK_CONF").unwrap_or_else(|_| "config/quark.toml".into());

        let defaults = config::Config::try_from(&Config::default()).map_err(QuarkError::Config)?;

        let built = config::Config::builder()
            .add_source(defaults)
            .add_source(config::File::with_name(&path).required(false))
            .build()
            .map_err(QuarkError::Config)?;

        built.try_deserialize().map_err(QuarkError::Config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let cfg = Config::default();
        assert_eq!(cfg.serverless.check_interval_secs, 5);
        assert_eq!(cfg.supervision.restart_threshold, 5);
        assert_eq!(cfg.supervision.restart_window_secs, 60);
    }

    #[test]
    fn load_without_file_falls_back_to_defaults() {
        // SAFETY: test-only process-wide env var mutation, no concurrent access.
        unsafe {
            env::remove_var("QUARK_CONF");
        }
        let cfg = Config::load().unwrap();
        assert_eq!(cfg.mailbox.soft_bound, 1000);
    }
}
