use serde::{Deserialize, Serialize};

/// Strategy used to size the scheduling window when no fixed size is set.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum WindowStrategy {
    /// Always use `scheduling.fixed_window_size` (or 0 when unset).
    Fixed,
    /// Fit as many instances as the cluster's free CPU divided by the mean
    /// per-task CPU demand allows.
    MeanCpuFit,
    /// Fit instances until their summed CPU reaches a share of free CPU.
    CpuCapacityShare,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulingConfig {
    /// Enable switching between scheduling policies at window boundaries.
    pub policy_switching: bool,
    /// Operator-fixed scheduling window, in task instances.
    pub fixed_window_size: Option<usize>,
    /// Name of the first policy to deploy before any offers arrive.
    pub first_policy: Option<String>,
    /// Treat watts as a schedulable resource alongside cpus and mem.
    pub watts_as_a_resource: bool,
    /// Look task watts up through the offer's power class.
    pub class_map_watts: bool,
    pub window_strategy: WindowStrategy,
    /// Share of free CPU granted to the window under `CpuCapacityShare`.
    pub cpu_capacity_share: f64,
    /// Pause for one second before the first launch so external metric
    /// collection is recording by the time the task starts.
    pub warmup_on_first_launch: bool,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            policy_switching: false,
            fixed_window_size: None,
            first_policy: None,
            watts_as_a_resource: false,
            class_map_watts: false,
            window_strategy: WindowStrategy::MeanCpuFit,
            cpu_capacity_share: 0.2,
            warmup_on_first_launch: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CappingConfig {
    pub cap_interval_secs: u64,
    pub recap_interval_secs: u64,
    /// Bound on the capper's FIFO window of recently scheduled tasks.
    pub task_window_size: usize,
    /// Port the node-local RAPL daemon listens on.
    pub rapl_port: u16,
}

impl Default for CappingConfig {
    fn default() -> Self {
        Self {
            cap_interval_secs: 10,
            recap_interval_secs: 20,
            task_window_size: 100,
            rapl_port: 9090,
        }
    }
}

/// Top-level configuration aggregating all sub-configs.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct JouleConfig {
    #[serde(default)]
    pub scheduling: SchedulingConfig,
    #[serde(default)]
    pub capping: CappingConfig,
}

/// Load configuration from a TOML file.
/// Falls back to defaults if the file doesn't exist or fails to parse.
pub fn load_config(path: &str) -> JouleConfig {
    match std::fs::read_to_string(path) {
        Ok(contents) => match toml::from_str(&contents) {
            Ok(config) => {
                tracing::info!("Loaded config from {}", path);
                config
            }
            Err(e) => {
                tracing::warn!("Failed to parse config {}: {}, using defaults", path, e);
                JouleConfig::default()
            }
        },
        Err(_) => {
            tracing::debug!("Config file {} not found, using defaults", path);
            JouleConfig::default()
        }
    }
}
