use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// Capping state shared between the scheduling callbacks and the ticker
/// loops. Both cap values are percentages-to-keep in (0, 100].
///
/// Writers race only on publishing a fresher safe floor, so the latest write
/// winning is acceptable.
#[derive(Debug, Clone, Default)]
pub struct CapState {
    /// Most recent proactively determined cap.
    pub cap_value: f64,
    /// Cap recomputed after task completions.
    pub recap_value: f64,
    pub is_capping: bool,
    pub is_recapping: bool,
}

pub type SharedCapState = Arc<Mutex<CapState>>;

/// Hostnames the capper has seen offers from; the ticker loops push caps to
/// every one of them.
pub type SharedHosts = Arc<Mutex<HashSet<String>>>;

pub fn shared() -> SharedCapState {
    Arc::new(Mutex::new(CapState::default()))
}

pub fn shared_hosts() -> SharedHosts {
    Arc::new(Mutex::new(HashSet::new()))
}
