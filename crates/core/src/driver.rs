use serde::{Deserialize, Serialize};

use crate::error::JouleError;
use crate::types::ScalarResource;

/// Refusal filter attached to every accept or decline call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Filters {
    pub refuse_seconds: f64,
}

impl Filters {
    /// Short refusal used during normal scheduling.
    pub fn default_filter() -> Self {
        Self { refuse_seconds: 1.0 }
    }

    /// Long refusal used once there is nothing left to schedule.
    pub fn long_filter() -> Self {
        Self {
            refuse_seconds: 1000.0,
        }
    }
}

/// Immutable launch-time snapshot of one task instance.
///
/// Carries its own copy of the launch parameters so nothing refers back into
/// the pending queue after the driver call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskInfo {
    pub task_id: String,
    pub name: String,
    pub agent_id: String,
    pub image: String,
    pub cmd: String,
    pub resources: Vec<ScalarResource>,
}

/// The seam to the framework SDK.
///
/// The real driver delivers callbacks serially and accepts these two outbound
/// calls; everything else about the wire protocol stays on the SDK side.
pub trait SchedulerDriver {
    fn launch_tasks(
        &mut self,
        offer_id: &str,
        tasks: Vec<TaskInfo>,
        filters: Filters,
    ) -> Result<(), JouleError>;

    fn decline_offer(&mut self, offer_id: &str, filters: Filters) -> Result<(), JouleError>;
}
