use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Offer attribute naming the node's power class.
pub const CLASS_ATTRIBUTE: &str = "class";

/// Resource demand or supply along the three schedulable dimensions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Resources {
    pub cpus: f64,
    pub mem: f64,
    pub watts: f64,
}

impl Resources {
    pub fn new(cpus: f64, mem: f64, watts: f64) -> Self {
        Self { cpus, mem, watts }
    }

    /// Accumulate another demand on top of this one.
    pub fn add(&mut self, cpus: f64, mem: f64, watts: f64) {
        self.cpus += cpus;
        self.mem += mem;
        self.watts += watts;
    }
}

/// A batch task as it sits in the pending queue.
///
/// `instances` is the remaining-copies counter; the queue entry is the single
/// source of truth for it. Launched copies carry their own immutable
/// [`TaskInfo`](crate::driver::TaskInfo) snapshot instead of pointing back here.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Task {
    pub name: String,
    pub image: String,
    #[serde(rename = "CMD")]
    pub cmd: String,
    #[serde(rename = "CPU")]
    pub cpu: f64,
    #[serde(rename = "RAM")]
    pub ram: f64,
    pub watts: f64,
    pub instances: u32,
    /// Hostname prefix constraint; empty means any host.
    #[serde(default)]
    pub host: String,
    /// Per power-class watts override, in whole watts.
    #[serde(default)]
    pub class_to_watts: HashMap<String, f64>,
    /// Assigned at launch time; empty while pending.
    #[serde(skip)]
    pub task_id: String,
}

impl Task {
    pub fn watts_of_class(&self, class: &str) -> Option<f64> {
        self.class_to_watts.get(class).copied()
    }
}

/// A single scalar resource inside an offer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScalarResource {
    pub name: String,
    pub value: f64,
}

/// A time-bounded advertisement of resources on a node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Offer {
    pub id: String,
    pub agent_id: String,
    pub hostname: String,
    #[serde(default)]
    pub attributes: HashMap<String, String>,
    pub resources: Vec<ScalarResource>,
}

impl Offer {
    /// The node's power class, if the resource manager advertised one.
    pub fn power_class(&self) -> Option<&str> {
        self.attributes.get(CLASS_ATTRIBUTE).map(|s| s.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskState {
    Staging,
    Running,
    Finished,
    Failed,
    Killed,
    Lost,
    Error,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskState::Finished
                | TaskState::Failed
                | TaskState::Killed
                | TaskState::Lost
                | TaskState::Error
        )
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskState::Staging => write!(f, "TASK_STAGING"),
            TaskState::Running => write!(f, "TASK_RUNNING"),
            TaskState::Finished => write!(f, "TASK_FINISHED"),
            TaskState::Failed => write!(f, "TASK_FAILED"),
            TaskState::Killed => write!(f, "TASK_KILLED"),
            TaskState::Lost => write!(f, "TASK_LOST"),
            TaskState::Error => write!(f, "TASK_ERROR"),
        }
    }
}

/// A task status change delivered by the resource manager.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub task_id: String,
    pub agent_id: String,
    pub state: TaskState,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(!TaskState::Staging.is_terminal());
        assert!(!TaskState::Running.is_terminal());
        assert!(TaskState::Finished.is_terminal());
        assert!(TaskState::Failed.is_terminal());
        assert!(TaskState::Killed.is_terminal());
        assert!(TaskState::Lost.is_terminal());
        assert!(TaskState::Error.is_terminal());
    }

    #[test]
    fn test_offer_power_class() {
        let mut offer = Offer {
            id: "o1".into(),
            agent_id: "a1".into(),
            hostname: "stratos-001".into(),
            attributes: HashMap::new(),
            resources: vec![],
        };
        assert_eq!(offer.power_class(), None);

        offer
            .attributes
            .insert(CLASS_ATTRIBUTE.into(), "A".into());
        assert_eq!(offer.power_class(), Some("A"));
    }
}
