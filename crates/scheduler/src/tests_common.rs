use std::collections::HashMap;

use joule_capper::state;
use joule_core::config::JouleConfig;
use joule_core::driver::{Filters, SchedulerDriver, TaskInfo};
use joule_core::types::{Offer, ScalarResource, Task};
use joule_core::JouleError;

use crate::ctx::SchedCtx;

pub fn make_task(name: &str, cpu: f64, ram: f64, watts: f64, instances: u32) -> Task {
    Task {
        name: name.into(),
        image: "bench/stress:latest".into(),
        cmd: "stress -c 1".into(),
        cpu,
        ram,
        watts,
        instances,
        host: String::new(),
        class_to_watts: HashMap::new(),
        task_id: String::new(),
    }
}

pub fn make_offer(id: &str, agent: &str, host: &str, cpus: f64, mem: f64, watts: f64) -> Offer {
    Offer {
        id: id.into(),
        agent_id: agent.into(),
        hostname: host.into(),
        attributes: HashMap::new(),
        resources: vec![
            ScalarResource {
                name: "cpus".into(),
                value: cpus,
            },
            ScalarResource {
                name: "mem".into(),
                value: mem,
            },
            ScalarResource {
                name: "watts".into(),
                value: watts,
            },
        ],
    }
}

pub fn make_classed_offer(
    id: &str,
    agent: &str,
    host: &str,
    cpus: f64,
    mem: f64,
    watts: f64,
    class: &str,
) -> Offer {
    let mut offer = make_offer(id, agent, host, cpus, mem, watts);
    offer
        .attributes
        .insert(joule_core::types::CLASS_ATTRIBUTE.into(), class.into());
    offer
}

/// Context with watts accounting enabled and the first-launch warmup pause
/// disabled, as every policy test wants it.
pub fn test_ctx(pending: Vec<Task>) -> SchedCtx {
    let mut config = JouleConfig::default();
    config.scheduling.watts_as_a_resource = true;
    config.scheduling.warmup_on_first_launch = false;
    SchedCtx::new(&config, pending, None, state::shared())
}

/// Driver double that records every outbound call.
#[derive(Default)]
pub struct RecordingDriver {
    pub launches: Vec<(String, Vec<TaskInfo>, Filters)>,
    pub declines: Vec<(String, Filters)>,
}

impl RecordingDriver {
    pub fn launched_instances(&self) -> usize {
        self.launches.iter().map(|(_, tasks, _)| tasks.len()).sum()
    }
}

impl SchedulerDriver for RecordingDriver {
    fn launch_tasks(
        &mut self,
        offer_id: &str,
        tasks: Vec<TaskInfo>,
        filters: Filters,
    ) -> Result<(), JouleError> {
        self.launches.push((offer_id.into(), tasks, filters));
        Ok(())
    }

    fn decline_offer(&mut self, offer_id: &str, filters: Filters) -> Result<(), JouleError> {
        self.declines.push((offer_id.into(), filters));
        Ok(())
    }
}
