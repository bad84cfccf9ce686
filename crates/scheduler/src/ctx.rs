use std::collections::{HashMap, HashSet};

use tracing::{debug, info};

use joule_capper::state::{SharedCapState, SharedHosts};
use joule_capper::ClusterwideCapper;
use joule_core::config::JouleConfig;
use joule_core::driver::TaskInfo;
use joule_core::types::{Offer, Resources, ScalarResource, Task};

use crate::offers::offer_aggregate;
use crate::policies::{self, SchedPolicy};
use crate::window::{SchedWindow, WindowSizer};

/// All scheduling state shared by the policies, the switch controller, and
/// the framework event adapter. Policies are stateless tags; everything they
/// mutate lives here.
#[derive(Debug)]
pub struct SchedCtx {
    // Operator knobs.
    pub watts_as_a_resource: bool,
    pub class_map_watts: bool,
    pub policy_switching: bool,
    pub fixed_window_size: Option<usize>,
    pub first_policy: Option<SchedPolicy>,
    pub window_sizer: WindowSizer,
    pub warmup_on_first_launch: bool,

    // Scheduling state.
    pub pending: Vec<Task>,
    /// agent id -> ids of tasks launched there.
    pub running: HashMap<String, HashSet<String>>,
    /// hostname -> launch-time snapshots of tasks running there, in launch
    /// order; consumed by the recap computation.
    pub task_monitor: HashMap<String, Vec<Task>>,
    /// Nameplate watts per host: first observation wins, never overwritten.
    pub total_power: HashMap<String, f64>,
    /// Latest observed watts per host, refreshed every offer cycle.
    pub available_power: HashMap<String, f64>,
    /// Latest observed free cpus per host, refreshed every offer cycle.
    pub available_cpus: HashMap<String, f64>,
    pub known_hosts: SharedHosts,

    pub tasks_created: usize,
    pub tasks_running: usize,
    pub shutdown: bool,
    pub has_received_offers: bool,

    // Policy switching.
    pub active_policy: SchedPolicy,
    pub registry: Vec<SchedPolicy>,
    pub sched_window: SchedWindow,
    pub num_tasks_scheduled: usize,

    // Power capping.
    pub capper: ClusterwideCapper,
    pub cap_state: SharedCapState,

    log_warmed: bool,
}

impl SchedCtx {
    pub fn new(
        config: &JouleConfig,
        pending: Vec<Task>,
        first_policy: Option<SchedPolicy>,
        cap_state: SharedCapState,
    ) -> Self {
        let scheduling = &config.scheduling;
        Self {
            watts_as_a_resource: scheduling.watts_as_a_resource,
            class_map_watts: scheduling.class_map_watts,
            policy_switching: scheduling.policy_switching,
            fixed_window_size: scheduling.fixed_window_size,
            first_policy,
            window_sizer: WindowSizer::from_config(scheduling),
            warmup_on_first_launch: scheduling.warmup_on_first_launch,
            pending,
            running: HashMap::new(),
            task_monitor: HashMap::new(),
            total_power: HashMap::new(),
            available_power: HashMap::new(),
            available_cpus: HashMap::new(),
            known_hosts: joule_capper::state::shared_hosts(),
            tasks_created: 0,
            tasks_running: 0,
            shutdown: false,
            has_received_offers: false,
            active_policy: first_policy.unwrap_or(SchedPolicy::BinPackSortedWatts),
            registry: policies::switching_registry(),
            sched_window: SchedWindow::default(),
            num_tasks_scheduled: 0,
            capper: ClusterwideCapper::new(config.capping.task_window_size),
            cap_state,
            log_warmed: false,
        }
    }

    /// Refresh the per-host caches from an incoming offer. Nameplate power is
    /// write-once; the available figures track the latest offer cycle.
    pub fn update_environment(&mut self, offer: &Offer) {
        let (cpus, _, watts) = offer_aggregate(offer);
        self.available_power.insert(offer.hostname.clone(), watts);
        self.available_cpus.insert(offer.hostname.clone(), cpus);
        self.total_power
            .entry(offer.hostname.clone())
            .or_insert(watts);
        self.known_hosts
            .lock()
            .unwrap()
            .insert(offer.hostname.clone());
    }

    /// Free CPU across the cluster as of the latest offer cycle.
    pub fn available_cpu_total(&self) -> f64 {
        self.available_cpus.values().sum()
    }

    /// Stable ascending sort of the pending queue by declared watts; the
    /// shared pre-step of every policy.
    pub fn sort_pending_by_watts(&mut self) {
        self.pending
            .sort_by(|a, b| a.watts.partial_cmp(&b.watts).unwrap_or(std::cmp::Ordering::Equal));
    }

    /// The shared fit predicate: residual offer capacity covers the task
    /// along every enabled dimension.
    pub fn fits(&self, aggregate: Resources, used: &Resources, task: &Task, watts: f64) -> bool {
        aggregate.cpus >= used.cpus + task.cpu
            && aggregate.mem >= used.mem + task.ram
            && (!self.watts_as_a_resource || aggregate.watts >= used.watts + watts)
    }

    /// Claim one instance of `pending[index]` against `offer`: decrement the
    /// remaining-copies counter, account the launch in the running table and
    /// the per-host task monitor, and hand back the immutable launch record.
    pub fn claim_instance(
        &mut self,
        offer: &Offer,
        index: usize,
        watts: f64,
        used: &mut Resources,
    ) -> TaskInfo {
        if !self.log_warmed {
            self.log_warmed = true;
            if self.warmup_on_first_launch {
                // Give external metric collection a head start on the very
                // first launch.
                std::thread::sleep(std::time::Duration::from_secs(1));
            }
        }

        let task = &mut self.pending[index];
        let instance_name = format!("{}-{}", task.name, task.instances);
        let task_id = format!("joule-{}", instance_name);
        task.instances -= 1;

        used.add(task.cpu, task.ram, watts);

        let mut resources = vec![
            ScalarResource {
                name: "cpus".into(),
                value: task.cpu,
            },
            ScalarResource {
                name: "mem".into(),
                value: task.ram,
            },
        ];
        if self.watts_as_a_resource {
            resources.push(ScalarResource {
                name: "watts".into(),
                value: watts,
            });
        }

        let info = TaskInfo {
            task_id: task_id.clone(),
            name: instance_name,
            agent_id: offer.agent_id.clone(),
            image: task.image.clone(),
            cmd: task.cmd.clone(),
            resources,
        };

        let mut snapshot = task.clone();
        snapshot.task_id = task_id.clone();
        snapshot.instances = 1;

        self.tasks_created += 1;
        self.num_tasks_scheduled += 1;

        let colocated = self.running.entry(offer.agent_id.clone()).or_default();
        if !colocated.is_empty() {
            debug!("Co-located with: {:?}", colocated);
        }
        colocated.insert(task_id);
        self.task_monitor
            .entry(offer.hostname.clone())
            .or_default()
            .push(snapshot);

        info
    }

    /// Drop exhausted queue entries and flag shutdown once the queue drains.
    /// Draining also flips the capper from capping to recapping.
    pub fn prune_pending(&mut self) {
        self.pending.retain(|t| t.instances > 0);
        if self.pending.is_empty() && !self.shutdown {
            info!("Done scheduling all tasks");
            self.shutdown = true;
            let mut cap = self.cap_state.lock().unwrap();
            if cap.is_capping {
                cap.is_capping = false;
                cap.is_recapping = true;
            }
        }
    }

    /// Remove a finished task from the per-host monitor.
    pub fn remove_from_monitor(&mut self, task_id: &str) {
        for tasks in self.task_monitor.values_mut() {
            tasks.retain(|t| t.task_id != task_id);
        }
        self.task_monitor.retain(|_, tasks| !tasks.is_empty());
    }
}
