use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use joule_capper::tickers::{start_cap_loop, start_recap_loop};
use joule_capper::RaplClient;
use joule_core::config::JouleConfig;
use joule_core::driver::SchedulerDriver;
use joule_core::types::{Offer, StatusUpdate, Task, TaskState};
use joule_core::JouleError;
use joule_scheduler::policies::SchedPolicy;
use joule_scheduler::{switch, SchedCtx};

use crate::events::FrameworkEvents;

/// The framework event adapter: owns the scheduling context, feeds offer
/// batches to the active policy, keeps the task lifecycle books, and drives
/// the capping controller off status changes.
#[derive(Debug)]
pub struct JouleScheduler {
    pub ctx: SchedCtx,
    done_tx: watch::Sender<bool>,
    cap_handle: Option<JoinHandle<()>>,
    recap_handle: Option<JoinHandle<()>>,
}

impl JouleScheduler {
    pub fn new(config: &JouleConfig, pending: Vec<Task>) -> Result<Self, JouleError> {
        let first_policy = match config.scheduling.first_policy.as_deref() {
            Some(name) => Some(SchedPolicy::from_name(name).ok_or_else(|| {
                JouleError::Config(format!("unknown first policy: {name}"))
            })?),
            None => None,
        };

        let mut ctx = SchedCtx::new(config, pending, first_policy, joule_capper::state::shared());
        // Deploy the opening policy before any offers arrive.
        switch::switch_if_necessary(&mut ctx);

        let (done_tx, _) = watch::channel(false);
        Ok(Self {
            ctx,
            done_tx,
            cap_handle: None,
            recap_handle: None,
        })
    }

    /// Signal observed by the embedding binary; flips to `true` once the
    /// pending queue has drained and every launched task reached a terminal
    /// state.
    pub fn done(&self) -> watch::Receiver<bool> {
        self.done_tx.subscribe()
    }

    /// Spawn the cap and recap ticker loops. Requires a running tokio
    /// runtime; until the first successful fit both loops idle.
    pub fn start_capping_loops(&mut self, config: &JouleConfig) {
        let client = Arc::new(RaplClient::new(config.capping.rapl_port));
        self.cap_handle = Some(start_cap_loop(
            self.ctx.cap_state.clone(),
            self.ctx.known_hosts.clone(),
            client.clone(),
            Duration::from_secs(config.capping.cap_interval_secs),
        ));
        self.recap_handle = Some(start_recap_loop(
            self.ctx.cap_state.clone(),
            self.ctx.known_hosts.clone(),
            client,
            Duration::from_secs(config.capping.recap_interval_secs),
        ));
    }

    fn stop_capping_loops(&mut self) {
        if let Some(handle) = self.cap_handle.take() {
            handle.abort();
        }
        if let Some(handle) = self.recap_handle.take() {
            handle.abort();
        }
    }
}

impl FrameworkEvents for JouleScheduler {
    fn registered(&mut self, framework_id: &str, master: &str) {
        info!("Framework {} registered with master {}", framework_id, master);
    }

    fn reregistered(&mut self, master: &str) {
        info!("Framework re-registered with master {}", master);
    }

    fn disconnected(&mut self) {
        info!("Framework disconnected from master");
        self.stop_capping_loops();
        self.ctx.cap_state.lock().unwrap().is_capping = false;
    }

    fn resource_offers(
        &mut self,
        driver: &mut dyn SchedulerDriver,
        offers: &[Offer],
    ) -> Result<(), JouleError> {
        info!("Received {} resource offers", offers.len());
        for offer in offers {
            self.ctx.update_environment(offer);
        }
        self.ctx.has_received_offers = true;

        let policy = self.ctx.active_policy;
        policy.consume_offers(&mut self.ctx, driver, offers)?;

        // Policy switches happen strictly between batches.
        switch::switch_if_necessary(&mut self.ctx);
        Ok(())
    }

    fn status_update(&mut self, status: &StatusUpdate) {
        info!(
            "Task status [{}] for task [{}]",
            status.state, status.task_id
        );

        if status.state == TaskState::Running {
            self.ctx.tasks_running += 1;
        } else if status.state.is_terminal() {
            if let Some(tasks) = self.ctx.running.get_mut(&status.agent_id) {
                tasks.remove(&status.task_id);
                if tasks.is_empty() {
                    self.ctx.running.remove(&status.agent_id);
                }
            }
            self.ctx.tasks_running = self.ctx.tasks_running.saturating_sub(1);
            self.ctx.capper.task_finished(&status.task_id);

            if self.ctx.pending.is_empty() && self.ctx.tasks_running == 0 {
                self.ctx.cap_state.lock().unwrap().is_recapping = false;
                info!("All tasks terminal, framework can wind down");
                self.done_tx.send_replace(true);
            } else {
                match self.ctx.capper.clever_recap(
                    &self.ctx.total_power,
                    &self.ctx.task_monitor,
                    &status.task_id,
                ) {
                    Ok(value) => {
                        let mut cap = self.ctx.cap_state.lock().unwrap();
                        if value.round() as i64 != cap.recap_value.round() as i64 {
                            info!("Determined re-cap value: {:.3}", value);
                            cap.recap_value = value;
                            cap.is_recapping = true;
                        } else {
                            cap.is_recapping = false;
                        }
                    }
                    Err(e) => warn!("Keeping previous recap value: {}", e),
                }
            }
            self.ctx.remove_from_monitor(&status.task_id);
        }
    }

    fn offer_rescinded(&mut self, offer_id: &str) {
        info!("Offer {} rescinded", offer_id);
    }

    fn slave_lost(&mut self, agent_id: &str) {
        info!("Agent {} lost", agent_id);
    }

    fn executor_lost(&mut self, executor_id: &str, agent_id: &str, status: i32) {
        info!(
            "Executor {} on agent {} was lost ({})",
            executor_id, agent_id, status
        );
    }

    fn framework_message(&mut self, executor_id: &str, _agent_id: &str, message: &str) {
        info!("Framework message from {}: {}", executor_id, message);
    }

    fn error(&mut self, message: &str) {
        warn!("Framework error: {}", message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use joule_core::driver::{Filters, TaskInfo};

    fn make_task(name: &str, cpu: f64, ram: f64, watts: f64, instances: u32) -> Task {
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

    fn make_offer(id: &str, agent: &str, host: &str, cpus: f64, mem: f64, watts: f64) -> Offer {
        Offer {
            id: id.into(),
            agent_id: agent.into(),
            hostname: host.into(),
            attributes: HashMap::new(),
            resources: vec![
                joule_core::types::ScalarResource {
                    name: "cpus".into(),
                    value: cpus,
                },
                joule_core::types::ScalarResource {
                    name: "mem".into(),
                    value: mem,
                },
                joule_core::types::ScalarResource {
                    name: "watts".into(),
                    value: watts,
                },
            ],
        }
    }

    fn test_config() -> JouleConfig {
        let mut config = JouleConfig::default();
        config.scheduling.watts_as_a_resource = true;
        config.scheduling.warmup_on_first_launch = false;
        config
    }

    #[derive(Default)]
    struct RecordingDriver {
        launches: Vec<(String, Vec<TaskInfo>, Filters)>,
        declines: Vec<(String, Filters)>,
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

    #[test]
    fn test_exact_fit_lifecycle() {
        let config = test_config();
        let tasks = vec![make_task("exact", 4.0, 8192.0, 80.0, 1)];
        let mut sched = JouleScheduler::new(&config, tasks).unwrap();
        let mut driver = RecordingDriver::default();

        sched
            .resource_offers(&mut driver, &[make_offer("o1", "a1", "h1", 4.0, 8192.0, 80.0)])
            .unwrap();

        assert_eq!(driver.launches.len(), 1);
        let task_id = driver.launches[0].1[0].task_id.clone();
        assert!(sched.ctx.pending.is_empty());
        assert!(sched.ctx.shutdown);
        assert!(sched.ctx.running["a1"].contains(&task_id));

        // Subsequent offers draw the long refusal.
        sched
            .resource_offers(&mut driver, &[make_offer("o2", "a1", "h1", 4.0, 8192.0, 80.0)])
            .unwrap();
        assert_eq!(driver.declines.len(), 1);
        assert_eq!(driver.declines[0].1, Filters::long_filter());

        // Lifecycle: RUNNING then FINISHED closes the done signal.
        let done = sched.done();
        sched.status_update(&StatusUpdate {
            task_id: task_id.clone(),
            agent_id: "a1".into(),
            state: TaskState::Running,
        });
        assert_eq!(sched.ctx.tasks_running, 1);
        assert!(!*done.borrow());

        sched.status_update(&StatusUpdate {
            task_id: task_id.clone(),
            agent_id: "a1".into(),
            state: TaskState::Finished,
        });
        assert_eq!(sched.ctx.tasks_running, 0);
        assert!(sched.ctx.running.is_empty());
        assert!(*done.borrow());
    }

    #[test]
    fn test_terminal_status_triggers_recap() {
        let mut config = test_config();
        config.scheduling.first_policy = Some("ranked-proactive-cap".into());
        let tasks = vec![
            make_task("a", 1.0, 100.0, 50.0, 1),
            make_task("b", 1.0, 100.0, 100.0, 1),
            make_task("c", 1.0, 100.0, 80.0, 1),
        ];
        let mut sched = JouleScheduler::new(&config, tasks).unwrap();
        let mut driver = RecordingDriver::default();

        // Ranked places one instance per offer.
        let offers = [
            make_offer("o1", "a1", "h1", 8.0, 8000.0, 250.0),
            make_offer("o2", "a2", "h2", 8.0, 8000.0, 250.0),
            make_offer("o3", "a1", "h1", 8.0, 8000.0, 250.0),
        ];
        sched.resource_offers(&mut driver, &offers).unwrap();
        assert_eq!(driver.launches.len(), 3);
        assert!(sched.ctx.pending.is_empty());

        for (offer_id, tasks, _) in &driver.launches {
            let agent = if offer_id == "o2" { "a2" } else { "a1" };
            sched.status_update(&StatusUpdate {
                task_id: tasks[0].task_id.clone(),
                agent_id: agent.into(),
                state: TaskState::Running,
            });
        }

        let first_id = driver.launches[0].1[0].task_id.clone();
        sched.status_update(&StatusUpdate {
            task_id: first_id,
            agent_id: "a1".into(),
            state: TaskState::Finished,
        });

        let cap = sched.ctx.cap_state.lock().unwrap();
        assert!(cap.is_recapping);
        assert!(cap.recap_value > 0.0 && cap.recap_value <= 100.0);
        assert_eq!(sched.ctx.tasks_running, 2);
    }

    #[test]
    fn test_unknown_first_policy_is_config_error() {
        let mut config = test_config();
        config.scheduling.first_policy = Some("power-walk".into());
        let err = JouleScheduler::new(&config, vec![make_task("t", 1.0, 1.0, 1.0, 1)])
            .unwrap_err();
        assert!(matches!(err, JouleError::Config(_)));
    }

    #[test]
    fn test_disconnected_clears_capping() {
        let config = test_config();
        let mut sched =
            JouleScheduler::new(&config, vec![make_task("t", 1.0, 1.0, 1.0, 1)]).unwrap();
        sched.ctx.cap_state.lock().unwrap().is_capping = true;

        sched.disconnected();
        assert!(!sched.ctx.cap_state.lock().unwrap().is_capping);
    }

    #[test]
    fn test_switching_selects_by_window_distribution() {
        let mut config = test_config();
        config.scheduling.policy_switching = true;
        config.scheduling.fixed_window_size = Some(4);
        let tasks = vec![
            make_task("light-a", 1.0, 100.0, 10.0, 1),
            make_task("light-b", 1.0, 100.0, 10.0, 1),
            make_task("heavy-a", 1.0, 100.0, 200.0, 1),
            make_task("heavy-b", 1.0, 100.0, 200.0, 1),
        ];
        let mut sched = JouleScheduler::new(&config, tasks).unwrap();

        // Before any offers the controller picks by the window's
        // distribution, which is exactly 1.0 here.
        assert_eq!(sched.ctx.active_policy, SchedPolicy::MaxGreedyMins);
    }
}
