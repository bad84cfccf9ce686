use std::collections::{HashMap, VecDeque};

use joule_core::types::Task;
use joule_core::JouleError;

/// Cluster-wide power capping controller.
///
/// Maintains a bounded FIFO window of recently scheduled tasks and turns the
/// cluster's current consumption picture into a *percentage to keep*: the
/// value published to the RAPL daemons is `100 - average consumption share`,
/// the safe headroom left once the known running mix is accounted for.
#[derive(Debug)]
pub struct ClusterwideCapper {
    window: VecDeque<Task>,
    window_cap: usize,
}

impl ClusterwideCapper {
    pub fn new(window_cap: usize) -> Self {
        Self {
            window: VecDeque::new(),
            window_cap: window_cap.max(1),
        }
    }

    /// Number of tasks currently tracked in the FIFO window.
    pub fn window_len(&self) -> usize {
        self.window.len()
    }

    /// Determine a fresh cluster-wide cap as `incoming` is being scheduled.
    ///
    /// The incoming task joins the FIFO window (evicting the oldest entry when
    /// full), then every windowed task is paired with every known host and the
    /// mean of `watts / total_power * 100` across the pairs becomes the
    /// consumption share.
    pub fn proactive_determined_cap(
        &mut self,
        total_power: &HashMap<String, f64>,
        incoming: &Task,
    ) -> Result<f64, JouleError> {
        if total_power.is_empty() {
            return Err(JouleError::Capper(
                "no hosts with known total power".into(),
            ));
        }

        if self.window.len() == self.window_cap {
            self.window.pop_front();
        }
        self.window.push_back(incoming.clone());

        let mut sum = 0.0;
        let mut pairs = 0usize;
        for task in &self.window {
            for power in total_power.values().filter(|p| **p > 0.0) {
                sum += task.watts / power * 100.0;
                pairs += 1;
            }
        }

        keep_percentage(sum, pairs)
    }

    /// Recompute the cap after `finished_task_id` completed, averaging over
    /// the (task, host) pairs still running according to `task_monitor`.
    pub fn recap(
        &self,
        total_power: &HashMap<String, f64>,
        task_monitor: &HashMap<String, Vec<Task>>,
        finished_task_id: &str,
    ) -> Result<f64, JouleError> {
        let mut sum = 0.0;
        let mut pairs = 0usize;
        for (host, tasks) in task_monitor {
            let Some(power) = total_power.get(host).filter(|p| **p > 0.0) else {
                continue;
            };
            for task in tasks.iter().filter(|t| t.task_id != finished_task_id) {
                sum += task.watts / power * 100.0;
                pairs += 1;
            }
        }

        keep_percentage(sum, pairs)
    }

    /// Like [`recap`](Self::recap), but each host's consumption share is
    /// weighted by its running-task count, skewing the cap toward hosts whose
    /// running mix is power-heavy.
    pub fn clever_recap(
        &self,
        total_power: &HashMap<String, f64>,
        task_monitor: &HashMap<String, Vec<Task>>,
        finished_task_id: &str,
    ) -> Result<f64, JouleError> {
        let mut weighted_sum = 0.0;
        let mut weights = 0usize;
        for (host, tasks) in task_monitor {
            let Some(power) = total_power.get(host).filter(|p| **p > 0.0) else {
                continue;
            };
            let mut share = 0.0;
            let mut count = 0usize;
            for task in tasks.iter().filter(|t| t.task_id != finished_task_id) {
                share += task.watts / power * 100.0;
                count += 1;
            }
            weighted_sum += count as f64 * share;
            weights += count;
        }

        keep_percentage(weighted_sum, weights)
    }

    /// Drop a completed task from the FIFO window.
    pub fn task_finished(&mut self, task_id: &str) {
        self.window.retain(|t| t.task_id != task_id);
    }
}

fn keep_percentage(sum: f64, pairs: usize) -> Result<f64, JouleError> {
    if pairs == 0 {
        return Err(JouleError::Capper("no running tasks to average over".into()));
    }
    let average = sum / pairs as f64;
    if average <= 0.0 {
        return Err(JouleError::Capper(
            "average consumption share is zero".into(),
        ));
    }
    let keep = 100.0 - average.min(100.0);
    if keep <= 0.0 {
        return Err(JouleError::Capper(format!(
            "no headroom left: consumption share {:.2}%",
            average
        )));
    }
    Ok(keep)
}
