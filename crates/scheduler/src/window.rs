use joule_core::config::{SchedulingConfig, WindowStrategy};
use joule_core::types::Task;

/// The slice of the pending queue the next policy is allowed to work through
/// before the switch check fires. `size` counts task instances, `num_tasks`
/// the queue entries contributing them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedWindow {
    pub size: usize,
    pub num_tasks: usize,
}

/// Pluggable sizing strategy for the scheduling window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WindowSizer {
    /// Operator-fixed number of instances.
    Fixed(usize),
    /// Free CPU divided by the mean per-task CPU demand.
    MeanCpuFit,
    /// Instances whose summed CPU fits within a share of free CPU.
    CpuCapacityShare(f64),
}

impl WindowSizer {
    pub fn from_config(config: &SchedulingConfig) -> Self {
        match config.window_strategy {
            WindowStrategy::Fixed => WindowSizer::Fixed(config.fixed_window_size.unwrap_or(0)),
            WindowStrategy::MeanCpuFit => WindowSizer::MeanCpuFit,
            WindowStrategy::CpuCapacityShare => {
                WindowSizer::CpuCapacityShare(config.cpu_capacity_share)
            }
        }
    }

    /// Size the window against the pending queue and the cluster's free CPU
    /// as observed in the latest offer cycle.
    pub fn apply(&self, pending: &[Task], available_cpus: f64) -> SchedWindow {
        match *self {
            WindowSizer::Fixed(limit) => prefix_by_instances(pending, limit),
            WindowSizer::MeanCpuFit => {
                if pending.is_empty() || available_cpus <= 0.0 {
                    return SchedWindow::default();
                }
                let mean_cpu: f64 =
                    pending.iter().map(|t| t.cpu).sum::<f64>() / pending.len() as f64;
                if mean_cpu <= 0.0 {
                    return SchedWindow::default();
                }
                let fit = (available_cpus / mean_cpu).floor() as usize;
                prefix_by_instances(pending, fit)
            }
            WindowSizer::CpuCapacityShare(share) => {
                let budget = available_cpus * share;
                if pending.is_empty() || budget <= 0.0 {
                    return SchedWindow::default();
                }
                let mut window = SchedWindow::default();
                let mut used = 0.0;
                'outer: for task in pending {
                    let mut in_window = false;
                    for _ in 0..task.instances {
                        if used + task.cpu > budget {
                            break 'outer;
                        }
                        used += task.cpu;
                        window.size += 1;
                        in_window = true;
                    }
                    if in_window {
                        window.num_tasks += 1;
                    }
                }
                window
            }
        }
    }
}

/// Window covering up to `limit` instances off the front of the queue.
fn prefix_by_instances(pending: &[Task], limit: usize) -> SchedWindow {
    let mut window = SchedWindow::default();
    for task in pending {
        if window.size >= limit {
            break;
        }
        let take = (task.instances as usize).min(limit - window.size);
        if take == 0 {
            continue;
        }
        window.size += take;
        window.num_tasks += 1;
    }
    window
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests_common::*;

    #[test]
    fn test_fixed_caps_at_queue_size() {
        let pending = vec![
            make_task("a", 1.0, 128.0, 10.0, 3),
            make_task("b", 1.0, 128.0, 20.0, 2),
        ];

        assert_eq!(
            WindowSizer::Fixed(4).apply(&pending, 100.0),
            SchedWindow { size: 4, num_tasks: 2 }
        );
        // More than the queue holds: take everything.
        assert_eq!(
            WindowSizer::Fixed(50).apply(&pending, 100.0),
            SchedWindow { size: 5, num_tasks: 2 }
        );
        assert_eq!(WindowSizer::Fixed(0).apply(&pending, 100.0), SchedWindow::default());
    }

    #[test]
    fn test_mean_cpu_fit() {
        let pending = vec![
            make_task("a", 2.0, 128.0, 10.0, 10),
            make_task("b", 4.0, 128.0, 20.0, 10),
        ];
        // Mean CPU 3.0, 12 free cpus -> 4 instances.
        assert_eq!(
            WindowSizer::MeanCpuFit.apply(&pending, 12.0),
            SchedWindow { size: 4, num_tasks: 1 }
        );
        assert_eq!(
            WindowSizer::MeanCpuFit.apply(&pending, 0.0),
            SchedWindow::default()
        );
    }

    #[test]
    fn test_cpu_capacity_share() {
        let pending = vec![
            make_task("a", 2.0, 128.0, 10.0, 2),
            make_task("b", 2.0, 128.0, 20.0, 4),
        ];
        // Budget 50 * 0.2 = 10 cpus -> 5 instances of 2 cpus.
        assert_eq!(
            WindowSizer::CpuCapacityShare(0.2).apply(&pending, 50.0),
            SchedWindow { size: 5, num_tasks: 2 }
        );
    }

    #[test]
    fn test_empty_queue() {
        assert_eq!(
            WindowSizer::MeanCpuFit.apply(&[], 100.0),
            SchedWindow::default()
        );
    }
}
