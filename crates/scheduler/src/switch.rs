use tracing::{debug, info, warn};

use joule_core::JouleError;

use crate::classify::task_distribution;
use crate::ctx::SchedCtx;
use crate::policies::SchedPolicy;
use crate::window::WindowSizer;

/// Decide, at a window boundary, whether to swap the active policy.
///
/// Runs only between offer batches; the window is re-sized on every check
/// unless the operator fixed it, and a window of zero suspends switching for
/// the tick.
pub fn switch_if_necessary(ctx: &mut SchedCtx) {
    if !ctx.policy_switching {
        return;
    }

    let sizer = match ctx.fixed_window_size {
        Some(fixed) => WindowSizer::Fixed(fixed),
        None => ctx.window_sizer,
    };
    ctx.sched_window = sizer.apply(&ctx.pending, ctx.available_cpu_total());

    if ctx.sched_window.size == 0 {
        debug!(
            "Continuing with {}: scheduling window is empty",
            ctx.active_policy.name()
        );
        return;
    }

    let next = if !ctx.has_received_offers {
        match ctx.first_policy {
            Some(first) => Some((first, None)),
            None => Some(next_policy(ctx)),
        }
    } else if ctx.num_tasks_scheduled >= ctx.sched_window.size {
        Some(next_policy(ctx))
    } else {
        debug!(
            "Continuing with {}: TasksScheduled[{}], SchedWindowSize[{}]",
            ctx.active_policy.name(),
            ctx.num_tasks_scheduled,
            ctx.sched_window.size
        );
        None
    };

    if let Some((policy, task_dist)) = next {
        match task_dist {
            Some(dist) => info!(
                "Switching to {} for task distribution {:.3}",
                policy.name(),
                dist
            ),
            None => info!("Switching to {}", policy.name()),
        }
        ctx.active_policy = policy;
        ctx.num_tasks_scheduled = 0;
    }
}

/// Pick the registry policy whose declared distribution lies closest to the
/// distribution of the upcoming window. A collapsed window falls back to
/// bin-packing.
fn next_policy(ctx: &SchedCtx) -> (SchedPolicy, Option<f64>) {
    match task_distribution(ctx.sched_window.size, &ctx.pending) {
        Ok(dist) => (closest_policy(&ctx.registry, dist), Some(dist)),
        Err(JouleError::SingleCluster) => {
            debug!("Window collapsed to a single cluster, falling back to bin-packing");
            (SchedPolicy::BinPackSortedWatts, None)
        }
        Err(e) => {
            warn!("Task classification failed: {}, falling back to bin-packing", e);
            (SchedPolicy::BinPackSortedWatts, None)
        }
    }
}

/// Binary search over the registry (sorted ascending by declared
/// distribution). Out-of-range values clamp to the endpoints; equidistant
/// neighbours resolve to the higher index.
fn closest_policy(registry: &[SchedPolicy], dist: f64) -> SchedPolicy {
    debug_assert!(!registry.is_empty());
    let declared: Vec<f64> = registry.iter().map(|p| p.info().task_dist).collect();

    if dist <= declared[0] {
        return registry[0];
    }
    if dist >= declared[declared.len() - 1] {
        return registry[registry.len() - 1];
    }

    let high = declared.partition_point(|d| *d < dist);
    let low = high - 1;
    if declared[high] - dist <= dist - declared[low] {
        registry[high]
    } else {
        registry[low]
    }
}
