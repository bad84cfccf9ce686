pub mod bin_pack;
pub mod class_map;
pub mod first_fit;
pub mod max_greedy_mins;
pub mod max_min;
pub mod ranked;

use tracing::{debug, info, warn};

use joule_core::driver::{Filters, SchedulerDriver, TaskInfo};
use joule_core::types::{Offer, Resources};
use joule_core::JouleError;

use crate::ctx::SchedCtx;
use crate::offers::offer_aggregate;

/// Declared workload affinity, consulted by the switch controller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolicyInfo {
    /// Heavy-to-light task distribution this policy suits best.
    pub task_dist: f64,
    /// Average variance in per-task cpu share the policy tends to cause.
    pub var_cpu_share: f64,
}

/// The offer consumption policies. Tagged variants over one shared state
/// record ([`SchedCtx`]); each variant is a self-contained packing strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchedPolicy {
    FirstFit,
    MaxGreedyMins,
    MaxMin,
    BinPackSortedWatts,
    BinPackClassMapWatts,
    RankedProactiveCap,
}

impl SchedPolicy {
    pub fn name(self) -> &'static str {
        match self {
            SchedPolicy::FirstFit => "first-fit",
            SchedPolicy::MaxGreedyMins => "max-greedy-mins",
            SchedPolicy::MaxMin => "max-min",
            SchedPolicy::BinPackSortedWatts => "bin-packing",
            SchedPolicy::BinPackClassMapWatts => "bin-packing-classmap",
            SchedPolicy::RankedProactiveCap => "ranked-proactive-cap",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "first-fit" => Some(SchedPolicy::FirstFit),
            "max-greedy-mins" => Some(SchedPolicy::MaxGreedyMins),
            "max-min" => Some(SchedPolicy::MaxMin),
            "bin-packing" => Some(SchedPolicy::BinPackSortedWatts),
            "bin-packing-classmap" => Some(SchedPolicy::BinPackClassMapWatts),
            "ranked-proactive-cap" => Some(SchedPolicy::RankedProactiveCap),
            _ => None,
        }
    }

    pub fn info(self) -> PolicyInfo {
        match self {
            SchedPolicy::FirstFit => PolicyInfo {
                task_dist: 0.25,
                var_cpu_share: 0.9,
            },
            SchedPolicy::MaxGreedyMins => PolicyInfo {
                task_dist: 1.0,
                var_cpu_share: 0.6,
            },
            SchedPolicy::MaxMin => PolicyInfo {
                task_dist: 4.0,
                var_cpu_share: 0.35,
            },
            SchedPolicy::BinPackSortedWatts => PolicyInfo {
                task_dist: 10.0,
                var_cpu_share: 0.25,
            },
            SchedPolicy::BinPackClassMapWatts => PolicyInfo {
                task_dist: 10.0,
                var_cpu_share: 0.25,
            },
            SchedPolicy::RankedProactiveCap => PolicyInfo {
                task_dist: 10.0,
                var_cpu_share: 0.2,
            },
        }
    }

    /// Consume one batch of offers: pack tasks onto each offer in turn,
    /// launching what fits and declining the rest.
    ///
    /// A watts-lookup failure is a misconfiguration between the cluster and
    /// the workload and aborts scheduling; driver I/O failures are logged and
    /// the batch proceeds, with the status-update channel as the source of
    /// truth for what actually runs.
    pub fn consume_offers(
        self,
        ctx: &mut SchedCtx,
        driver: &mut dyn SchedulerDriver,
        offers: &[Offer],
    ) -> Result<(), JouleError> {
        debug!("{} scheduling...", self.name());
        ctx.sort_pending_by_watts();

        for offer in offers {
            if ctx.shutdown {
                info!(
                    "Done scheduling tasks: declining offer on [{}]",
                    offer.hostname
                );
                if let Err(e) = driver.decline_offer(&offer.id, Filters::long_filter()) {
                    warn!("Decline of [{}] failed: {}", offer.id, e);
                }
                info!("Number of tasks still running: {}", ctx.tasks_running);
                continue;
            }

            let launched = self.pack(ctx, offer)?;
            if launched.is_empty() {
                let (cpus, mem, watts) = offer_aggregate(offer);
                debug!(
                    "Not enough resources on [{}] to launch a task: <CPU: {}, RAM: {}, Watts: {}>",
                    offer.hostname, cpus, mem, watts
                );
                if let Err(e) = driver.decline_offer(&offer.id, Filters::default_filter()) {
                    warn!("Decline of [{}] failed: {}", offer.id, e);
                }
            } else {
                info!(
                    "Starting {} task instance(s) on [{}]",
                    launched.len(),
                    offer.hostname
                );
                if let Err(e) = driver.launch_tasks(&offer.id, launched, Filters::default_filter())
                {
                    warn!("Launch on [{}] failed: {}", offer.hostname, e);
                }
            }
            ctx.prune_pending();
        }
        Ok(())
    }

    fn pack(self, ctx: &mut SchedCtx, offer: &Offer) -> Result<Vec<TaskInfo>, JouleError> {
        match self {
            SchedPolicy::FirstFit => first_fit::pack(ctx, offer),
            SchedPolicy::MaxGreedyMins => max_greedy_mins::pack(ctx, offer),
            SchedPolicy::MaxMin => max_min::pack(ctx, offer),
            SchedPolicy::BinPackSortedWatts => bin_pack::pack(ctx, offer),
            SchedPolicy::BinPackClassMapWatts => class_map::pack(ctx, offer),
            SchedPolicy::RankedProactiveCap => ranked::pack(ctx, offer),
        }
    }
}

/// Policies eligible for window-boundary switching, ascending by declared
/// task distribution.
pub fn switching_registry() -> Vec<SchedPolicy> {
    vec![
        SchedPolicy::FirstFit,
        SchedPolicy::MaxGreedyMins,
        SchedPolicy::MaxMin,
        SchedPolicy::BinPackSortedWatts,
    ]
}

pub(crate) fn aggregate_resources(offer: &Offer) -> Resources {
    let (cpus, mem, watts) = offer_aggregate(offer);
    Resources::new(cpus, mem, watts)
}
