use tracing::warn;

use joule_core::driver::TaskInfo;
use joule_core::types::{Offer, Resources};
use joule_core::JouleError;

use crate::ctx::SchedCtx;
use crate::offers::{host_mismatch, watts_to_consider};
use crate::policies::aggregate_resources;

/// Proactive cluster-wide capping over ranked tasks.
///
/// Sorting the queue ascending by watts up front means the tasks left
/// unplaced are exactly the power-hungry ones, which keeps the determined cap
/// meaningful. Scheduling itself is ascending-watts first-fit, one instance
/// per offer; every successful fit feeds the capper and publishes the fresh
/// cap for the ticker to push.
pub(crate) fn pack(ctx: &mut SchedCtx, offer: &Offer) -> Result<Vec<TaskInfo>, JouleError> {
    let aggregate = aggregate_resources(offer);
    let mut used = Resources::default();
    let mut launched = Vec::new();

    for index in 0..ctx.pending.len() {
        if ctx.pending[index].instances == 0 {
            continue;
        }
        if host_mismatch(&offer.hostname, &ctx.pending[index].host) {
            continue;
        }
        let watts = watts_to_consider(&ctx.pending[index], ctx.class_map_watts, offer)?;
        if !ctx.fits(aggregate, &used, &ctx.pending[index], watts) {
            continue;
        }

        {
            let mut cap = ctx.cap_state.lock().unwrap();
            if !cap.is_capping {
                cap.is_capping = true;
            }
        }

        launched.push(ctx.claim_instance(offer, index, watts, &mut used));

        // The launch snapshot just recorded for this host carries the task id
        // the capper tracks.
        let snapshot = ctx
            .task_monitor
            .get(&offer.hostname)
            .and_then(|tasks| tasks.last())
            .cloned();
        if let Some(snapshot) = snapshot {
            match ctx
                .capper
                .proactive_determined_cap(&ctx.total_power, &snapshot)
            {
                Ok(cap) => ctx.cap_state.lock().unwrap().cap_value = cap,
                Err(e) => warn!("Failed to determine new cluster-wide cap: {}", e),
            }
        }
        break;
    }

    Ok(launched)
}
