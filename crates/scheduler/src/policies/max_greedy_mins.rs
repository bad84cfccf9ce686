use joule_core::driver::TaskInfo;
use joule_core::types::{Offer, Resources};
use joule_core::JouleError;

use crate::ctx::SchedCtx;
use crate::offers::{host_mismatch, watts_to_consider};
use crate::policies::aggregate_resources;

/// Max-greedy-mins: like max-min, place one instance of the heaviest fitting
/// task first, but then pack aggressively — a single front-to-back pass that
/// keeps consuming instances of each light task until it no longer fits
/// before advancing to the next entry.
pub(crate) fn pack(ctx: &mut SchedCtx, offer: &Offer) -> Result<Vec<TaskInfo>, JouleError> {
    let aggregate = aggregate_resources(offer);
    let mut used = Resources::default();
    let mut launched = Vec::new();

    for index in (0..ctx.pending.len()).rev() {
        if ctx.pending[index].instances == 0 {
            continue;
        }
        if host_mismatch(&offer.hostname, &ctx.pending[index].host) {
            continue;
        }
        let watts = watts_to_consider(&ctx.pending[index], ctx.class_map_watts, offer)?;
        if ctx.fits(aggregate, &used, &ctx.pending[index], watts) {
            launched.push(ctx.claim_instance(offer, index, watts, &mut used));
            break;
        }
    }

    for index in 0..ctx.pending.len() {
        if host_mismatch(&offer.hostname, &ctx.pending[index].host) {
            continue;
        }
        let watts = watts_to_consider(&ctx.pending[index], ctx.class_map_watts, offer)?;
        while ctx.pending[index].instances > 0
            && ctx.fits(aggregate, &used, &ctx.pending[index], watts)
        {
            launched.push(ctx.claim_instance(offer, index, watts, &mut used));
        }
    }

    Ok(launched)
}
