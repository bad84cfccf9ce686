use joule_core::driver::TaskInfo;
use joule_core::types::{Offer, Resources};
use joule_core::JouleError;

use crate::ctx::SchedCtx;
use crate::offers::{host_mismatch, watts_to_consider};
use crate::policies::aggregate_resources;

/// Bin-packing with the class-map watts lookup forced on: the watts charged
/// against the offer always come from the task's per-class table when the
/// node advertises a power class, regardless of the global class-map flag.
pub(crate) fn pack(ctx: &mut SchedCtx, offer: &Offer) -> Result<Vec<TaskInfo>, JouleError> {
    let aggregate = aggregate_resources(offer);
    let mut used = Resources::default();
    let mut launched = Vec::new();

    for index in 0..ctx.pending.len() {
        if host_mismatch(&offer.hostname, &ctx.pending[index].host) {
            continue;
        }
        let watts = watts_to_consider(&ctx.pending[index], true, offer)?;

        while ctx.pending[index].instances > 0
            && ctx.fits(aggregate, &used, &ctx.pending[index], watts)
        {
            launched.push(ctx.claim_instance(offer, index, watts, &mut used));
        }
    }

    Ok(launched)
}
