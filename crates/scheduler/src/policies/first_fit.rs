use joule_core::driver::TaskInfo;
use joule_core::types::{Offer, Resources};
use joule_core::JouleError;

use crate::ctx::SchedCtx;
use crate::offers::{host_mismatch, watts_to_consider};
use crate::policies::aggregate_resources;

/// First-fit: walk the queue front to back placing at most one instance per
/// task on the offer, moving on whether or not another copy would still fit.
/// Spreads instances across offers instead of packing them.
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

        if ctx.fits(aggregate, &used, &ctx.pending[index], watts) {
            launched.push(ctx.claim_instance(offer, index, watts, &mut used));
        }
    }

    Ok(launched)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policies::SchedPolicy;
    use crate::tests_common::*;

    #[test]
    fn test_one_instance_per_task_per_offer() {
        let mut ctx = test_ctx(vec![
            make_task("a", 1.0, 100.0, 10.0, 4),
            make_task("b", 1.0, 100.0, 20.0, 4),
        ]);
        let mut driver = RecordingDriver::default();
        let offers = [make_offer("o1", "g1", "h1", 8.0, 8000.0, 200.0)];

        SchedPolicy::FirstFit
            .consume_offers(&mut ctx, &mut driver, &offers)
            .unwrap();

        // Plenty of room, but first-fit takes a single copy of each task.
        assert_eq!(driver.launched_instances(), 2);
        assert_eq!(ctx.pending[0].instances, 3);
        assert_eq!(ctx.pending[1].instances, 3);
    }

    #[test]
    fn test_spreads_across_offer_batch() {
        let mut ctx = test_ctx(vec![make_task("a", 1.0, 100.0, 10.0, 3)]);
        let mut driver = RecordingDriver::default();
        let offers = [
            make_offer("o1", "g1", "h1", 8.0, 8000.0, 200.0),
            make_offer("o2", "g2", "h2", 8.0, 8000.0, 200.0),
            make_offer("o3", "g3", "h3", 8.0, 8000.0, 200.0),
        ];

        SchedPolicy::FirstFit
            .consume_offers(&mut ctx, &mut driver, &offers)
            .unwrap();

        assert_eq!(driver.launches.len(), 3);
        for (_, tasks, _) in &driver.launches {
            assert_eq!(tasks.len(), 1);
        }
        assert!(ctx.pending.is_empty());
        assert!(ctx.shutdown);
    }

    #[test]
    fn test_skips_tasks_that_do_not_fit() {
        let mut ctx = test_ctx(vec![
            make_task("small", 1.0, 100.0, 10.0, 1),
            make_task("big", 16.0, 100.0, 20.0, 1),
        ]);
        let mut driver = RecordingDriver::default();
        let offers = [make_offer("o1", "g1", "h1", 8.0, 8000.0, 200.0)];

        SchedPolicy::FirstFit
            .consume_offers(&mut ctx, &mut driver, &offers)
            .unwrap();

        assert_eq!(driver.launched_instances(), 1);
        assert_eq!(ctx.pending.len(), 1);
        assert_eq!(ctx.pending[0].name, "big");
    }
}
