use joule_core::driver::TaskInfo;
use joule_core::types::{Offer, Resources};
use joule_core::JouleError;

use crate::ctx::SchedCtx;
use crate::offers::{host_mismatch, watts_to_consider};
use crate::policies::aggregate_resources;

/// Bin-packing over watts-sorted tasks: walk the queue front to back and
/// greedily consume as many instances of each task as the offer's residual
/// capacity takes before moving on.
pub(crate) fn pack(ctx: &mut SchedCtx, offer: &Offer) -> Result<Vec<TaskInfo>, JouleError> {
    let aggregate = aggregate_resources(offer);
    let mut used = Resources::default();
    let mut launched = Vec::new();

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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policies::SchedPolicy;
    use crate::tests_common::*;
    use joule_core::driver::Filters;

    #[test]
    fn test_packs_instances_up_to_capacity() {
        let mut ctx = test_ctx(vec![make_task("small", 2.0, 4000.0, 40.0, 10)]);
        let mut driver = RecordingDriver::default();
        let offers = [make_offer("o1", "a1", "h1", 10.0, 20000.0, 200.0)];

        SchedPolicy::BinPackSortedWatts
            .consume_offers(&mut ctx, &mut driver, &offers)
            .unwrap();

        // cpu, mem and watts all cap out at 5 instances.
        assert_eq!(driver.launched_instances(), 5);
        assert_eq!(ctx.pending[0].instances, 5);
        assert!(!ctx.shutdown);
    }

    #[test]
    fn test_exact_fit_closes_shutdown() {
        let mut ctx = test_ctx(vec![make_task("exact", 4.0, 8192.0, 80.0, 1)]);
        let mut driver = RecordingDriver::default();
        let offers = [make_offer("o1", "a1", "h1", 4.0, 8192.0, 80.0)];

        SchedPolicy::BinPackSortedWatts
            .consume_offers(&mut ctx, &mut driver, &offers)
            .unwrap();

        assert_eq!(driver.launched_instances(), 1);
        assert!(ctx.pending.is_empty());
        assert!(ctx.shutdown);

        // Next offer is declined with the long refusal filter.
        let later = [make_offer("o2", "a1", "h1", 4.0, 8192.0, 80.0)];
        SchedPolicy::BinPackSortedWatts
            .consume_offers(&mut ctx, &mut driver, &later)
            .unwrap();
        assert_eq!(driver.declines.len(), 1);
        assert_eq!(driver.declines[0].1, Filters::long_filter());
    }

    #[test]
    fn test_walks_queue_in_watts_order() {
        let mut ctx = test_ctx(vec![
            make_task("heavy", 1.0, 100.0, 90.0, 2),
            make_task("light", 1.0, 100.0, 10.0, 2),
        ]);
        let mut driver = RecordingDriver::default();
        // Watts only admits the two light instances plus one heavy.
        let offers = [make_offer("o1", "a1", "h1", 8.0, 8000.0, 110.0)];

        SchedPolicy::BinPackSortedWatts
            .consume_offers(&mut ctx, &mut driver, &offers)
            .unwrap();

        let names: Vec<&str> = driver.launches[0]
            .1
            .iter()
            .map(|t| t.name.as_str())
            .collect();
        assert_eq!(names, vec!["light-2", "light-1", "heavy-2"]);
    }

    #[test]
    fn test_host_mismatch_declines() {
        let mut task = make_task("pinned", 1.0, 100.0, 10.0, 1);
        task.host = "node-b".into();
        let mut ctx = test_ctx(vec![task]);
        let mut driver = RecordingDriver::default();
        let offers = [make_offer("o1", "a1", "node-a-1", 8.0, 8000.0, 100.0)];

        SchedPolicy::BinPackSortedWatts
            .consume_offers(&mut ctx, &mut driver, &offers)
            .unwrap();

        assert!(driver.launches.is_empty());
        assert_eq!(driver.declines.len(), 1);
        assert_eq!(driver.declines[0].1, Filters::default_filter());
        assert_eq!(ctx.pending[0].instances, 1);
    }

    #[test]
    fn test_watts_ignored_when_disabled() {
        let mut ctx = test_ctx(vec![make_task("hungry", 1.0, 100.0, 500.0, 1)]);
        ctx.watts_as_a_resource = false;
        let mut driver = RecordingDriver::default();
        let offers = [make_offer("o1", "a1", "h1", 8.0, 8000.0, 100.0)];

        SchedPolicy::BinPackSortedWatts
            .consume_offers(&mut ctx, &mut driver, &offers)
            .unwrap();

        assert_eq!(driver.launched_instances(), 1);
    }

    #[test]
    fn test_unknown_class_aborts() {
        let mut ctx = test_ctx(vec![make_task("t", 1.0, 100.0, 10.0, 1)]);
        ctx.class_map_watts = true;
        let mut driver = RecordingDriver::default();
        let offers = [make_classed_offer("o1", "a1", "h1", 8.0, 8000.0, 100.0, "A")];

        let err = SchedPolicy::BinPackSortedWatts
            .consume_offers(&mut ctx, &mut driver, &offers)
            .unwrap_err();
        assert!(matches!(err, JouleError::UnknownPowerClass { .. }));
    }
}
