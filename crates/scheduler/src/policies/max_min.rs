use joule_core::driver::TaskInfo;
use joule_core::types::{Offer, Resources};
use joule_core::JouleError;

use crate::ctx::SchedCtx;
use crate::offers::{host_mismatch, watts_to_consider};
use crate::policies::aggregate_resources;

/// Max-min: place a single instance of the heaviest task that fits, then fill
/// the rest of the offer with light tasks one instance per entry per pass,
/// repeating passes until nothing more fits. The back-to-front scan for the
/// heavy instance means that among equally heavy tasks the later one in the
/// stable watts order wins.
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

    loop {
        let mut placed = false;
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
                placed = true;
            }
        }
        if !placed {
            break;
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
    fn test_heaviest_first_then_light_fill() {
        let mut ctx = test_ctx(vec![
            make_task("light", 1.0, 100.0, 10.0, 4),
            make_task("heavy", 2.0, 200.0, 100.0, 2),
        ]);
        let mut driver = RecordingDriver::default();
        // Watts 140: one heavy (100) plus all four lights (40).
        let offers = [make_offer("o1", "g1", "h1", 16.0, 16000.0, 140.0)];

        SchedPolicy::MaxMin
            .consume_offers(&mut ctx, &mut driver, &offers)
            .unwrap();

        let names: Vec<&str> = driver.launches[0]
            .1
            .iter()
            .map(|t| t.name.as_str())
            .collect();
        assert_eq!(names[0], "heavy-2");
        assert_eq!(names.len(), 5);
        assert_eq!(ctx.pending.len(), 1);
        assert_eq!(ctx.pending[0].name, "heavy");
        assert_eq!(ctx.pending[0].instances, 1);
    }

    #[test]
    fn test_fill_alternates_entries_per_pass() {
        let mut ctx = test_ctx(vec![
            make_task("a", 1.0, 100.0, 10.0, 2),
            make_task("b", 1.0, 100.0, 20.0, 2),
        ]);
        let mut driver = RecordingDriver::default();
        // No heavy instance fits the watts budget twice over; budget takes
        // the heavy (b) once, then alternates a, b, a.
        let offers = [make_offer("o1", "g1", "h1", 16.0, 16000.0, 60.0)];

        SchedPolicy::MaxMin
            .consume_offers(&mut ctx, &mut driver, &offers)
            .unwrap();

        let names: Vec<&str> = driver.launches[0]
            .1
            .iter()
            .map(|t| t.name.as_str())
            .collect();
        // Heavy first, then one instance per entry per fill pass.
        assert_eq!(names, vec!["b-2", "a-2", "b-1", "a-1"]);
        assert!(ctx.pending.is_empty());
    }

    #[test]
    fn test_later_of_equal_heavies_preferred() {
        let mut ctx = test_ctx(vec![
            make_task("first", 1.0, 100.0, 50.0, 1),
            make_task("second", 1.0, 100.0, 50.0, 1),
        ]);
        let mut driver = RecordingDriver::default();
        let offers = [make_offer("o1", "g1", "h1", 1.0, 100.0, 50.0)];

        SchedPolicy::MaxMin
            .consume_offers(&mut ctx, &mut driver, &offers)
            .unwrap();

        assert_eq!(driver.launches[0].1[0].name, "second-1");
    }
}
