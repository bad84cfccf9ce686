use joule_core::driver::SchedulerDriver;
use joule_core::types::{Offer, StatusUpdate};
use joule_core::JouleError;

/// The callback surface the framework SDK drives, delivered serially.
///
/// Only `resource_offers`, `status_update` and `disconnected` carry real
/// semantics; the remaining callbacks exist so the SDK has somewhere to
/// report, and implementations just log them.
pub trait FrameworkEvents {
    fn registered(&mut self, framework_id: &str, master: &str);
    fn reregistered(&mut self, master: &str);
    fn disconnected(&mut self);

    /// Consume one batch of resource offers. Errors out of here are
    /// unrecoverable misconfigurations and terminate the framework.
    fn resource_offers(
        &mut self,
        driver: &mut dyn SchedulerDriver,
        offers: &[Offer],
    ) -> Result<(), JouleError>;

    fn status_update(&mut self, status: &StatusUpdate);

    fn offer_rescinded(&mut self, offer_id: &str);
    fn slave_lost(&mut self, agent_id: &str);
    fn executor_lost(&mut self, executor_id: &str, agent_id: &str, status: i32);
    fn framework_message(&mut self, executor_id: &str, agent_id: &str, message: &str);
    fn error(&mut self, message: &str);
}
