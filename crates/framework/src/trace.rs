use std::path::Path;

use serde::Deserialize;
use tracing::info;

use joule_core::driver::{Filters, SchedulerDriver, TaskInfo};
use joule_core::types::{Offer, StatusUpdate};
use joule_core::JouleError;

use crate::adapter::JouleScheduler;
use crate::events::FrameworkEvents;

/// One recorded framework event. Traces are JSON arrays of these, replayed
/// in order against the adapter exactly as a live driver would deliver them.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TraceEvent {
    Offers { offers: Vec<Offer> },
    Status { status: StatusUpdate },
}

pub fn load_trace(path: &Path) -> Result<Vec<TraceEvent>, JouleError> {
    let contents = std::fs::read_to_string(path)?;
    let events: Vec<TraceEvent> = serde_json::from_str(&contents)?;
    Ok(events)
}

/// Driver standing in for the SDK during trace replay: every outbound call
/// is logged and counted, nothing goes over the wire.
#[derive(Debug, Default)]
pub struct LoggingDriver {
    pub launched: usize,
    pub declined: usize,
}

impl SchedulerDriver for LoggingDriver {
    fn launch_tasks(
        &mut self,
        offer_id: &str,
        tasks: Vec<TaskInfo>,
        _filters: Filters,
    ) -> Result<(), JouleError> {
        for task in &tasks {
            info!("LAUNCH {} on offer {} ({})", task.task_id, offer_id, task.agent_id);
        }
        self.launched += tasks.len();
        Ok(())
    }

    fn decline_offer(&mut self, offer_id: &str, filters: Filters) -> Result<(), JouleError> {
        info!(
            "DECLINE offer {} (refuse {}s)",
            offer_id, filters.refuse_seconds
        );
        self.declined += 1;
        Ok(())
    }
}

pub fn replay(
    scheduler: &mut JouleScheduler,
    driver: &mut LoggingDriver,
    events: &[TraceEvent],
) -> Result<(), JouleError> {
    for event in events {
        match event {
            TraceEvent::Offers { offers } => scheduler.resource_offers(driver, offers)?,
            TraceEvent::Status { status } => scheduler.status_update(status),
        }
    }
    Ok(())
}
