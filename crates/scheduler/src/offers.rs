use joule_core::types::{Offer, Task};
use joule_core::JouleError;

/// Sum an offer's scalar resources into a (cpus, mem, watts) aggregate.
/// Resource names other than the three schedulable ones are ignored.
pub fn offer_aggregate(offer: &Offer) -> (f64, f64, f64) {
    let mut cpus = 0.0;
    let mut mem = 0.0;
    let mut watts = 0.0;
    for resource in &offer.resources {
        match resource.name.as_str() {
            "cpus" => cpus += resource.value,
            "mem" => mem += resource.value,
            "watts" => watts += resource.value,
            _ => {}
        }
    }
    (cpus, mem, watts)
}

/// True iff the task constrains its host and the offer's hostname does not
/// start with that prefix.
pub fn host_mismatch(offer_host: &str, task_prefix: &str) -> bool {
    !task_prefix.is_empty() && !offer_host.starts_with(task_prefix)
}

/// The watts figure to account for when fitting `task` onto `offer`.
///
/// With the class map enabled and a classed offer, the task must carry an
/// entry for that class; a missing entry means the cluster and the workload
/// definitions disagree, which is unrecoverable.
pub fn watts_to_consider(
    task: &Task,
    class_map_watts: bool,
    offer: &Offer,
) -> Result<f64, JouleError> {
    if class_map_watts {
        if let Some(class) = offer.power_class() {
            return task
                .watts_of_class(class)
                .ok_or_else(|| JouleError::UnknownPowerClass {
                    task: task.name.clone(),
                    class: class.to_string(),
                });
        }
    }
    Ok(task.watts)
}
