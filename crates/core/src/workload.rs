use std::path::Path;

use crate::error::JouleError;
use crate::types::Task;

/// Parse a workload definition from its JSON text.
///
/// The file is an ordered array of task records; order is preserved because
/// the scheduler treats it as the initial pending queue.
pub fn parse_workload(json: &str) -> Result<Vec<Task>, JouleError> {
    let tasks: Vec<Task> = serde_json::from_str(json)?;

    if tasks.is_empty() {
        return Err(JouleError::Config("workload contains no tasks".into()));
    }

    for task in &tasks {
        validate(task)?;
    }

    Ok(tasks)
}

/// Load and validate the task-definition file supplied at startup.
pub fn load_workload(path: &Path) -> Result<Vec<Task>, JouleError> {
    let contents = std::fs::read_to_string(path)?;
    parse_workload(&contents)
}

fn validate(task: &Task) -> Result<(), JouleError> {
    if task.name.is_empty() {
        return Err(JouleError::Config("task with empty name".into()));
    }
    if task.cpu <= 0.0 || task.ram <= 0.0 {
        return Err(JouleError::Config(format!(
            "task {} declares non-positive cpu or ram",
            task.name
        )));
    }
    if task.watts < 0.0 {
        return Err(JouleError::Config(format!(
            "task {} declares negative watts",
            task.name
        )));
    }
    if task.instances == 0 {
        return Err(JouleError::Config(format!(
            "task {} declares zero instances",
            task.name
        )));
    }
    Ok(())
}
