use thiserror::Error;

#[derive(Error, Debug)]
pub enum JouleError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("workload parse error: {0}")]
    Workload(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("task {task} has no watts entry for power class {class}")]
    UnknownPowerClass { task: String, class: String },

    #[error("tasks in the scheduling window collapsed into a single cluster")]
    SingleCluster,

    #[error("invalid scheduling window: {0}")]
    InvalidWindow(String),

    #[error("driver error: {0}")]
    Driver(String),

    #[error("capper error: {0}")]
    Capper(String),

    #[error("RAPL error: {0}")]
    Rapl(String),

    #[error("cap percentage must be in (0, 100]: {0}")]
    InvalidPercentage(i64),
}
