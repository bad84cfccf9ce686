use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};
use uuid::Uuid;

use joule_core::config::load_config;
use joule_core::workload::load_workload;
use joule_framework::trace::{self, LoggingDriver};
use joule_framework::{FrameworkEvents, JouleScheduler};

#[derive(Parser)]
#[command(name = "joule", about = "Power-aware batch scheduler for offer-based clusters")]
struct Cli {
    /// JSON task-definition file forming the pending queue
    #[arg(short, long)]
    workload: PathBuf,

    /// Offer/status trace to replay through the scheduler
    #[arg(short, long)]
    trace: PathBuf,

    #[arg(long, help = "Path to config file")]
    config: Option<String>,

    /// Enable switching between scheduling policies at window boundaries
    #[arg(long)]
    sched_pol_switch: bool,

    /// Fix the scheduling window to this many task instances
    #[arg(long)]
    fixed_window: Option<usize>,

    /// Name of the first scheduling policy to deploy
    #[arg(long)]
    first_policy: Option<String>,

    /// Treat watts as a schedulable resource
    #[arg(long)]
    watts_as_a_resource: bool,

    /// Look task watts up through the offer's power class
    #[arg(long)]
    classmap_watts: bool,

    /// Port the per-node RAPL daemons listen on
    #[arg(long)]
    rapl_port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| {
            "joule=info,joule_framework=info,joule_scheduler=info,joule_capper=info".into()
        }))
        .init();

    let cli = Cli::parse();

    let mut config = cli
        .config
        .as_deref()
        .map(load_config)
        .unwrap_or_default();
    if cli.sched_pol_switch {
        config.scheduling.policy_switching = true;
    }
    if cli.fixed_window.is_some() {
        config.scheduling.fixed_window_size = cli.fixed_window;
    }
    if cli.first_policy.is_some() {
        config.scheduling.first_policy = cli.first_policy.clone();
    }
    if cli.watts_as_a_resource {
        config.scheduling.watts_as_a_resource = true;
    }
    if cli.classmap_watts {
        config.scheduling.class_map_watts = true;
    }
    if let Some(port) = cli.rapl_port {
        config.capping.rapl_port = port;
    }

    let tasks = load_workload(&cli.workload)?;
    info!(
        "Loaded {} task definitions from {}",
        tasks.len(),
        cli.workload.display()
    );

    let mut scheduler = JouleScheduler::new(&config, tasks)?;
    scheduler.start_capping_loops(&config);
    scheduler.registered(&format!("joule-{}", Uuid::new_v4()), "trace-replay");

    let events = trace::load_trace(&cli.trace)?;
    let mut driver = LoggingDriver::default();
    let done = scheduler.done();
    trace::replay(&mut scheduler, &mut driver, &events)?;

    info!(
        "Trace replay finished: {} instances launched, {} offers declined",
        driver.launched, driver.declined
    );
    {
        let cap = scheduler.ctx.cap_state.lock().unwrap();
        if cap.cap_value > 0.0 {
            info!("Final determined cap: {:.1}%", cap.cap_value);
        }
        if cap.recap_value > 0.0 {
            info!("Final recap value: {:.1}%", cap.recap_value);
        }
    }

    if *done.borrow() {
        info!("All launched tasks reached a terminal state");
    } else {
        warn!(
            "Trace ended with work outstanding: {} pending entries, {} running",
            scheduler.ctx.pending.len(),
            scheduler.ctx.tasks_running
        );
    }
    scheduler.disconnected();

    Ok(())
}
