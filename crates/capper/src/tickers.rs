use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};
use tracing::{info, warn};

use crate::rapl::RaplClient;
use crate::state::{SharedCapState, SharedHosts};

/// One firing of the cap ticker: push the current cap to every known host.
/// Returns the number of hosts successfully capped.
pub async fn cap_tick(state: &SharedCapState, hosts: &SharedHosts, client: &RaplClient) -> usize {
    let (capping, value) = {
        let s = state.lock().unwrap();
        (s.is_capping, s.cap_value)
    };
    if !capping || value <= 0.0 {
        return 0;
    }

    let percentage = value.round() as u64;
    let targets: Vec<String> = hosts.lock().unwrap().iter().cloned().collect();
    let mut pushed = 0;
    for host in targets {
        match client.cap(&host, percentage).await {
            Ok(()) => pushed += 1,
            Err(e) => warn!("Cap push to {} failed: {}", host, e),
        }
    }
    if pushed > 0 {
        info!("Capped the cluster at {}%", percentage);
    }
    pushed
}

/// One firing of the recap ticker. Pushes the recap value when recapping is
/// pending, then clears the flag regardless of delivery outcome.
pub async fn recap_tick(state: &SharedCapState, hosts: &SharedHosts, client: &RaplClient) -> usize {
    let (recapping, value) = {
        let s = state.lock().unwrap();
        (s.is_recapping, s.recap_value)
    };
    if !recapping {
        return 0;
    }

    let mut pushed = 0;
    if value > 0.0 {
        let percentage = value.round() as u64;
        let targets: Vec<String> = hosts.lock().unwrap().iter().cloned().collect();
        for host in targets {
            match client.cap(&host, percentage).await {
                Ok(()) => pushed += 1,
                Err(e) => warn!("Recap push to {} failed: {}", host, e),
            }
        }
        if pushed > 0 {
            info!("Recapped the cluster at {}%", percentage);
        }
    }
    state.lock().unwrap().is_recapping = false;
    pushed
}

pub fn start_cap_loop(
    state: SharedCapState,
    hosts: SharedHosts,
    client: Arc<RaplClient>,
    period: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        loop {
            ticker.tick().await;
            cap_tick(&state, &hosts, &client).await;
        }
    })
}

pub fn start_recap_loop(
    state: SharedCapState,
    hosts: SharedHosts,
    client: Arc<RaplClient>,
    period: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        loop {
            ticker.tick().await;
            recap_tick(&state, &hosts, &client).await;
        }
    })
}
