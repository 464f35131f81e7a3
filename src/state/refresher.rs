use crate::state::messages::NetworkRequest;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::sleep;

/// No matter what is configured, never poll the proxy faster than this.
pub const MIN_INTERVAL: Duration = Duration::from_secs(8);

/// Upper bound of the random delay added to each interval.
pub const MAX_JITTER: Duration = Duration::from_millis(500);

/// Periodic board refresh. The startup cycle is triggered by `AppStarted`, so
/// the first request goes out one interval later.
pub struct PeriodicRefresher {
    network_requests: mpsc::Sender<NetworkRequest>,
    interval: Duration,
}

impl PeriodicRefresher {
    pub fn new(network_requests: mpsc::Sender<NetworkRequest>, interval: Duration) -> Self {
        Self { network_requests, interval }
    }

    pub async fn run(self) {
        loop {
            sleep(next_delay(self.interval, random_jitter())).await;
            if self
                .network_requests
                .send(NetworkRequest::Refresh { manual: false })
                .await
                .is_err()
            {
                break;
            }
        }
    }
}

pub fn effective_interval(configured: Duration) -> Duration {
    configured.max(MIN_INTERVAL)
}

pub fn next_delay(configured: Duration, jitter: Duration) -> Duration {
    effective_interval(configured) + jitter.min(MAX_JITTER)
}

fn random_jitter() -> Duration {
    Duration::from_millis(fastrand::u64(0..=MAX_JITTER.as_millis() as u64))
}
