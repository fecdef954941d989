//! Per-host politeness for local crawlers
//!
//! Crawlers that hit sites from our own IP keep a minimum delay between
//! consecutive requests to the same host. The throttle is shared by every
//! local crawler instance in a run.

use crate::state::HostState;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Enforces a minimum delay between requests to the same host
#[derive(Debug)]
pub struct HostThrottle {
    min_delay: Duration,
    hosts: Mutex<HashMap<String, HostState>>,
}

impl HostThrottle {
    pub fn new(min_delay: Duration) -> Self {
        Self {
            min_delay,
            hosts: Mutex::new(HashMap::new()),
        }
    }

    pub fn min_delay(&self) -> Duration {
        self.min_delay
    }

    /// Waits until a request to `host` is allowed, then reserves the slot
    ///
    /// The slot is recorded before returning, so concurrent callers for the
    /// same host are spaced out by `min_delay`.
    pub async fn wait_turn(&self, host: &str) {
        loop {
            let wait = {
                let mut hosts = self.hosts.lock().await;
                let state = hosts.entry(host.to_string()).or_default();
                let now = Instant::now();
                match state.time_until_next_request(self.min_delay, now) {
                    None => {
                        state.record_request(now);
                        return;
                    }
                    Some(wait) => wait,
                }
            };

            tracing::trace!("Throttling {} for {:?}", host, wait);
            tokio::time::sleep(wait).await;
        }
    }

    /// Number of requests made to `host` so far
    pub async fn request_count(&self, host: &str) -> u32 {
        self.hosts
            .lock()
            .await
            .get(host)
            .map_or(0, |state| state.request_count)
    }
}
