use std::time::{Duration, Instant};

/// Tracks requests made to one host by a local crawler
///
/// Used to keep a minimum delay between consecutive requests to the same host.
#[derive(Debug, Clone, Default)]
pub struct HostState {
    /// Number of requests made to this host
    pub request_count: u32,

    /// Timestamp of the last request to this host
    pub last_request_time: Option<Instant>,
}

impl HostState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that a request was made to this host
    pub fn record_request(&mut self, now: Instant) {
        self.request_count += 1;
        self.last_request_time = Some(now);
    }

    /// Returns None if a request can be made now, or the duration to wait otherwise
    pub fn time_until_next_request(&self, min_delay: Duration, now: Instant) -> Option<Duration> {
        let last = self.last_request_time?;
        let elapsed = now.saturating_duration_since(last);
        if elapsed < min_delay {
            Some(min_delay - elapsed)
        } else {
            None
        }
    }
}
