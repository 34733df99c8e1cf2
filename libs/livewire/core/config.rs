use std::time::Duration;

/// Default delay between an unexpected close and the next attempt
pub const DEFAULT_RECONNECT_INTERVAL: Duration = Duration::from_millis(3000);

/// Default number of reconnect attempts before giving up
pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: usize = 10;

/// Fixed-delay, attempt-capped reconnection policy
///
/// Always waits the same amount of time between attempts and stops once
/// `max_attempts` consecutive attempts have been scheduled without an open
/// in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    interval: Duration,
    max_attempts: usize,
}

impl ReconnectPolicy {
    /// Create a new fixed delay policy
    ///
    /// # Arguments
    /// * `interval` - The fixed delay between reconnects
    /// * `max_attempts` - Maximum number of consecutive attempts (0 = never reconnect)
    pub fn new(interval: Duration, max_attempts: usize) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }

    /// A policy that never schedules a reconnect
    pub fn never() -> Self {
        Self::new(Duration::ZERO, 0)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    /// Delay before the next attempt, given how many were already scheduled
    ///
    /// # Returns
    /// * `Some(duration)` - Wait this long before reconnecting
    /// * `None` - Budget exhausted, stop reconnecting
    pub fn next_delay(&self, attempts_so_far: usize) -> Option<Duration> {
        if self.should_reconnect(attempts_so_far) {
            Some(self.interval)
        } else {
            None
        }
    }

    /// Check if another attempt is still within budget
    pub fn should_reconnect(&self, attempts_so_far: usize) -> bool {
        attempts_so_far < self.max_attempts
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_RECONNECT_INTERVAL, DEFAULT_MAX_RECONNECT_ATTEMPTS)
    }
}

/// Configuration for one channel's connection manager
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelConfig {
    /// Full WebSocket URL (ws:// or wss://)
    pub url: String,

    /// Reconnection policy applied after unexpected closes
    pub reconnect: ReconnectPolicy,
}

impl ChannelConfig {
    /// Configuration with default reconnect settings (3000 ms, 10 attempts)
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            reconnect: ReconnectPolicy::default(),
        }
    }

    pub fn with_reconnect(mut self, reconnect: ReconnectPolicy) -> Self {
        self.reconnect = reconnect;
        self
    }

    /// Get a reference to the URL
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn reconnect_interval(&self) -> Duration {
        self.reconnect.interval()
    }

    pub fn max_reconnect_attempts(&self) -> usize {
        self.reconnect.max_attempts()
    }
}
