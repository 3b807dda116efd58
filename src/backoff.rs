use std::time::Duration;

use crate::config::ChannelConfig;

/// Reconnect delay calculator with exponential growth, random jitter and a ceiling
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Backoff {
    base: Duration,
    max: Duration,
    jitter: Duration,
}

impl Backoff {
    /// A `max` below `base` is raised to `base`
    pub fn new(base: Duration, max: Duration, jitter: Duration) -> Self {
        Self {
            base,
            max: max.max(base),
            jitter,
        }
    }

    pub fn from_config(config: &ChannelConfig) -> Self {
        Self::new(
            config.reconnect_base,
            config.reconnect_max,
            config.reconnect_jitter,
        )
    }

    /// `base * 2^attempt`, saturating, before jitter and ceiling
    pub fn base_delay(&self, attempt: u32) -> Duration {
        self.delay_with_jitter(attempt, Duration::ZERO)
    }

    /// Delay for `attempt` with an explicit jitter value
    pub fn delay_with_jitter(&self, attempt: u32, jitter: Duration) -> Duration {
        let base_ms = self.base.as_millis() as u64;
        let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
        let raw = base_ms
            .saturating_mul(factor)
            .saturating_add(jitter.as_millis() as u64);
        Duration::from_millis(raw).min(self.max)
    }

    /// Delay for `attempt` with jitter drawn uniformly from `[0, jitter)`
    pub fn delay(&self, attempt: u32) -> Duration {
        let jitter_ms = match self.jitter.as_millis() as u64 {
            0 => 0,
            bound => rand::random::<u64>() % bound,
        };
        self.delay_with_jitter(attempt, Duration::from_millis(jitter_ms))
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::from_config(&ChannelConfig::default())
    }
}
