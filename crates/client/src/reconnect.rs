//! Linear reconnect backoff

use std::time::Duration;

use contracts::ReconnectConfig;

/// `min(max_ms, base_ms + attempts * step_ms)`, attempts reset on connect
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    config: ReconnectConfig,
    attempts: u32,
}

impl ReconnectPolicy {
    pub fn new(config: ReconnectConfig) -> Self {
        Self {
            config,
            attempts: 0,
        }
    }

    /// Delay before the next attempt; counts the attempt.
    pub fn next_delay(&mut self) -> Duration {
        let ms = self
            .config
            .step_ms
            .saturating_mul(u64::from(self.attempts))
            .saturating_add(self.config.base_ms)
            .min(self.config.max_ms);
        self.attempts = self.attempts.saturating_add(1);
        Duration::from_millis(ms)
    }

    /// Connection established
    pub fn reset(&mut self) {
        self.attempts = 0;
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_then_capped() {
        let mut policy = ReconnectPolicy::new(ReconnectConfig::default());
        let delays: Vec<u64> = (0..12)
            .map(|_| policy.next_delay().as_millis() as u64)
            .collect();
        assert_eq!(
            delays,
            vec![500, 1000, 1500, 2000, 2500, 3000, 3500, 4000, 4500, 5000, 5000, 5000]
        );
    }

    #[test]
    fn test_reset_restarts_sequence() {
        let mut policy = ReconnectPolicy::new(ReconnectConfig::default());
        policy.next_delay();
        policy.next_delay();
        assert_eq!(policy.attempts(), 2);

        policy.reset();
        assert_eq!(policy.next_delay(), Duration::from_millis(500));
    }
}
