//! Retry policy for calls to other services.
//!
//! Holds the attempt budget and the pause between attempts. Callers own the
//! loop so they can log each attempt the way their operation needs.

use std::time::Duration;
use tokio::time::sleep;

/// Configuration for retry behavior.
#[derive(Clone, Debug, PartialEq)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (not including the initial attempt).
    pub max_retries: u32,
    /// Pause before the first retry. Zero retries immediately.
    pub initial_backoff: Duration,
    /// Upper bound for any single pause.
    pub max_backoff: Duration,
    /// Growth factor applied per attempt.
    pub backoff_multiplier: f64,
    /// Whether to add up to 25% jitter to each pause.
    pub add_jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(10),
            backoff_multiplier: 2.0,
            add_jitter: true,
        }
    }
}

impl RetryConfig {
    /// Retry back-to-back with no pause between attempts.
    pub fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
            backoff_multiplier: 1.0,
            add_jitter: false,
        }
    }

    /// Exponential backoff starting at `initial_backoff`.
    pub fn exponential(max_retries: u32, initial_backoff: Duration) -> Self {
        Self {
            max_retries,
            initial_backoff,
            ..Default::default()
        }
    }

    /// Backoff before retry number `attempt` (1-based).
    pub fn backoff_duration(&self, attempt: u32) -> Duration {
        if self.initial_backoff.is_zero() {
            return Duration::ZERO;
        }

        let exponent = attempt.saturating_sub(1) as i32;
        let backoff =
            self.initial_backoff.as_millis() as f64 * self.backoff_multiplier.powi(exponent);
        let backoff_ms = backoff.min(self.max_backoff.as_millis() as f64) as u64;

        let mut duration = Duration::from_millis(backoff_ms);

        if self.add_jitter {
            let jitter = (backoff_ms as f64 * 0.25 * rand_jitter()) as u64;
            duration += Duration::from_millis(jitter);
        }

        duration
    }

    /// Sleep for the backoff of retry number `attempt`. Returns immediately
    /// when the policy has no backoff.
    pub async fn pause(&self, attempt: u32) {
        let backoff = self.backoff_duration(attempt);
        if !backoff.is_zero() {
            sleep(backoff).await;
        }
    }
}

/// Simple pseudo-random jitter (0.0 to 1.0) without external dependencies.
fn rand_jitter() -> f64 {
    use std::time::SystemTime;
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos();
    (nanos % 1000) as f64 / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_config_default() {
        let config = RetryConfig::default();
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.initial_backoff, Duration::from_millis(100));
    }

    #[test]
    fn test_immediate_has_no_backoff() {
        let config = RetryConfig::immediate(5);
        assert_eq!(config.max_retries, 5);
        for attempt in 1..=5 {
            assert_eq!(config.backoff_duration(attempt), Duration::ZERO);
        }
    }

    #[test]
    fn test_backoff_duration() {
        let config = RetryConfig {
            add_jitter: false,
            ..Default::default()
        };

        assert_eq!(config.backoff_duration(1), Duration::from_millis(100));
        assert_eq!(config.backoff_duration(2), Duration::from_millis(200));
        assert_eq!(config.backoff_duration(3), Duration::from_millis(400));
    }

    #[test]
    fn test_backoff_is_capped() {
        let config = RetryConfig {
            max_backoff: Duration::from_millis(250),
            add_jitter: false,
            ..Default::default()
        };

        assert_eq!(config.backoff_duration(10), Duration::from_millis(250));
    }

    #[test]
    fn test_jitter_stays_within_a_quarter() {
        let config = RetryConfig::exponential(3, Duration::from_millis(100));
        let backoff = config.backoff_duration(1);
        assert!(backoff >= Duration::from_millis(100));
        assert!(backoff <= Duration::from_millis(125));
    }

    #[tokio::test]
    async fn test_pause_returns_immediately_without_backoff() {
        let start = std::time::Instant::now();
        RetryConfig::immediate(1).pause(1).await;
        assert!(start.elapsed() < Duration::from_millis(50));
    }
}
