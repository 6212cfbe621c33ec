//! Reconnection Policy
//!
//! Exponential backoff for re-establishing the gallery connection. The delay
//! starts at the base delay, doubles after every failed attempt, is capped
//! at the maximum delay, and resets to the base after a successful open.
//! Jitter is available but off by default.

use std::time::Duration;

use rand::Rng;

/// Configuration for reconnection behavior.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Delay before the first reconnection attempt after an open connection drops.
    pub base_delay: Duration,
    /// Maximum delay between reconnection attempts.
    pub max_delay: Duration,
    /// Multiplier for exponential backoff (e.g., 2.0 doubles delay each attempt).
    pub multiplier: f64,
    /// Jitter factor as a fraction (e.g., 0.1 = ±10% randomization).
    pub jitter_factor: f64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_millis(3000),
            multiplier: 2.0,
            jitter_factor: 0.0,
        }
    }
}

impl ReconnectConfig {
    /// Create a new configuration with custom values.
    #[must_use]
    pub const fn new(
        base_delay: Duration,
        max_delay: Duration,
        multiplier: f64,
        jitter_factor: f64,
    ) -> Self {
        Self {
            base_delay,
            max_delay,
            multiplier,
            jitter_factor,
        }
    }

    /// Create configuration from `FeedSettings`.
    #[must_use]
    pub const fn from_feed_settings(settings: &crate::FeedSettings) -> Self {
        Self {
            base_delay: settings.reconnect_delay_base,
            max_delay: settings.reconnect_delay_max,
            multiplier: settings.reconnect_delay_multiplier,
            jitter_factor: settings.reconnect_jitter,
        }
    }
}

/// Reconnection policy implementing capped exponential backoff.
///
/// # Example
///
/// ```rust
/// use gallery_feed::infrastructure::backend::reconnect::{ReconnectConfig, ReconnectPolicy};
/// use std::time::Duration;
///
/// let mut policy = ReconnectPolicy::new(ReconnectConfig::default());
///
/// assert_eq!(policy.next_delay(), Duration::from_millis(500));
/// assert_eq!(policy.next_delay(), Duration::from_millis(1000));
///
/// // Successful open
/// policy.reset();
/// assert_eq!(policy.next_delay(), Duration::from_millis(500));
/// ```
#[derive(Debug)]
pub struct ReconnectPolicy {
    config: ReconnectConfig,
    current_delay: Duration,
    attempt_count: u32,
}

impl ReconnectPolicy {
    /// Create a new reconnection policy.
    ///
    /// A multiplier below 1.0 (or NaN) is raised to 1.0 so delays never shrink.
    #[must_use]
    pub fn new(mut config: ReconnectConfig) -> Self {
        config.multiplier = config.multiplier.max(1.0);
        let base_delay = config.base_delay.min(config.max_delay);
        Self {
            config,
            current_delay: base_delay,
            attempt_count: 0,
        }
    }

    /// Get the delay before the next attempt and advance the backoff.
    ///
    /// After `k` calls without a [`reset`](Self::reset), the returned delay is
    /// `min(base * multiplier^k, max)` (before jitter).
    #[must_use]
    pub fn next_delay(&mut self) -> Duration {
        self.attempt_count = self.attempt_count.saturating_add(1);

        let delay_with_jitter = self.apply_jitter(self.current_delay);

        #[allow(clippy::cast_precision_loss)]
        let scaled = (self.current_delay.as_millis() as f64 * self.config.multiplier).round();
        let next_millis = if scaled.is_finite() && scaled > 0.0 {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            {
                scaled as u128
            }
        } else {
            0
        };
        let max_millis = self.config.max_delay.as_millis();
        let capped = next_millis.min(max_millis);
        let capped_u64 = u64::try_from(capped).unwrap_or(u64::MAX);
        self.current_delay = Duration::from_millis(capped_u64);

        delay_with_jitter
    }

    /// Reset the policy after a successful connection.
    pub fn reset(&mut self) {
        self.current_delay = self.config.base_delay.min(self.config.max_delay);
        self.attempt_count = 0;
    }

    /// Number of delays handed out since the last reset.
    #[must_use]
    pub const fn attempt_count(&self) -> u32 {
        self.attempt_count
    }

    /// Delay the next call to [`next_delay`](Self::next_delay) will return (before jitter).
    #[must_use]
    pub const fn current_delay(&self) -> Duration {
        self.current_delay
    }

    fn apply_jitter(&self, duration: Duration) -> Duration {
        if self.config.jitter_factor <= 0.0 {
            return duration;
        }

        #[allow(clippy::cast_precision_loss)]
        let base_millis = duration.as_millis() as f64;
        let jitter_range = base_millis * self.config.jitter_factor;
        let mut rng = rand::rng();
        let jitter: f64 = rng.random_range(-jitter_range..=jitter_range);
        let adjusted_millis = (base_millis + jitter).max(1.0);

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let adjusted_u64 = adjusted_millis as u64;
        Duration::from_millis(adjusted_u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_jitter(base_ms: u64, max_ms: u64) -> ReconnectConfig {
        ReconnectConfig {
            base_delay: Duration::from_millis(base_ms),
            max_delay: Duration::from_millis(max_ms),
            multiplier: 2.0,
            jitter_factor: 0.0,
        }
    }

    #[test]
    fn default_config_values() {
        let config = ReconnectConfig::default();
        assert_eq!(config.base_delay, Duration::from_millis(500));
        assert_eq!(config.max_delay, Duration::from_millis(3000));
        assert!((config.multiplier - 2.0).abs() < f64::EPSILON);
        assert!(config.jitter_factor.abs() < f64::EPSILON);
    }

    #[test]
    fn policy_doubles_until_cap() {
        let mut policy = ReconnectPolicy::new(ReconnectConfig::default());

        let delays: Vec<u128> = (0..6).map(|_| policy.next_delay().as_millis()).collect();
        assert_eq!(delays, vec![500, 1000, 2000, 3000, 3000, 3000]);
    }

    #[test]
    fn delay_matches_closed_form() {
        for k in 0..10_u32 {
            let mut policy = ReconnectPolicy::new(no_jitter(100, 5_000));
            for _ in 0..k {
                let _ = policy.next_delay();
            }
            let expected = (100_u128 * 2_u128.pow(k)).min(5_000);
            assert_eq!(policy.next_delay().as_millis(), expected, "k = {k}");
        }
    }

    #[test]
    fn policy_reset() {
        let mut policy = ReconnectPolicy::new(no_jitter(100, 10_000));

        let _ = policy.next_delay();
        let _ = policy.next_delay();
        assert_eq!(policy.attempt_count(), 2);

        policy.reset();

        assert_eq!(policy.attempt_count(), 0);
        assert_eq!(policy.next_delay(), Duration::from_millis(100));
    }

    #[test]
    fn base_above_max_is_clamped() {
        let mut policy = ReconnectPolicy::new(no_jitter(5_000, 1_000));
        assert_eq!(policy.next_delay(), Duration::from_millis(1_000));
        assert_eq!(policy.next_delay(), Duration::from_millis(1_000));
    }

    #[test]
    fn shrinking_multiplier_is_clamped() {
        for multiplier in [0.5, 0.0, -2.0, f64::NAN] {
            let mut policy = ReconnectPolicy::new(ReconnectConfig {
                multiplier,
                ..no_jitter(200, 1_000)
            });

            for _ in 0..5 {
                assert_eq!(
                    policy.next_delay(),
                    Duration::from_millis(200),
                    "multiplier = {multiplier}"
                );
            }
        }
    }

    #[test]
    fn policy_jitter_bounds() {
        for _ in 0..100 {
            let mut policy = ReconnectPolicy::new(ReconnectConfig {
                base_delay: Duration::from_millis(1000),
                max_delay: Duration::from_secs(10),
                multiplier: 2.0,
                jitter_factor: 0.1,
            });

            let millis = policy.next_delay().as_millis();

            assert!(millis >= 900, "delay {millis}ms is below minimum 900ms");
            assert!(millis <= 1100, "delay {millis}ms is above maximum 1100ms");
        }
    }
}
