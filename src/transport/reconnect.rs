use std::time::Duration;

/// Exponential backoff with jitter and a capped number of consecutive attempts.
///
/// ```text
/// delay(n) = min(initial * 2^(n-1), max) * (1 + jitter * u),   u ∈ [-1, 1]
/// ```
///
/// The attempt counter resets after every successful connect.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconnectPolicy {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    /// Consecutive failed attempts before giving up. 0 means never reconnect.
    pub max_retries: u32,
    /// Fraction of the delay randomized in either direction, 0.0 - 1.0.
    pub jitter: f64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            max_retries: 10,
            jitter: 0.2,
        }
    }
}

impl ReconnectPolicy {
    /// Never reconnects after the first failure.
    pub fn disabled() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Delay before retry `attempt` (1-based). `unit` is a sample in `[0, 1)`.
    /// Returns `None` once the retries are used up.
    pub fn delay(&self, attempt: u32, unit: f64) -> Option<Duration> {
        if attempt == 0 || attempt > self.max_retries {
            return None;
        }
        let exponent = (attempt - 1).min(31);
        let base = self
            .initial_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay);
        let jitter = if self.jitter.is_finite() { self.jitter.clamp(0.0, 1.0) } else { 0.0 };
        let unit = if unit.is_finite() { unit.clamp(0.0, 1.0) } else { 0.5 };
        let spread = (unit * 2.0 - 1.0) * jitter;
        let nanos = base.as_nanos() as f64 * (1.0 + spread).max(0.0);
        Some(Duration::from_nanos(nanos.round() as u64))
    }

    /// Same as [`delay`](Self::delay) with a random sample.
    pub fn next_delay(&self, attempt: u32) -> Option<Duration> {
        let unit: f64 = rand::random();
        self.delay(attempt, unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> ReconnectPolicy {
        ReconnectPolicy {
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(1000),
            max_retries: 6,
            jitter: 0.5,
        }
    }

    #[test]
    fn test_delay_doubles_until_capped() {
        let p = policy();
        let delays: Vec<u128> = (1..=6)
            .map(|n| p.delay(n, 0.5).unwrap().as_millis())
            .collect();
        assert_eq!(delays, vec![100, 200, 400, 800, 1000, 1000]);
    }

    #[test]
    fn test_delay_gives_up_after_max_retries() {
        let p = policy();
        assert!(p.delay(6, 0.5).is_some());
        assert_eq!(p.delay(7, 0.5), None);
        assert_eq!(p.delay(0, 0.5), None);
        assert_eq!(ReconnectPolicy::disabled().delay(1, 0.5), None);
    }

    #[test]
    fn test_jitter_bounds() {
        let p = policy();
        assert_eq!(p.delay(1, 0.0), Some(Duration::from_millis(50)));
        assert_eq!(p.delay(1, 1.0), Some(Duration::from_millis(150)));
        for _ in 0..100 {
            let d = p.next_delay(2).unwrap();
            assert!(d >= Duration::from_millis(100) && d <= Duration::from_millis(300));
        }
    }

    #[test]
    fn test_nan_jitter_keeps_the_backoff() {
        let p = ReconnectPolicy {
            jitter: f64::NAN,
            ..policy()
        };
        assert_eq!(p.delay(1, 0.9), Some(Duration::from_millis(100)));
        assert_eq!(p.delay(3, 0.1), Some(Duration::from_millis(400)));
        assert_eq!(policy().delay(1, f64::NAN), Some(Duration::from_millis(100)));
    }

    #[test]
    fn test_huge_attempt_counts_do_not_overflow() {
        let p = ReconnectPolicy {
            max_retries: u32::MAX,
            jitter: 0.0,
            ..policy()
        };
        assert_eq!(p.delay(u32::MAX, 0.5), Some(Duration::from_millis(1000)));
    }
}
