//! Exponential backoff between retry attempts

use std::time::Duration;

use crate::config::RetryConfig;

/// Deterministic exponential backoff: `min(growth^index * base_delay, max_delay)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Backoff {
    pub base_delay: Duration,
    pub growth: f64,
    pub max_delay: Duration,
}

impl Backoff {
    pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(100);
    pub const DEFAULT_GROWTH: f64 = 1.7;
    pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(15);

    /// Delay to wait before the retry with zero-based index `attempt_index`.
    ///
    /// A growth factor below 1 or not finite is treated as 1, giving a
    /// constant `base_delay` (still capped at `max_delay`).
    pub fn delay_for(&self, attempt_index: u32) -> Duration {
        let max_secs = self.max_delay.as_secs_f64();
        let growth = if self.growth.is_finite() && self.growth >= 1.0 {
            self.growth
        } else {
            1.0
        };
        let exp = i32::try_from(attempt_index).unwrap_or(i32::MAX);
        let secs = growth.powi(exp) * self.base_delay.as_secs_f64();
        // powi overflows to infinity long before the cap stops mattering
        if secs.is_finite() && secs < max_secs {
            Duration::from_secs_f64(secs)
        } else {
            self.max_delay
        }
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            base_delay: Self::DEFAULT_BASE_DELAY,
            growth: Self::DEFAULT_GROWTH,
            max_delay: Self::DEFAULT_MAX_DELAY,
        }
    }
}

impl From<&RetryConfig> for Backoff {
    fn from(config: &RetryConfig) -> Self {
        Self {
            base_delay: Duration::from_millis(config.base_delay_ms),
            growth: config.backoff_growth,
            max_delay: Duration::from_millis(config.max_delay_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(d: Duration, secs: f64) -> bool {
        (d.as_secs_f64() - secs).abs() < 1e-6
    }

    #[test]
    fn test_default_curve() {
        let b = Backoff::default();
        assert!(approx(b.delay_for(0), 0.1));
        assert!(approx(b.delay_for(1), 0.17));
        assert!(approx(b.delay_for(2), 0.289));
        assert!(approx(b.delay_for(5), 1.7f64.powi(5) * 0.1));
    }

    #[test]
    fn test_saturates_at_max() {
        let b = Backoff::default();
        // 1.7^10 * 0.1 ~= 20.2s, past the 15s cap
        assert_eq!(b.delay_for(10), Duration::from_secs(15));
        assert_eq!(b.delay_for(1_000), Duration::from_secs(15));
        assert_eq!(b.delay_for(u32::MAX), Duration::from_secs(15));
    }

    #[test]
    fn test_monotonic() {
        let b = Backoff::default();
        let mut prev = Duration::ZERO;
        for i in 0..40 {
            let d = b.delay_for(i);
            assert!(d >= prev, "delay shrank at index {i}");
            prev = d;
        }
    }

    #[test]
    fn test_invalid_growth_gives_constant_delay() {
        for growth in [-1.7, -0.5, 0.0, 0.5, f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let b = Backoff {
                growth,
                ..Backoff::default()
            };
            for i in [0, 1, 2, 3, 100, u32::MAX] {
                assert_eq!(b.delay_for(i), Duration::from_millis(100), "growth {growth}, index {i}");
            }
        }
    }

    #[test]
    fn test_base_above_max_is_capped() {
        let b = Backoff {
            base_delay: Duration::from_secs(30),
            growth: -2.0,
            max_delay: Duration::from_secs(15),
        };
        assert_eq!(b.delay_for(0), Duration::from_secs(15));
        assert_eq!(b.delay_for(1), Duration::from_secs(15));
    }

    #[test]
    fn test_from_config() {
        let config = RetryConfig {
            max_attempts: 3,
            base_delay_ms: 10,
            backoff_growth: 2.0,
            max_delay_ms: 50,
        };
        let b = Backoff::from(&config);
        assert_eq!(b.delay_for(0), Duration::from_millis(10));
        assert_eq!(b.delay_for(1), Duration::from_millis(20));
        assert_eq!(b.delay_for(3), Duration::from_millis(50));
    }
}
