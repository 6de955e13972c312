//! Exponential backoff policy.
//!
//! `delay(n) = min(initial * multiplier^n, max)`, computed in whole
//! milliseconds. Pure and deterministic.

use std::time::Duration;

use crate::error::ConfigError;

/// Delay before the first retry.
pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_millis(1000);

/// Growth factor between consecutive retries.
pub const DEFAULT_MULTIPLIER: f64 = 2.0;

/// Upper bound on any retry delay.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(30);

/// Backoff policy mapping a retry count to a delay.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Backoff {
    initial_ms: u64,
    multiplier: f64,
    max_ms: u64,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            initial_ms: DEFAULT_INITIAL_DELAY.as_millis() as u64,
            multiplier: DEFAULT_MULTIPLIER,
            max_ms: DEFAULT_MAX_DELAY.as_millis() as u64,
        }
    }
}

impl Backoff {
    /// Create a validated policy.
    ///
    /// # Errors
    ///
    /// - `ConfigError::ZeroInitialDelay` if `initial` is below one millisecond
    /// - `ConfigError::MultiplierTooSmall` if `multiplier <= 1` or not finite
    /// - `ConfigError::MaxBelowInitial` if `max < initial`
    pub fn new(initial: Duration, multiplier: f64, max: Duration) -> Result<Self, ConfigError> {
        let initial_ms = initial.as_millis() as u64;
        let max_ms = max.as_millis() as u64;

        if initial_ms == 0 {
            return Err(ConfigError::ZeroInitialDelay);
        }
        if !multiplier.is_finite() || multiplier <= 1.0 {
            return Err(ConfigError::MultiplierTooSmall(multiplier));
        }
        if max_ms < initial_ms {
            return Err(ConfigError::MaxBelowInitial { initial, max });
        }

        Ok(Self { initial_ms, multiplier, max_ms })
    }

    /// Delay before the first retry.
    pub fn initial(&self) -> Duration {
        Duration::from_millis(self.initial_ms)
    }

    /// Upper bound on any delay.
    pub fn max(&self) -> Duration {
        Duration::from_millis(self.max_ms)
    }

    /// Growth factor.
    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    /// Delay for the given retry count.
    pub fn delay(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::from_millis(self.initial_ms);
        }

        // Exponents beyond i32 saturate to infinity anyway.
        let exponent = attempt.min(i32::MAX as u32) as i32;
        let raw = self.initial_ms as f64 * self.multiplier.powi(exponent);
        if !raw.is_finite() || raw >= self.max_ms as f64 {
            return Duration::from_millis(self.max_ms);
        }

        Duration::from_millis(raw.round() as u64)
    }
}
