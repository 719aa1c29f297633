//! Retry backoff schedule.

use std::time::Duration;

/// Delay before retry `attempt` (1-based): base × 2^(attempt − 1).
///
/// With a 1s base that is 1s, 2s, 4s, 8s... A non-positive base yields
/// zero delay, which tests rely on to run the retry loop without
/// sleeping.
pub fn retry_delay(base_seconds: f64, attempt: u32) -> Duration {
    if base_seconds <= 0.0 {
        return Duration::ZERO;
    }
    let factor = 2f64.powi(attempt.saturating_sub(1).min(30) as i32);
    Duration::from_secs_f64(base_seconds * factor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doubles_per_attempt() {
        assert_eq!(retry_delay(1.0, 1), Duration::from_secs(1));
        assert_eq!(retry_delay(1.0, 2), Duration::from_secs(2));
        assert_eq!(retry_delay(1.0, 3), Duration::from_secs(4));
        assert_eq!(retry_delay(0.5, 3), Duration::from_secs(2));
    }

    #[test]
    fn zero_base_never_sleeps() {
        assert_eq!(retry_delay(0.0, 5), Duration::ZERO);
        assert_eq!(retry_delay(-1.0, 2), Duration::ZERO);
    }
}
