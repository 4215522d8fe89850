use std::time::Duration;

/// How often and how patiently a track is re-registered after the catalog
/// reported it as not modifiable yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff_step: Duration,
    pub backoff_max: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, backoff_step: Duration, backoff_max: Duration) -> Self {
        Self {
            max_retries,
            backoff_step,
            backoff_max,
        }
    }

    /// Retries without sleeping in between.
    pub fn immediate(max_retries: u32) -> Self {
        Self::new(max_retries, Duration::ZERO, Duration::ZERO)
    }

    pub fn start(&self) -> RetryState {
        RetryState {
            remaining: self.max_retries,
            backoff: Duration::ZERO,
            step: self.backoff_step,
            max: self.backoff_max,
        }
    }
}

/// Retry bookkeeping for a single track.
#[derive(Debug, Clone)]
pub struct RetryState {
    remaining: u32,
    backoff: Duration,
    step: Duration,
    max: Duration,
}

impl RetryState {
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Consumes one retry and returns the delay to wait before it, or `None`
    /// once all retries are used up. The delay grows by one step per
    /// consecutive call, up to the maximum.
    pub fn next_attempt(&mut self) -> Option<Duration> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        self.backoff = (self.backoff + self.step).min(self.max);
        Some(self.backoff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_retries() {
        let mut state = RetryPolicy::immediate(0).start();
        assert_eq!(state.next_attempt(), None);
    }

    #[test]
    fn test_bounded_by_max_retries() {
        let mut state = RetryPolicy::immediate(3).start();

        let attempts = std::iter::from_fn(|| state.next_attempt()).count();
        assert_eq!(attempts, 3);
        assert_eq!(state.remaining(), 0);
        assert_eq!(state.next_attempt(), None);
    }

    #[test]
    fn test_backoff_grows_and_caps() {
        let policy = RetryPolicy::new(5, Duration::from_millis(200), Duration::from_millis(500));
        let mut state = policy.start();

        let delays: Vec<_> = std::iter::from_fn(|| state.next_attempt())
            .map(|d| d.as_millis())
            .collect();
        assert_eq!(delays, vec![200, 400, 500, 500, 500]);
    }

    #[test]
    fn test_immediate_never_sleeps() {
        let mut state = RetryPolicy::immediate(2).start();
        assert_eq!(state.next_attempt(), Some(Duration::ZERO));
        assert_eq!(state.next_attempt(), Some(Duration::ZERO));
    }
}
