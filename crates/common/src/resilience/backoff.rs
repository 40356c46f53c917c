//! Fibonacci backoff with a bounded cumulative sleep.
//!
//! The ABAP backends pace retries along the Fibonacci sequence: the n-th
//! delay is `fib(n)` times a base unit, and the retry loop stops as soon as
//! a computed delay would exceed the configured ceiling.

use std::time::Duration;

use thiserror::Error;

/// Errors produced while computing a backoff delay
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BackoffError {
    /// The computed delay exceeds the configured maximum sleep time
    #[error("Exceeded max sleep time ({computed:?} > {max:?})")]
    Exhausted { computed: Duration, max: Duration },
}

/// Fibonacci-paced backoff bounded by a maximum single delay.
///
/// `delay(n)` returns `fib(n) * unit` where `fib(0) = 0, fib(1) = 1`.
/// Once the result would exceed `max`, [`BackoffError::Exhausted`] is
/// returned and the caller is expected to give up.
#[derive(Debug, Clone)]
pub struct FibonacciBackoff {
    unit: Duration,
    max: Duration,
}

impl FibonacciBackoff {
    pub fn new(unit: Duration, max: Duration) -> Self {
        Self { unit, max }
    }

    /// Base time unit multiplied with the Fibonacci number.
    pub fn unit(&self) -> Duration {
        self.unit
    }

    /// Ceiling for a single computed delay.
    pub fn max(&self) -> Duration {
        self.max
    }

    /// Delay before the n-th retry.
    pub fn delay(&self, n: u32) -> Result<Duration, BackoffError> {
        let delay = self.unit.saturating_mul(fibonacci(n));

        if delay > self.max {
            return Err(BackoffError::Exhausted { computed: delay, max: self.max });
        }
        Ok(delay)
    }
}

impl Default for FibonacciBackoff {
    /// Default pacing of the ABAP Git trigger retries: 1 s unit, 120 s cap.
    fn default() -> Self {
        Self::new(Duration::from_secs(1), Duration::from_secs(120))
    }
}

fn fibonacci(n: u32) -> u32 {
    let (mut prev, mut next) = (0u32, 1u32);
    for _ in 0..n {
        let sum = prev.saturating_add(next);
        prev = next;
        next = sum;
    }
    prev
}
