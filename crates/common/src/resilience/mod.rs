//! Resilience primitives used by the remote clients.

mod backoff;

pub use backoff::{BackoffError, FibonacciBackoff};

/// Decision for whether to retry an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry the operation
    Retry,
    /// Don't retry the operation
    Stop,
}

/// Trait for determining whether an error should be retried
pub trait RetryPolicy<E> {
    /// Determine if the error should be retried
    fn should_retry(&self, error: &E, attempt: u32) -> RetryDecision;
}

/// Predicate-based retry policy
#[derive(Debug)]
pub struct PredicateRetry<F> {
    predicate: F,
}

impl<F> PredicateRetry<F> {
    pub fn new(predicate: F) -> Self {
        Self { predicate }
    }
}

impl<F, E> RetryPolicy<E> for PredicateRetry<F>
where
    F: Fn(&E, u32) -> bool,
{
    fn should_retry(&self, error: &E, attempt: u32) -> RetryDecision {
        if (self.predicate)(error, attempt) {
            RetryDecision::Retry
        } else {
            RetryDecision::Stop
        }
    }
}
